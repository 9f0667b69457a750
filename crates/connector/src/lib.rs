//! Connector lifecycle and dispatch.
//!
//! A [`Connector`] wraps a provider implementation ([`ChannelProvider`]) with
//! a lifecycle state machine, capability gating from its [`ChannelSchema`]
//! and message validation. Every public operation returns a
//! [`ConnectorResult`]; provider errors, panics, timeouts and cancellation
//! are converted into a [`ConnectorError`] with a stable [`ErrorCode`].
//!
//! [`ChannelSchema`]: switchboard_schema::ChannelSchema

pub mod config;
pub mod connector;
pub mod error;
pub mod provider;
pub mod registry;
pub mod state;
pub mod telemetry;
pub mod types;

pub use {
    config::ConnectorConfig,
    connector::Connector,
    error::{ConnectorError, ConnectorResult, ErrorCode},
    provider::{BatchSender, ChannelProvider, HealthProbe, Inbound, StatusQuery},
    registry::{ConnectorRegistry, ProviderFactory},
    state::ConnectorState,
    types::{
        BatchItemResult, BatchSendResult, ConnectorHealth, MessageSource, MessageStatus,
        ProviderHealth, ReceiveResult, SendResult, StatusUpdate,
    },
};
