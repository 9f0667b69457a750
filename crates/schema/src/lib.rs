//! Declarative channel schemas.
//!
//! A [`ChannelSchema`] describes what one provider/channel pair supports:
//! connection parameters, capabilities, endpoint kinds, content types,
//! message properties and authentication methods. The validation engine
//! checks [`ConnectionSettings`] and messages against it, and derived schemas
//! narrow a base while keeping its logical identity.

pub mod auth;
pub mod capability;
pub mod definition;
pub mod derive;
pub mod endpoint;
pub mod error;
pub mod parameter;
pub mod schema;
pub mod settings;
pub mod validate;

pub use {
    auth::AuthenticationType,
    capability::Capabilities,
    definition::SchemaDefinition,
    endpoint::EndpointRule,
    error::{Error, Result},
    parameter::{ChannelParameter, MessagePropertyRule, ValueRule},
    schema::{ChannelSchema, SchemaVersion},
    settings::ConnectionSettings,
    validate::ValidationFailure,
};
