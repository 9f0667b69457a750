use {
    anyhow::Result, async_trait::async_trait, switchboard_common::Message,
    switchboard_schema::ConnectionSettings, tokio_util::sync::CancellationToken,
};

use crate::{
    error::ConnectorError,
    types::{MessageSource, ProviderHealth, SendResult, StatusUpdate},
};

// ── Provider trait ──────────────────────────────────────────────────────────

/// Provider implementation behind a [`Connector`](crate::Connector).
///
/// The connector has already checked lifecycle state, capabilities and
/// message validity before any of these methods is called. Implementations
/// only talk to the remote service. Returning a [`ConnectorError`] (through
/// `anyhow`) selects the error code seen by the caller; any other error is
/// reported as `PROVIDER_ERROR`.
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Provider name used in logs (e.g. "twilio").
    fn name(&self) -> &str;

    /// Establish the connection. `settings` have already passed validation
    /// and are bound to the connector's schema, so
    /// [`ConnectionSettings::get_or_default`] sees declared defaults.
    async fn initialize(&self, settings: &ConnectionSettings, cancel: &CancellationToken)
    -> Result<()>;

    /// Round-trip to the remote service without sending anything.
    async fn test_connection(&self, cancel: &CancellationToken) -> Result<()>;

    async fn send(&self, message: &Message, cancel: &CancellationToken) -> Result<SendResult>;

    /// Release remote resources.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// Native batch sending, if the provider has it.
    fn batch(&self) -> Option<&dyn BatchSender> {
        None
    }

    /// Delivery status lookups.
    fn status_query(&self) -> Option<&dyn StatusQuery> {
        None
    }

    /// Inbound payload parsing (webhooks).
    fn inbound(&self) -> Option<&dyn Inbound> {
        None
    }

    fn health(&self) -> Option<&dyn HealthProbe> {
        None
    }
}

/// Send several messages in one provider call.
#[async_trait]
pub trait BatchSender: Send + Sync {
    /// Return one outcome per message, in order. Missing trailing outcomes
    /// are reported as provider errors.
    async fn send_batch(
        &self,
        messages: &[&Message],
        cancel: &CancellationToken,
    ) -> Result<Vec<Result<SendResult>>>;
}

#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn query_status(&self, message_id: &str, cancel: &CancellationToken)
    -> Result<StatusUpdate>;
}

/// Parse raw inbound payloads into messages or status callbacks.
#[async_trait]
pub trait Inbound: Send + Sync {
    async fn receive(&self, source: &MessageSource, cancel: &CancellationToken)
    -> Result<Vec<Message>>;

    /// Parse a delivery status callback.
    async fn receive_status(
        &self,
        _source: &MessageSource,
        _cancel: &CancellationToken,
    ) -> Result<StatusUpdate> {
        Err(ConnectorError::unsupported_by_provider("receive_message_status").into())
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, cancel: &CancellationToken) -> Result<ProviderHealth>;
}
