use std::{collections::HashMap, sync::Arc};

use {
    switchboard_schema::{ChannelSchema, ConnectionSettings},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use {crate::telemetry, metrics::gauge};

use crate::{
    config::ConnectorConfig,
    connector::Connector,
    error::{ConnectorError, ConnectorResult, ErrorCode},
    provider::ChannelProvider,
};

/// Builds a fresh provider instance for each connector.
pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn ChannelProvider> + Send + Sync>;

struct Registration {
    schema: Arc<ChannelSchema>,
    factory: ProviderFactory,
}

/// Provider factories keyed by schema logical identity.
///
/// A connector can be created for the registered schema itself or for any
/// schema derived from it, as long as the derived schema is a restriction of
/// the registered one.
pub struct ConnectorRegistry {
    providers: HashMap<String, Registration>,
    config: ConnectorConfig,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            config: ConnectorConfig::default(),
        }
    }

    /// Config handed to every connector this registry creates.
    #[must_use]
    pub fn with_config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a provider factory for `schema`. Each logical identity can
    /// be registered once.
    pub fn register<F>(&mut self, schema: Arc<ChannelSchema>, factory: F) -> ConnectorResult<()>
    where
        F: Fn() -> Arc<dyn ChannelProvider> + Send + Sync + 'static,
    {
        let identity = schema.logical_identity();
        if self.providers.contains_key(&identity) {
            return Err(ConnectorError::new(
                ErrorCode::InvalidState,
                format!("a provider is already registered for schema {identity}"),
            ));
        }
        debug!(schema = %identity, "registering provider");
        self.providers.insert(identity, Registration {
            schema,
            factory: Arc::new(factory),
        });
        #[cfg(feature = "metrics")]
        gauge!(telemetry::REGISTERED_SCHEMAS).set(self.providers.len() as f64);
        Ok(())
    }

    pub fn unregister(&mut self, identity: &str) -> Option<Arc<ChannelSchema>> {
        let removed = self.providers.remove(identity).map(|r| r.schema);
        #[cfg(feature = "metrics")]
        gauge!(telemetry::REGISTERED_SCHEMAS).set(self.providers.len() as f64);
        removed
    }

    /// Registered schema for a logical identity (`provider/type/version`).
    pub fn get(&self, identity: &str) -> Option<&ChannelSchema> {
        self.providers.get(identity).map(|r| r.schema.as_ref())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.providers.contains_key(identity)
    }

    pub fn list(&self) -> Vec<&str> {
        let mut identities: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        identities.sort_unstable();
        identities
    }

    /// Create an uninitialized connector for `schema`.
    ///
    /// Fails with `NOT_SUPPORTED` when no provider is registered for the
    /// schema's identity and with `VALIDATION_FAILED` when `schema` declares
    /// more than the registered schema.
    pub fn create(&self, schema: Arc<ChannelSchema>) -> ConnectorResult<Connector> {
        let identity = schema.logical_identity();
        let registration = self.providers.get(&identity).ok_or_else(|| {
            ConnectorError::new(
                ErrorCode::NotSupported,
                format!("no provider registered for schema {identity}"),
            )
        })?;

        let failures = schema.validate_as_restriction_of(&registration.schema);
        if !failures.is_empty() {
            return Err(ConnectorError::validation(
                &format!("schema '{}'", schema.display_name()),
                failures,
            ));
        }

        let provider = (registration.factory)();
        debug!(schema = %identity, provider = provider.name(), "created connector");
        Ok(Connector::new(schema, provider).with_config(self.config.clone()))
    }

    /// Create a connector and initialize it with `settings`.
    pub async fn connect(
        &self,
        schema: Arc<ChannelSchema>,
        settings: &ConnectionSettings,
        cancel: &CancellationToken,
    ) -> ConnectorResult<Connector> {
        let connector = self.create(schema)?;
        connector.initialize(settings, cancel).await?;
        Ok(connector)
    }
}
