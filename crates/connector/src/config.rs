use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult, ErrorCode};

/// Runtime knobs for a [`Connector`](crate::Connector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Upper bound for a single provider call, in milliseconds. `0` disables
    /// the timeout.
    pub operation_timeout_ms: u64,
    /// Largest chunk handed to a native batch sender in one call.
    pub max_batch_size: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 30_000,
            max_batch_size: 100,
        }
    }
}

impl ConnectorConfig {
    pub fn from_toml_str(input: &str) -> ConnectorResult<Self> {
        toml::from_str(input).map_err(|e| {
            ConnectorError::new(
                ErrorCode::ValidationFailed,
                format!("invalid connector config: {e}"),
            )
            .with_source(e)
        })
    }

    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.operation_timeout_ms = 0;
        self
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    #[must_use]
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_ms > 0).then(|| Duration::from_millis(self.operation_timeout_ms))
    }

    /// Chunk size for native batches; never zero.
    #[must_use]
    pub fn batch_chunk_size(&self) -> usize {
        self.max_batch_size.max(1)
    }
}
