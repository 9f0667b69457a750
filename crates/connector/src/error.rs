use std::{error::Error as StdError, fmt, time::Duration};

use {
    serde::{Deserialize, Serialize},
    switchboard_schema::{Capabilities, ValidationFailure},
};

use crate::state::ConnectorState;

/// Result type returned by every public connector operation.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The connector is not in the `Connected` state.
    NotInitialized,
    /// The schema does not declare the capability, or the provider lacks
    /// the adapter for it.
    NotSupported,
    /// Settings or message do not satisfy the schema.
    ValidationFailed,
    /// A lifecycle transition is not allowed from the current state.
    InvalidState,
    /// The connector was disposed.
    Disposed,
    /// The provider could not establish its connection.
    ConnectionFailed,
    /// The provider returned an error or panicked.
    ProviderError,
    Cancelled,
    Timeout,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidState => "INVALID_STATE",
            Self::Disposed => "DISPOSED",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure of a connector operation.
///
/// Providers may return one of these (wrapped in `anyhow`) to pick a
/// specific code; anything else becomes [`ErrorCode::ProviderError`] with the
/// original error kept as the source.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ConnectorError {
    pub code: ErrorCode,
    pub message: String,
    /// Populated for [`ErrorCode::ValidationFailed`].
    pub validation_failures: Vec<ValidationFailure>,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ConnectorError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            validation_failures: Vec::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn not_initialized(operation: &str, state: ConnectorState) -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            format!("cannot {operation}: connector is not initialized (state: {state})"),
        )
    }

    #[must_use]
    pub fn not_supported(operation: &str, capability: Capabilities) -> Self {
        Self::new(
            ErrorCode::NotSupported,
            format!("{operation} is not supported: requires {capability}"),
        )
    }

    #[must_use]
    pub fn unsupported_by_provider(operation: &str) -> Self {
        Self::new(
            ErrorCode::NotSupported,
            format!("{operation} is not implemented by the provider"),
        )
    }

    #[must_use]
    pub fn validation(subject: &str, failures: Vec<ValidationFailure>) -> Self {
        let summary: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();
        Self {
            code: ErrorCode::ValidationFailed,
            message: format!("{subject} failed validation: {}", summary.join("; ")),
            validation_failures: failures,
            source: None,
        }
    }

    #[must_use]
    pub fn invalid_state(operation: &str, state: ConnectorState) -> Self {
        Self::new(
            ErrorCode::InvalidState,
            format!("cannot {operation} while {state}"),
        )
    }

    #[must_use]
    pub fn disposed(operation: &str) -> Self {
        Self::new(
            ErrorCode::Disposed,
            format!("cannot {operation}: connector has been disposed"),
        )
    }

    #[must_use]
    pub fn cancelled(operation: &str) -> Self {
        Self::new(ErrorCode::Cancelled, format!("{operation} was cancelled"))
    }

    #[must_use]
    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("{operation} timed out after {}ms", after.as_millis()),
        )
    }

    /// Convert a provider error, keeping the code of a `ConnectorError` the
    /// provider returned itself.
    #[must_use]
    pub fn from_provider(operation: &str, err: anyhow::Error) -> Self {
        match err.downcast::<ConnectorError>() {
            Ok(err) => err,
            Err(err) => Self::new(ErrorCode::ProviderError, format!("{operation} failed: {err:#}"))
                .with_source(err),
        }
    }

    /// Copy of code, message and validation failures, without the source.
    #[must_use]
    pub fn replicate(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            validation_failures: self.validation_failures.clone(),
            source: None,
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self.code, ErrorCode::Cancelled | ErrorCode::Timeout)
    }
}
