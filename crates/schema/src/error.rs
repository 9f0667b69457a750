use switchboard_common::{EndpointType, FromMessage};

/// Crate-wide result type for schema construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Build-time contract violations.
///
/// Raised by the builder API the moment a schema is constructed with an
/// inconsistent declaration. Data that fails a schema is reported through
/// [`crate::ValidationFailure`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Provider or channel type is empty.
    #[error("invalid schema identity: {message}")]
    InvalidIdentity { message: String },

    #[error("invalid schema version '{version}'")]
    InvalidVersion { version: String },

    #[error("parameter '{name}' is already declared")]
    DuplicateParameter { name: String },

    #[error("message property '{name}' is already declared")]
    DuplicateMessageProperty { name: String },

    #[error("endpoint type {endpoint_type} is already declared")]
    DuplicateEndpoint { endpoint_type: EndpointType },

    /// Wildcard and specific endpoint rules cannot coexist.
    #[error("endpoint type {endpoint_type} conflicts with the wildcard endpoint rule")]
    WildcardConflict { endpoint_type: EndpointType },

    #[error("default value of '{name}' does not match its declared type {expected}")]
    InvalidDefault { name: String, expected: String },

    #[error("parameter '{name}' is not declared")]
    UnknownParameter { name: String },

    #[error("message property '{name}' is not declared")]
    UnknownMessageProperty { name: String },

    #[error("endpoint type {endpoint_type} is not declared")]
    UnknownEndpoint { endpoint_type: EndpointType },

    #[error("unknown capability '{name}'")]
    UnknownCapability { name: String },

    #[error(transparent)]
    Model(#[from] switchboard_common::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            message: message.into(),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

switchboard_common::impl_context!();
