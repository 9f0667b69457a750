use {
    serde::{Deserialize, Serialize},
    switchboard_common::EndpointType,
};

use crate::error::Result;

fn enabled() -> bool {
    true
}

/// Direction rule for one endpoint type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRule {
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    /// May appear as a message sender.
    #[serde(default = "enabled")]
    pub can_send: bool,
    /// May appear as a message receiver.
    #[serde(default = "enabled")]
    pub can_receive: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EndpointRule {
    /// A bidirectional, optional rule.
    pub fn new(endpoint_type: EndpointType) -> Self {
        Self {
            endpoint_type,
            can_send: true,
            can_receive: true,
            is_required: false,
            description: None,
        }
    }

    /// Build from a type name or alias such as `"email"` or `"user-id"`.
    pub fn from_alias(alias: &str) -> Result<Self> {
        Ok(Self::new(alias.parse()?))
    }

    /// The wildcard rule matching any endpoint type.
    pub fn any() -> Self {
        Self::new(EndpointType::Any)
    }

    pub fn send_only(mut self) -> Self {
        self.can_send = true;
        self.can_receive = false;
        self
    }

    pub fn receive_only(mut self) -> Self {
        self.can_send = false;
        self.can_receive = true;
        self
    }

    pub fn with_send(mut self, can_send: bool) -> Self {
        self.can_send = can_send;
        self
    }

    pub fn with_receive(mut self, can_receive: bool) -> Self {
        self.can_receive = can_receive;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.endpoint_type.is_any()
    }

    /// Whether this rule applies to messages addressed with `endpoint_type`.
    #[must_use]
    pub fn matches(&self, endpoint_type: EndpointType) -> bool {
        self.is_wildcard() || self.endpoint_type == endpoint_type
    }
}
