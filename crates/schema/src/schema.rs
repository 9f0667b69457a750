//! The channel schema and its builder API.
//!
//! Builder methods consume the schema and hand it back, so declarations
//! chain naturally:
//!
//! ```ignore
//! let schema = ChannelSchema::new("Twilio", "SMS", "1.0.0")?
//!     .with_capability(Capabilities::SEND_MESSAGES)
//!     .add_parameter(ChannelParameter::new("AccountSid", DataType::String).required())?
//!     .add_endpoint(EndpointRule::new(EndpointType::PhoneNumber))?
//!     .add_authentication_type(AuthenticationType::Basic);
//! ```
//!
//! Conflicting declarations fail at the call that introduces them.
//!
//! `remove_*` and `update_*` treat a missing entry differently. A removal
//! only asks that the entry be absent afterwards, which already holds, so it
//! is a no-op and removals can be repeated. An update carries a replacement
//! that would otherwise be dropped without a trace, so it fails with the
//! matching `Error::Unknown*` variant.

use std::{fmt, str::FromStr, sync::Arc};

use {
    serde::{Serialize, Serializer},
    switchboard_common::{EndpointType, Message, MessageContentType},
};

use crate::{
    auth::AuthenticationType,
    capability::Capabilities,
    endpoint::EndpointRule,
    error::{Error, Result},
    parameter::{ChannelParameter, MessagePropertyRule, ValueRule},
    settings::ConnectionSettings,
    validate::{self, ValidationFailure},
};

// ── Version ─────────────────────────────────────────────────────────────────

/// Semantic version of a schema: `major.minor.patch[-pre]`.
///
/// Versions compare for equality only. Compatibility looks at `major`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
}

impl SchemaVersion {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    /// Missing minor or patch components default to zero.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidVersion {
            version: s.to_string(),
        };
        let trimmed = s.trim();
        let (core, pre) = match trimmed.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (trimmed, None),
        };
        let mut parts = [0u64; 3];
        let mut count = 0;
        for part in core.split('.') {
            let slot = parts.get_mut(count).ok_or_else(invalid)?;
            *slot = part.parse().map_err(|_| invalid())?;
            count += 1;
        }
        if count == 0 {
            return Err(invalid());
        }
        let [major, minor, patch] = parts;
        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Schema ──────────────────────────────────────────────────────────────────

/// Declarative description of one provider/channel pair.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSchema {
    provider: String,
    channel_type: String,
    version: SchemaVersion,
    display_name: String,
    is_strict: bool,
    capabilities: Capabilities,
    parameters: Vec<ChannelParameter>,
    endpoints: Vec<EndpointRule>,
    content_types: Vec<MessageContentType>,
    message_properties: Vec<MessagePropertyRule>,
    authentication_types: Vec<AuthenticationType>,
}

impl ChannelSchema {
    /// Create an empty strict schema. The display name defaults to
    /// `"{provider} {channel_type}"`.
    pub fn new(
        provider: impl Into<String>,
        channel_type: impl Into<String>,
        version: &str,
    ) -> Result<Self> {
        let provider = provider.into().trim().to_string();
        let channel_type = channel_type.into().trim().to_string();
        if provider.is_empty() {
            return Err(Error::invalid_identity("provider name is empty"));
        }
        if channel_type.is_empty() {
            return Err(Error::invalid_identity("channel type is empty"));
        }
        let version = version.parse()?;
        Ok(Self {
            display_name: format!("{provider} {channel_type}"),
            provider,
            channel_type,
            version,
            is_strict: true,
            capabilities: Capabilities::NONE,
            parameters: Vec::new(),
            endpoints: Vec::new(),
            content_types: Vec::new(),
            message_properties: Vec::new(),
            authentication_types: Vec::new(),
        })
    }

    // ── Identity & accessors ────────────────────────────────────────────

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn channel_type(&self) -> &str {
        &self.channel_type
    }

    #[must_use]
    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.is_strict
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn parameters(&self) -> &[ChannelParameter] {
        &self.parameters
    }

    #[must_use]
    pub fn endpoints(&self) -> &[EndpointRule] {
        &self.endpoints
    }

    #[must_use]
    pub fn content_types(&self) -> &[MessageContentType] {
        &self.content_types
    }

    #[must_use]
    pub fn message_properties(&self) -> &[MessagePropertyRule] {
        &self.message_properties
    }

    #[must_use]
    pub fn authentication_types(&self) -> &[AuthenticationType] {
        &self.authentication_types
    }

    /// `"{provider}/{channel_type}/{version}"`, shared by every schema
    /// derived from the same base.
    #[must_use]
    pub fn logical_identity(&self) -> String {
        format!("{}/{}/{}", self.provider, self.channel_type, self.version)
    }

    /// Same logical identity as `other`.
    #[must_use]
    pub fn is_compatible_with(&self, other: &ChannelSchema) -> bool {
        self.provider == other.provider
            && self.channel_type == other.channel_type
            && self.version == other.version
    }

    #[must_use]
    pub fn has_capability(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    #[must_use]
    pub fn find_parameter(&self, name: &str) -> Option<&ChannelParameter> {
        self.parameters.iter().find(|p| p.is_named(name))
    }

    #[must_use]
    pub fn find_message_property(&self, name: &str) -> Option<&MessagePropertyRule> {
        self.message_properties.iter().find(|p| p.is_named(name))
    }

    /// The rule registered for exactly `endpoint_type`.
    #[must_use]
    pub fn find_endpoint(&self, endpoint_type: EndpointType) -> Option<&EndpointRule> {
        self.endpoints
            .iter()
            .find(|rule| rule.endpoint_type == endpoint_type)
    }

    /// The rule that governs `endpoint_type`: an exact rule, or the wildcard.
    #[must_use]
    pub fn endpoint_rule_for(&self, endpoint_type: EndpointType) -> Option<&EndpointRule> {
        self.find_endpoint(endpoint_type)
            .or_else(|| self.endpoints.iter().find(|rule| rule.is_wildcard()))
    }

    #[must_use]
    pub fn allows_any_endpoint(&self) -> bool {
        self.endpoints.iter().any(EndpointRule::is_wildcard)
    }

    /// An empty content-type set places no restriction.
    #[must_use]
    pub fn supports_content_type(&self, content_type: MessageContentType) -> bool {
        self.content_types.is_empty() || self.content_types.contains(&content_type)
    }

    #[must_use]
    pub fn supports_authentication(&self, auth: AuthenticationType) -> bool {
        self.authentication_types.contains(&auth)
    }

    // ── Validation entry points ─────────────────────────────────────────

    /// See [`validate::validate_connection_settings`].
    pub fn validate_connection_settings<'a>(
        &'a self,
        settings: &'a ConnectionSettings,
    ) -> impl Iterator<Item = ValidationFailure> + 'a {
        validate::validate_connection_settings(self, settings)
    }

    /// See [`validate::validate_message`].
    pub fn validate_message<'a>(
        &'a self,
        message: &'a Message,
    ) -> impl Iterator<Item = ValidationFailure> + 'a {
        validate::validate_message(self, message)
    }

    /// Wrap in an [`Arc`] for sharing with settings and connectors.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // ── Builder: metadata & capabilities ────────────────────────────────

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Strict schemas reject undeclared settings and message properties.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.is_strict = strict;
        self
    }

    pub fn with_capability(mut self, capability: Capabilities) -> Self {
        self.capabilities |= capability;
        self
    }

    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        self.with_capability(capabilities)
    }

    pub fn remove_capability(mut self, capability: Capabilities) -> Self {
        self.capabilities = self.capabilities - capability;
        self
    }

    /// Keep only the capabilities present in `mask`.
    pub fn restrict_capabilities(mut self, mask: Capabilities) -> Self {
        self.capabilities = self.capabilities & mask;
        self
    }

    // ── Builder: parameters ─────────────────────────────────────────────

    /// Fails if a parameter with the same name (ignoring case) exists or the
    /// default value does not match the declared type.
    pub fn add_parameter(mut self, parameter: ChannelParameter) -> Result<Self> {
        if self.find_parameter(&parameter.name).is_some() {
            return Err(Error::DuplicateParameter {
                name: parameter.name,
            });
        }
        parameter.check_default()?;
        self.parameters.push(parameter);
        Ok(self)
    }

    /// No-op when the parameter is not declared.
    pub fn remove_parameter(mut self, name: &str) -> Self {
        self.parameters.retain(|p| !p.is_named(name));
        self
    }

    /// Replace the declared parameter with the same name, keeping its
    /// position. Fails when no such parameter exists.
    pub fn update_parameter(mut self, parameter: ChannelParameter) -> Result<Self> {
        parameter.check_default()?;
        let slot = self
            .parameters
            .iter_mut()
            .find(|p| p.is_named(&parameter.name))
            .ok_or_else(|| Error::UnknownParameter {
                name: parameter.name.clone(),
            })?;
        *slot = parameter;
        Ok(self)
    }

    // ── Builder: endpoints ──────────────────────────────────────────────

    /// Fails if the type is already declared, or when mixing the wildcard
    /// with specific types.
    pub fn add_endpoint(mut self, rule: EndpointRule) -> Result<Self> {
        if self.find_endpoint(rule.endpoint_type).is_some() {
            return Err(Error::DuplicateEndpoint {
                endpoint_type: rule.endpoint_type,
            });
        }
        let conflicts = if rule.is_wildcard() {
            !self.endpoints.is_empty()
        } else {
            self.allows_any_endpoint()
        };
        if conflicts {
            return Err(Error::WildcardConflict {
                endpoint_type: rule.endpoint_type,
            });
        }
        self.endpoints.push(rule);
        Ok(self)
    }

    /// Register the wildcard rule: any endpoint may send and receive.
    pub fn allows_any_message_endpoint(self) -> Result<Self> {
        self.add_endpoint(EndpointRule::any())
    }

    /// No-op when the type is not declared.
    pub fn remove_endpoint(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoints.retain(|rule| rule.endpoint_type != endpoint_type);
        self
    }

    /// Replace the rule for the same endpoint type. Fails when none exists.
    pub fn update_endpoint(mut self, rule: EndpointRule) -> Result<Self> {
        let slot = self
            .endpoints
            .iter_mut()
            .find(|existing| existing.endpoint_type == rule.endpoint_type)
            .ok_or(Error::UnknownEndpoint {
                endpoint_type: rule.endpoint_type,
            })?;
        *slot = rule;
        Ok(self)
    }

    // ── Builder: content types ──────────────────────────────────────────

    /// Adding a type twice keeps a single entry.
    pub fn add_content_type(mut self, content_type: MessageContentType) -> Self {
        if !self.content_types.contains(&content_type) {
            self.content_types.push(content_type);
        }
        self
    }

    pub fn add_content_types(
        self,
        content_types: impl IntoIterator<Item = MessageContentType>,
    ) -> Self {
        content_types
            .into_iter()
            .fold(self, |schema, ct| schema.add_content_type(ct))
    }

    /// No-op when the type is not declared.
    pub fn remove_content_type(mut self, content_type: MessageContentType) -> Self {
        self.content_types.retain(|ct| *ct != content_type);
        self
    }

    /// Keep only the declared content types that appear in `allowed`.
    pub fn restrict_content_types(mut self, allowed: &[MessageContentType]) -> Self {
        self.content_types.retain(|ct| allowed.contains(ct));
        self
    }

    // ── Builder: message properties ─────────────────────────────────────

    /// Same rules as [`ChannelSchema::add_parameter`].
    pub fn add_message_property(mut self, property: MessagePropertyRule) -> Result<Self> {
        if self.find_message_property(&property.name).is_some() {
            return Err(Error::DuplicateMessageProperty {
                name: property.name,
            });
        }
        property.check_default()?;
        self.message_properties.push(property);
        Ok(self)
    }

    /// No-op when the property is not declared.
    pub fn remove_message_property(mut self, name: &str) -> Self {
        self.message_properties.retain(|p| !p.is_named(name));
        self
    }

    /// Replace the declared property with the same name. Fails when none
    /// exists.
    pub fn update_message_property(mut self, property: MessagePropertyRule) -> Result<Self> {
        property.check_default()?;
        let slot = self
            .message_properties
            .iter_mut()
            .find(|p| p.is_named(&property.name))
            .ok_or_else(|| Error::UnknownMessageProperty {
                name: property.name.clone(),
            })?;
        *slot = property;
        Ok(self)
    }

    // ── Builder: authentication ─────────────────────────────────────────

    /// Adding a type twice keeps a single entry.
    pub fn add_authentication_type(mut self, auth: AuthenticationType) -> Self {
        if !self.authentication_types.contains(&auth) {
            self.authentication_types.push(auth);
        }
        self
    }

    /// No-op when the type is not declared.
    pub fn remove_authentication_type(mut self, auth: AuthenticationType) -> Self {
        self.authentication_types.retain(|a| *a != auth);
        self
    }
}

impl fmt::Display for ChannelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.logical_identity())
    }
}
