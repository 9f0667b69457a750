//! Schema definitions loaded from TOML or JSON documents.
//!
//! A definition is only a description; [`SchemaDefinition::into_schema`]
//! replays it through the builder so the same build-time contracts apply
//! as for schemas declared in code.
//!
//! ```toml
//! provider = "Twilio"
//! channel_type = "SMS"
//! version = "1.0.0"
//! capabilities = ["send", "status-query"]
//! authentication_types = ["Basic"]
//! content_types = ["text", "media"]
//!
//! [[parameters]]
//! name = "AccountSid"
//! type = "string"
//! is_required = true
//!
//! [[endpoints]]
//! type = "phone"
//! ```

use {
    serde::{Deserialize, Serialize},
    switchboard_common::MessageContentType,
    tracing::debug,
};

use crate::{
    auth::AuthenticationType,
    capability::Capabilities,
    endpoint::EndpointRule,
    error::{Context, Result},
    parameter::{ChannelParameter, MessagePropertyRule},
    schema::ChannelSchema,
};

fn strict_by_default() -> bool {
    true
}

/// Serializable description of a [`ChannelSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub provider: String,
    pub channel_type: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default = "strict_by_default")]
    pub is_strict: bool,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub parameters: Vec<ChannelParameter>,
    #[serde(default)]
    pub endpoints: Vec<EndpointRule>,
    #[serde(default)]
    pub content_types: Vec<MessageContentType>,
    #[serde(default)]
    pub message_properties: Vec<MessagePropertyRule>,
    #[serde(default)]
    pub authentication_types: Vec<AuthenticationType>,
}

impl SchemaDefinition {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("invalid schema definition TOML")
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("invalid schema definition JSON")
    }

    /// Snapshot of an existing schema.
    #[must_use]
    pub fn from_schema(schema: &ChannelSchema) -> Self {
        Self {
            provider: schema.provider().to_string(),
            channel_type: schema.channel_type().to_string(),
            version: schema.version().to_string(),
            display_name: Some(schema.display_name().to_string()),
            is_strict: schema.is_strict(),
            capabilities: schema.capabilities(),
            parameters: schema.parameters().to_vec(),
            endpoints: schema.endpoints().to_vec(),
            content_types: schema.content_types().to_vec(),
            message_properties: schema.message_properties().to_vec(),
            authentication_types: schema.authentication_types().to_vec(),
        }
    }

    /// Build the schema, failing on the first conflicting declaration.
    pub fn into_schema(self) -> Result<ChannelSchema> {
        let mut schema = ChannelSchema::new(self.provider, self.channel_type, &self.version)?
            .with_strict_mode(self.is_strict)
            .with_capabilities(self.capabilities)
            .add_content_types(self.content_types);
        if let Some(name) = self.display_name {
            schema = schema.with_display_name(name);
        }
        for parameter in self.parameters {
            schema = schema.add_parameter(parameter)?;
        }
        for endpoint in self.endpoints {
            schema = schema.add_endpoint(endpoint)?;
        }
        for property in self.message_properties {
            schema = schema.add_message_property(property)?;
        }
        for auth in self.authentication_types {
            schema = schema.add_authentication_type(auth);
        }
        debug!(schema = %schema.logical_identity(), "built schema from definition");
        Ok(schema)
    }
}

impl ChannelSchema {
    /// Parse a TOML definition and build the schema.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        SchemaDefinition::from_toml_str(input)?.into_schema()
    }

    /// Parse a JSON definition and build the schema.
    pub fn from_json_str(input: &str) -> Result<Self> {
        SchemaDefinition::from_json_str(input)?.into_schema()
    }
}
