//! Message model consulted by schema validation.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Endpoint types ──────────────────────────────────────────────────────────

/// Kind of address a message endpoint carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EndpointType {
    /// Wildcard: any endpoint kind.
    Any,
    PhoneNumber,
    EmailAddress,
    Url,
    Topic,
    UserId,
    ApplicationId,
    DeviceId,
    /// Generic provider-specific identifier.
    Id,
    Label,
}

/// Accepted spellings, compared case-insensitively.
const ENDPOINT_TYPE_ALIASES: &[(&str, EndpointType)] = &[
    ("any", EndpointType::Any),
    ("*", EndpointType::Any),
    ("phonenumber", EndpointType::PhoneNumber),
    ("phone-number", EndpointType::PhoneNumber),
    ("phone", EndpointType::PhoneNumber),
    ("emailaddress", EndpointType::EmailAddress),
    ("email-address", EndpointType::EmailAddress),
    ("email", EndpointType::EmailAddress),
    ("url", EndpointType::Url),
    ("topic", EndpointType::Topic),
    ("userid", EndpointType::UserId),
    ("user-id", EndpointType::UserId),
    ("applicationid", EndpointType::ApplicationId),
    ("application-id", EndpointType::ApplicationId),
    ("app-id", EndpointType::ApplicationId),
    ("deviceid", EndpointType::DeviceId),
    ("device-id", EndpointType::DeviceId),
    ("id", EndpointType::Id),
    ("endpoint-id", EndpointType::Id),
    ("label", EndpointType::Label),
];

impl EndpointType {
    pub const ALL: &'static [EndpointType] = &[
        Self::Any,
        Self::PhoneNumber,
        Self::EmailAddress,
        Self::Url,
        Self::Topic,
        Self::UserId,
        Self::ApplicationId,
        Self::DeviceId,
        Self::Id,
        Self::Label,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::PhoneNumber => "PhoneNumber",
            Self::EmailAddress => "EmailAddress",
            Self::Url => "Url",
            Self::Topic => "Topic",
            Self::UserId => "UserId",
            Self::ApplicationId => "ApplicationId",
            Self::DeviceId => "DeviceId",
            Self::Id => "Id",
            Self::Label => "Label",
        }
    }

    /// Whether this is the wildcard type.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for EndpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ENDPOINT_TYPE_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(needle))
            .map(|(_, endpoint_type)| *endpoint_type)
            .ok_or_else(|| Error::unknown_endpoint_type(s))
    }
}

impl TryFrom<String> for EndpointType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EndpointType> for String {
    fn from(value: EndpointType) -> Self {
        value.as_str().to_string()
    }
}

/// One side of a message: an address together with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub address: String,
}

impl Endpoint {
    pub fn new(endpoint_type: EndpointType, address: impl Into<String>) -> Self {
        Self {
            endpoint_type,
            address: address.into(),
        }
    }

    pub fn phone(address: impl Into<String>) -> Self {
        Self::new(EndpointType::PhoneNumber, address)
    }

    pub fn email(address: impl Into<String>) -> Self {
        Self::new(EndpointType::EmailAddress, address)
    }

    pub fn url(address: impl Into<String>) -> Self {
        Self::new(EndpointType::Url, address)
    }

    pub fn topic(address: impl Into<String>) -> Self {
        Self::new(EndpointType::Topic, address)
    }

    pub fn user(address: impl Into<String>) -> Self {
        Self::new(EndpointType::UserId, address)
    }

    pub fn application(address: impl Into<String>) -> Self {
        Self::new(EndpointType::ApplicationId, address)
    }

    pub fn device(address: impl Into<String>) -> Self {
        Self::new(EndpointType::DeviceId, address)
    }

    pub fn id(address: impl Into<String>) -> Self {
        Self::new(EndpointType::Id, address)
    }

    pub fn label(address: impl Into<String>) -> Self {
        Self::new(EndpointType::Label, address)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint_type, self.address)
    }
}

// ── Content ─────────────────────────────────────────────────────────────────

/// Closed set of content tags a schema can declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageContentType {
    PlainText,
    Html,
    Json,
    Binary,
    Template,
    Media,
    Multipart,
}

impl MessageContentType {
    pub const ALL: &'static [MessageContentType] = &[
        Self::PlainText,
        Self::Html,
        Self::Json,
        Self::Binary,
        Self::Template,
        Self::Media,
        Self::Multipart,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "PlainText",
            Self::Html => "Html",
            Self::Json => "Json",
            Self::Binary => "Binary",
            Self::Template => "Template",
            Self::Media => "Media",
            Self::Multipart => "Multipart",
        }
    }
}

impl fmt::Display for MessageContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        if needle.eq_ignore_ascii_case("text") || needle.eq_ignore_ascii_case("plain") {
            return Ok(Self::PlainText);
        }
        Self::ALL
            .iter()
            .find(|ct| ct.as_str().eq_ignore_ascii_case(needle))
            .copied()
            .ok_or_else(|| Error::UnknownContentType { name: s.to_string() })
    }
}

impl TryFrom<String> for MessageContentType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MessageContentType> for String {
    fn from(value: MessageContentType) -> Self {
        value.as_str().to_string()
    }
}

/// Message body. Only the tag matters to validation; providers own encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Html {
        html: String,
    },
    Json {
        value: serde_json::Value,
    },
    Binary {
        data: Vec<u8>,
        mime_type: String,
    },
    Template {
        template_id: String,
        #[serde(default)]
        parameters: BTreeMap<String, serde_json::Value>,
    },
    Media {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Multipart {
        parts: Vec<MessageContent>,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::Html { html: html.into() }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::Json { value }
    }

    pub fn template(template_id: impl Into<String>) -> Self {
        Self::Template {
            template_id: template_id.into(),
            parameters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> MessageContentType {
        match self {
            Self::Text { .. } => MessageContentType::PlainText,
            Self::Html { .. } => MessageContentType::Html,
            Self::Json { .. } => MessageContentType::Json,
            Self::Binary { .. } => MessageContentType::Binary,
            Self::Template { .. } => MessageContentType::Template,
            Self::Media { .. } => MessageContentType::Media,
            Self::Multipart { .. } => MessageContentType::Multipart,
        }
    }
}

// ── Typed values ────────────────────────────────────────────────────────────

/// Primitive type a parameter or message property is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "float", alias = "double")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
        })
    }
}

/// A connection-settings or message-property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
}

impl DataValue {
    /// Type of the value, `None` for null.
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Number(_) => Some(DataType::Number),
            Self::String(_) => Some(DataType::String),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Non-null, and not a blank string.
    #[must_use]
    pub fn has_content(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    /// Whether the value can be used where `data_type` is declared.
    ///
    /// Integers widen to numbers; numbers narrow to integers only when they
    /// carry no fractional part. Strings and booleans match exactly.
    #[must_use]
    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match (self, data_type) {
            (Self::String(_), DataType::String)
            | (Self::Boolean(_), DataType::Boolean)
            | (Self::Integer(_), DataType::Integer | DataType::Number)
            | (Self::Number(_), DataType::Number) => true,
            (Self::Number(n), DataType::Integer) => n.is_finite() && n.fract() == 0.0,
            _ => false,
        }
    }

    /// Equality that treats `Integer(1)` and `Number(1.0)` as the same value.
    #[must_use]
    pub fn loosely_equals(&self, other: &DataValue) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Number(b)) | (Self::Number(b), Self::Integer(a)) => {
                (*a as f64) == *b
            },
            _ => self == other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for DataValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ── Message ─────────────────────────────────────────────────────────────────

/// A message about to be dispatched through (or received from) a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Endpoint>,
    pub content: MessageContent,
    #[serde(default)]
    pub properties: BTreeMap<String, DataValue>,
}

impl Message {
    /// Create a message with a fresh random id.
    pub fn new(content: MessageContent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: None,
            receiver: None,
            content,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_sender(mut self, sender: Endpoint) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_receiver(mut self, receiver: Endpoint) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn content_type(&self) -> MessageContentType {
        self.content.content_type()
    }

    /// Look up a property by name, ignoring ASCII case.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&DataValue> {
        self.properties
            .get(name)
            .or_else(|| {
                self.properties
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
    }
}
