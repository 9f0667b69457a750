//! Results returned by connector operations.

use std::{collections::BTreeMap, time::Duration};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    switchboard_common::Message,
};

use crate::{error::ConnectorResult, state::ConnectorState};

/// Delivery status reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    Unknown,
    Queued,
    Sent,
    Delivered,
    DeliveryFailed,
    Received,
    Read,
}

impl MessageStatus {
    /// No further status changes are expected.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Delivered | Self::DeliveryFailed | Self::Read)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub message_id: String,
    /// Identifier assigned by the remote service, when it returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_message_id: Option<String>,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_data: BTreeMap<String, serde_json::Value>,
}

impl SendResult {
    #[must_use]
    pub fn new(message_id: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            message_id: message_id.into(),
            remote_message_id: None,
            status,
            timestamp: Utc::now(),
            additional_data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_message_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_data.insert(key.into(), value);
        self
    }
}

/// Outcome for one message of a batch.
#[derive(Debug)]
pub struct BatchItemResult {
    pub message_id: String,
    pub outcome: ConnectorResult<SendResult>,
}

impl BatchItemResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-message outcomes in the order the messages were given.
#[derive(Debug)]
pub struct BatchSendResult {
    pub batch_id: String,
    pub items: Vec<BatchItemResult>,
}

impl BatchSendResult {
    #[must_use]
    pub fn new(items: Vec<BatchItemResult>) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            items,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &SendResult> {
        self.items.iter().filter_map(|item| item.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &crate::ConnectorError)> {
        self.items.iter().filter_map(|item| {
            item.outcome
                .as_ref()
                .err()
                .map(|err| (item.message_id.as_str(), err))
        })
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(BatchItemResult::is_success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub message_id: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl StatusUpdate {
    #[must_use]
    pub fn new(message_id: impl Into<String>, status: MessageStatus) -> Self {
        Self {
            message_id: message_id.into(),
            status,
            timestamp: Utc::now(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// Raw inbound payload, e.g. a webhook body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSource {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MessageSource {
    #[must_use]
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::new("application/json", value.to_string())
    }

    #[must_use]
    pub fn form(body: impl Into<String>) -> Self {
        Self::new("application/x-www-form-urlencoded", body.into())
    }

    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new("text/plain", body.into())
    }

    /// Parse the payload as JSON.
    pub fn as_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.data)
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiveResult {
    pub batch_id: String,
    pub messages: Vec<Message>,
}

impl ReceiveResult {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            messages,
        }
    }
}

/// What a provider's own health probe reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub is_healthy: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ProviderHealth {
    #[must_use]
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unhealthy(issue: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            issues: vec![issue.into()],
            details: BTreeMap::new(),
        }
    }
}

/// Connector health: the provider probe merged with lifecycle information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorHealth {
    pub state: ConnectorState,
    pub is_healthy: bool,
    pub last_checked: DateTime<Utc>,
    pub state_changed_at: DateTime<Utc>,
    #[serde(default, with = "optional_millis")]
    pub uptime: Option<Duration>,
    pub issues: Vec<String>,
    pub details: BTreeMap<String, serde_json::Value>,
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::error::ConnectorError, crate::error::ErrorCode};

    #[test]
    fn batch_partitions_outcomes() {
        let batch = BatchSendResult::new(vec![
            BatchItemResult {
                message_id: "a".into(),
                outcome: Ok(SendResult::new("a", MessageStatus::Sent)),
            },
            BatchItemResult {
                message_id: "b".into(),
                outcome: Err(ConnectorError::new(ErrorCode::ProviderError, "rejected")),
            },
        ]);
        assert_eq!(batch.len(), 2);
        assert!(!batch.all_succeeded());
        assert_eq!(batch.successes().count(), 1);
        let failures: Vec<_> = batch.failures().map(|(id, _)| id).collect();
        assert_eq!(failures, vec!["b"]);
    }

    #[test]
    fn source_helpers() {
        let source = MessageSource::json(&serde_json::json!({"From": "+15550100"}));
        assert_eq!(source.content_type, "application/json");
        assert_eq!(source.as_json().unwrap()["From"], "+15550100");
        assert_eq!(MessageSource::text("hi").as_text(), Some("hi"));
    }

    #[test]
    fn health_uptime_serializes_as_millis() {
        let health = ConnectorHealth {
            state: ConnectorState::Connected,
            is_healthy: true,
            last_checked: Utc::now(),
            state_changed_at: Utc::now(),
            uptime: Some(Duration::from_millis(1500)),
            issues: Vec::new(),
            details: BTreeMap::new(),
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["uptime"], 1500);
        assert_eq!(json["state"], "Connected");
    }

    #[test]
    fn final_statuses() {
        assert!(MessageStatus::Delivered.is_final());
        assert!(!MessageStatus::Queued.is_final());
    }
}
