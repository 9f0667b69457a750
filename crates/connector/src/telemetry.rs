//! Metric names recorded when the `metrics` feature is enabled.

/// Provider calls by provider, operation and outcome code.
pub const OPERATIONS_TOTAL: &str = "switchboard_connector_operations_total";
/// Provider call duration in seconds, by provider and operation.
pub const OPERATION_DURATION_SECONDS: &str = "switchboard_connector_operation_duration_seconds";
/// Operations rejected before reaching the provider, by reason code.
pub const REJECTIONS_TOTAL: &str = "switchboard_connector_rejections_total";
/// Messages handed to a provider through batch sends.
pub const BATCH_MESSAGES_TOTAL: &str = "switchboard_connector_batch_messages_total";
/// Schemas with a registered provider factory.
pub const REGISTERED_SCHEMAS: &str = "switchboard_connector_registered_schemas";
