//! Validation engine.
//!
//! Both entry points are pure: they borrow a schema and a candidate and
//! return a lazy iterator of failures. Every check runs, so a single pass
//! surfaces every problem. An empty iterator means the candidate is valid.

use std::{fmt, iter};

use {
    serde::Serialize,
    switchboard_common::{DataValue, Message},
};

use crate::{parameter::ValueRule, schema::ChannelSchema, settings::ConnectionSettings};

/// One problem found while validating settings or a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub message: String,
    /// Names of the fields the failure applies to.
    pub members: Vec<String>,
}

impl ValidationFailure {
    pub fn new(
        message: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            message: message.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Failure that concerns a single field.
    pub fn for_member(message: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            members: vec![member.into()],
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Which collection a [`ValueRule`] belongs to, for failure messages.
#[derive(Clone, Copy)]
enum Scope {
    Parameter,
    Property,
}

impl Scope {
    fn label(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Property => "message property",
        }
    }
}

/// Check one declared value against its rule. At most one failure is
/// produced per rule: missing, then type, then allowed values.
fn check_value(
    rule: &impl ValueRule,
    value: Option<&DataValue>,
    scope: Scope,
) -> Option<ValidationFailure> {
    let name = rule.name();
    let label = scope.label();
    let value = match value {
        Some(v) if !v.is_null() => v,
        _ if rule.is_required() => {
            return Some(ValidationFailure::for_member(
                format!("Required {label} '{name}' is missing"),
                name,
            ));
        },
        _ => return None,
    };
    if !value.is_compatible_with(rule.data_type()) {
        let actual = value
            .data_type()
            .map_or_else(|| "Null".to_string(), |t| t.to_string());
        return Some(ValidationFailure::for_member(
            format!(
                "The {label} '{name}' expects a value of type {} but got {actual}",
                rule.data_type()
            ),
            name,
        ));
    }
    if !rule.allows(value) {
        let allowed: Vec<String> = rule
            .allowed_values()
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect();
        return Some(ValidationFailure::for_member(
            format!(
                "The value of {label} '{name}' is not one of the allowed values: {}",
                allowed.join(", ")
            ),
            name,
        ));
    }
    None
}

// ── Connection settings ─────────────────────────────────────────────────────

/// Validate connection settings against a schema.
///
/// Order: declared parameters (declaration order), then the authentication
/// check, then unknown keys when the schema is strict. Keys that belong to
/// a declared authentication type never count as unknown.
pub fn validate_connection_settings<'a>(
    schema: &'a ChannelSchema,
    settings: &'a ConnectionSettings,
) -> impl Iterator<Item = ValidationFailure> + 'a {
    let declared = schema
        .parameters()
        .iter()
        .filter_map(move |param| check_value(param, settings.get(&param.name), Scope::Parameter));

    let auth = iter::once_with(move || check_authentication(schema, settings)).flatten();

    let unknown = settings
        .keys()
        .filter(move |_| schema.is_strict())
        .filter(move |key| schema.find_parameter(key).is_none())
        .filter(move |key| {
            !schema
                .authentication_types()
                .iter()
                .any(|declared| declared.uses_parameter(key))
        })
        .map(move |key| {
            ValidationFailure::for_member(
                format!(
                    "Unknown parameter '{key}' is not supported by {}",
                    schema.display_name()
                ),
                key,
            )
        });

    declared.chain(auth).chain(unknown)
}

/// One aggregate failure when none of the declared authentication types is
/// satisfied. Schemas without authentication types accept anything.
fn check_authentication(
    schema: &ChannelSchema,
    settings: &ConnectionSettings,
) -> Option<ValidationFailure> {
    let declared = schema.authentication_types();
    if declared.is_empty() || declared.iter().any(|auth| auth.is_satisfied_by(settings)) {
        return None;
    }
    let requirements: Vec<String> = declared
        .iter()
        .map(|auth| auth.describe_requirement())
        .collect();
    let mut members: Vec<&str> = Vec::new();
    for name in declared.iter().flat_map(|auth| {
        auth.parameter_groups()
            .iter()
            .flat_map(|group| group.iter().copied())
    }) {
        if !members.contains(&name) {
            members.push(name);
        }
    }
    Some(ValidationFailure::new(
        format!(
            "Connection settings do not satisfy any supported authentication type: {}",
            requirements.join("; ")
        ),
        members,
    ))
}

// ── Messages ────────────────────────────────────────────────────────────────

/// Validate a message against a schema.
///
/// Order: id, sender, receiver, content type, declared properties
/// (declaration order), then unknown properties when the schema is strict.
pub fn validate_message<'a>(
    schema: &'a ChannelSchema,
    message: &'a Message,
) -> impl Iterator<Item = ValidationFailure> + 'a {
    let id = iter::once_with(move || {
        message
            .id
            .trim()
            .is_empty()
            .then(|| ValidationFailure::for_member("Message id is required", "Id"))
    });

    let sender = iter::once_with(move || {
        let endpoint = message.sender.as_ref()?;
        let allowed = schema
            .endpoint_rule_for(endpoint.endpoint_type)
            .is_some_and(|rule| rule.can_send);
        (!allowed).then(|| {
            ValidationFailure::for_member(
                format!(
                    "Endpoint type '{}' is not allowed as sender",
                    endpoint.endpoint_type
                ),
                "Sender",
            )
        })
    });

    let receiver = iter::once_with(move || {
        let endpoint = message.receiver.as_ref()?;
        let allowed = schema
            .endpoint_rule_for(endpoint.endpoint_type)
            .is_some_and(|rule| rule.can_receive);
        (!allowed).then(|| {
            ValidationFailure::for_member(
                format!(
                    "Endpoint type '{}' is not allowed as receiver",
                    endpoint.endpoint_type
                ),
                "Receiver",
            )
        })
    });

    let content = iter::once_with(move || {
        let content_type = message.content_type();
        (!schema.supports_content_type(content_type)).then(|| {
            ValidationFailure::for_member(
                format!("Content type '{content_type}' is not supported"),
                "Content",
            )
        })
    });

    let declared = schema
        .message_properties()
        .iter()
        .filter_map(move |rule| check_value(rule, message.property(&rule.name), Scope::Property));

    let unknown = message
        .properties
        .keys()
        .filter(move |_| schema.is_strict())
        .filter(move |key| schema.find_message_property(key).is_none())
        .map(move |key| {
            ValidationFailure::for_member(
                format!(
                    "Unknown message property '{key}' is not supported by {}",
                    schema.display_name()
                ),
                key.as_str(),
            )
        });

    id.chain(sender)
        .chain(receiver)
        .chain(content)
        .flatten()
        .chain(declared)
        .chain(unknown)
}
