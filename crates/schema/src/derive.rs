//! Derived schemas and the restriction check.
//!
//! A derived schema starts as a deep copy of its base with the same logical
//! identity and is then narrowed with the removal and update operations on
//! [`ChannelSchema`]. [`validate_as_restriction_of`] confirms the result
//! still fits inside the base.

use tracing::debug;

use crate::{schema::ChannelSchema, validate::ValidationFailure};

impl ChannelSchema {
    /// Copy with the display name `"<display name> (Copy)"`.
    #[must_use]
    pub fn derive(&self) -> Self {
        let name = format!("{} (Copy)", self.display_name());
        self.derive_named(name)
    }

    /// Copy with the given display name. The copy owns its collections, so
    /// narrowing it never touches `self`.
    #[must_use]
    pub fn derive_named(&self, display_name: impl Into<String>) -> Self {
        self.clone().with_display_name(display_name)
    }

    /// See [`validate_as_restriction_of`].
    #[must_use]
    pub fn validate_as_restriction_of(&self, base: &ChannelSchema) -> Vec<ValidationFailure> {
        validate_as_restriction_of(self, base)
    }
}

/// Report every way `derived` declares more than `base`.
///
/// The check is advisory. Chains of any depth are verified pair by pair
/// (grandparent → parent, parent → child).
pub fn validate_as_restriction_of(
    derived: &ChannelSchema,
    base: &ChannelSchema,
) -> Vec<ValidationFailure> {
    let mut failures = Vec::new();

    if !derived.is_compatible_with(base) {
        failures.push(ValidationFailure::for_member(
            format!(
                "Schema identity {} does not match base identity {}",
                derived.logical_identity(),
                base.logical_identity()
            ),
            "Identity",
        ));
    }

    let extra = derived.capabilities() - base.capabilities();
    if !extra.is_empty() {
        failures.push(ValidationFailure::for_member(
            format!("Capabilities not supported by the base schema: {extra}"),
            "Capabilities",
        ));
    }

    for param in derived.parameters() {
        if base.find_parameter(&param.name).is_none() {
            failures.push(ValidationFailure::for_member(
                format!("Parameter '{}' is not declared by the base schema", param.name),
                param.name.as_str(),
            ));
        }
    }

    // A derived wildcard resolves to the base wildcard rule.
    for rule in derived.endpoints() {
        let allowed = base.endpoint_rule_for(rule.endpoint_type).is_some_and(|b| {
            (b.can_send || !rule.can_send) && (b.can_receive || !rule.can_receive)
        });
        if !allowed {
            failures.push(ValidationFailure::for_member(
                format!(
                    "Endpoint type '{}' is not allowed by the base schema",
                    rule.endpoint_type
                ),
                rule.endpoint_type.as_str(),
            ));
        }
    }

    if !base.content_types().is_empty() {
        for content_type in derived.content_types() {
            if !base.content_types().contains(content_type) {
                failures.push(ValidationFailure::for_member(
                    format!("Content type '{content_type}' is not supported by the base schema"),
                    content_type.as_str(),
                ));
            }
        }
    }

    for property in derived.message_properties() {
        if base.find_message_property(&property.name).is_none() {
            failures.push(ValidationFailure::for_member(
                format!(
                    "Message property '{}' is not declared by the base schema",
                    property.name
                ),
                property.name.as_str(),
            ));
        }
    }

    for auth in derived.authentication_types() {
        if !base.supports_authentication(*auth) {
            failures.push(ValidationFailure::for_member(
                format!("Authentication type '{auth}' is not supported by the base schema"),
                auth.to_string(),
            ));
        }
    }

    debug!(
        derived = derived.display_name(),
        base = base.display_name(),
        failures = failures.len(),
        "checked schema restriction"
    );
    failures
}
