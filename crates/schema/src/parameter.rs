//! Connection parameter and message property descriptors.

use {
    serde::{Deserialize, Serialize},
    switchboard_common::{DataType, DataValue},
};

use crate::error::{Error, Result};

/// Shared shape of a named, typed value rule.
///
/// Both connection parameters and message properties are checked the same
/// way by the validation engine.
pub trait ValueRule {
    fn name(&self) -> &str;
    fn data_type(&self) -> DataType;
    fn is_required(&self) -> bool;
    fn default_value(&self) -> Option<&DataValue>;
    fn allowed_values(&self) -> Option<&[DataValue]>;
    fn is_sensitive(&self) -> bool;

    /// Whether `value` is a member of the allowed list (or no list is set).
    fn allows(&self, value: &DataValue) -> bool {
        self.allowed_values()
            .is_none_or(|allowed| allowed.iter().any(|a| a.loosely_equals(value)))
    }

    /// Fails when a default is set that the declared type cannot hold.
    fn check_default(&self) -> Result<()> {
        match self.default_value() {
            Some(value) if !value.is_null() && !value.is_compatible_with(self.data_type()) => {
                Err(Error::InvalidDefault {
                    name: self.name().to_string(),
                    expected: self.data_type().to_string(),
                })
            },
            _ => Ok(()),
        }
    }
}

macro_rules! value_rule {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $ty {
            pub name: String,
            #[serde(rename = "type")]
            pub data_type: DataType,
            #[serde(default)]
            pub is_required: bool,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub default_value: Option<DataValue>,
            #[serde(default)]
            pub is_sensitive: bool,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub allowed_values: Option<Vec<DataValue>>,
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub description: Option<String>,
        }

        impl $ty {
            pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
                Self {
                    name: name.into(),
                    data_type,
                    is_required: false,
                    default_value: None,
                    is_sensitive: false,
                    allowed_values: None,
                    description: None,
                }
            }

            pub fn required(mut self) -> Self {
                self.is_required = true;
                self
            }

            pub fn optional(mut self) -> Self {
                self.is_required = false;
                self
            }

            pub fn sensitive(mut self) -> Self {
                self.is_sensitive = true;
                self
            }

            /// The type is checked when the rule is added to a schema.
            pub fn with_default(mut self, value: impl Into<DataValue>) -> Self {
                self.default_value = Some(value.into());
                self
            }

            pub fn with_allowed_values<I, V>(mut self, values: I) -> Self
            where
                I: IntoIterator<Item = V>,
                V: Into<DataValue>,
            {
                self.allowed_values = Some(values.into_iter().map(Into::into).collect());
                self
            }

            pub fn with_description(mut self, description: impl Into<String>) -> Self {
                self.description = Some(description.into());
                self
            }

            /// Case-insensitive name comparison.
            #[must_use]
            pub fn is_named(&self, name: &str) -> bool {
                self.name.eq_ignore_ascii_case(name)
            }
        }

        impl ValueRule for $ty {
            fn name(&self) -> &str {
                &self.name
            }

            fn data_type(&self) -> DataType {
                self.data_type
            }

            fn is_required(&self) -> bool {
                self.is_required
            }

            fn default_value(&self) -> Option<&DataValue> {
                self.default_value.as_ref()
            }

            fn allowed_values(&self) -> Option<&[DataValue]> {
                self.allowed_values.as_deref()
            }

            fn is_sensitive(&self) -> bool {
                self.is_sensitive
            }
        }
    };
}

value_rule! {
    /// A connection parameter a channel accepts.
    ChannelParameter
}

value_rule! {
    /// A property that may be attached to individual messages.
    MessagePropertyRule
}
