//! Connection settings supplied when a connector is initialized.

use std::{collections::BTreeMap, fmt, sync::Arc};

use {
    serde::{
        Deserialize, Deserializer, Serialize,
        de::{MapAccess, Visitor},
    },
    switchboard_common::DataValue,
    tracing::debug,
};

use crate::{
    error::{Context, Result},
    parameter::ValueRule,
    schema::ChannelSchema,
    validate::{ValidationFailure, validate_connection_settings},
};

const REDACTED: &str = "[REDACTED]";

/// Parameter values keyed by name, optionally bound to a schema.
///
/// Names are looked up case-insensitively. A bound schema supplies default
/// values and the sensitivity flags used when the settings are printed.
/// Cloning copies the whole map; two instances never share storage.
#[derive(Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ConnectionSettings {
    parameters: BTreeMap<String, DataValue>,
    #[serde(skip)]
    schema: Option<Arc<ChannelSchema>>,
}

impl ConnectionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty settings bound to `schema`.
    pub fn for_schema(schema: Arc<ChannelSchema>) -> Self {
        Self {
            parameters: BTreeMap::new(),
            schema: Some(schema),
        }
    }

    /// Copy of `self` bound to `schema`.
    #[must_use]
    pub fn bound_to(&self, schema: Arc<ChannelSchema>) -> Self {
        Self {
            parameters: self.parameters.clone(),
            schema: Some(schema),
        }
    }

    #[must_use]
    pub fn schema(&self) -> Option<&ChannelSchema> {
        self.schema.as_deref()
    }

    /// Builder-style [`ConnectionSettings::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a value, replacing any existing key that differs only in case.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<DataValue>) {
        let name = name.into();
        if let Some(existing) = self.key_for(&name) {
            self.parameters.remove(&existing);
        }
        self.parameters.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<DataValue> {
        let key = self.key_for(name)?;
        self.parameters.remove(&key)
    }

    /// Value explicitly set for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.parameters.get(name).or_else(|| {
            self.parameters
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Explicit value, or the bound schema's default for `name`.
    #[must_use]
    pub fn get_or_default(&self, name: &str) -> Option<&DataValue> {
        self.get(name).filter(|v| !v.is_null()).or_else(|| {
            self.schema
                .as_deref()
                .and_then(|schema| schema.find_parameter(name))
                .and_then(ValueRule::default_value)
        })
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_or_default(name).and_then(DataValue::as_str)
    }

    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get_or_default(name).and_then(DataValue::as_i64)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_or_default(name).and_then(DataValue::as_bool)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Validate against the bound schema. Unbound settings have nothing to
    /// be checked against and yield no failures.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationFailure> {
        match self.schema.as_deref() {
            Some(schema) => validate_connection_settings(schema, self).collect(),
            None => Vec::new(),
        }
    }

    /// Values with sensitive parameters masked, for logging.
    #[must_use]
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .map(|(key, value)| {
                let shown = if self.is_sensitive(key) {
                    REDACTED.to_string()
                } else {
                    value.to_string()
                };
                (key.clone(), shown)
            })
            .collect()
    }

    /// Parse a TOML table of settings, resolving `${VAR}` placeholders in
    /// string values from the process environment.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Self::from_toml_str_with(input, |name| std::env::var(name).ok())
    }

    /// Like [`ConnectionSettings::from_toml_str`] with a custom variable lookup.
    pub fn from_toml_str_with(
        input: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let table: toml::Table = toml::from_str(input).context("invalid settings TOML")?;
        let mut settings = Self::new();
        for (name, value) in table {
            let value = match value {
                toml::Value::String(s) => DataValue::String(expand_placeholders(&s, &lookup)),
                toml::Value::Integer(i) => DataValue::Integer(i),
                toml::Value::Float(f) => DataValue::Number(f),
                toml::Value::Boolean(b) => DataValue::Boolean(b),
                other => {
                    return Err(crate::Error::message(format!(
                        "setting '{name}' has unsupported type {}",
                        other.type_str()
                    )));
                },
            };
            settings.set(name, value);
        }
        debug!(count = settings.len(), "loaded connection settings");
        Ok(settings)
    }

    fn key_for(&self, name: &str) -> Option<String> {
        self.parameters
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn is_sensitive(&self, name: &str) -> bool {
        self.schema
            .as_deref()
            .and_then(|schema| schema.find_parameter(name))
            .is_some_and(|param| param.is_sensitive)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("parameters", &self.redacted())
            .field(
                "schema",
                &self.schema.as_deref().map(ChannelSchema::logical_identity),
            )
            .finish()
    }
}

impl<K: Into<String>, V: Into<DataValue>> FromIterator<(K, V)> for ConnectionSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |settings, (k, v)| settings.with(k, v))
    }
}

/// Entries go through [`ConnectionSettings::set`] in document order, so keys
/// differing only in case collapse into one and the last one wins.
impl<'de> Deserialize<'de> for ConnectionSettings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SettingsVisitor;

        impl<'de> Visitor<'de> for SettingsVisitor {
            type Value = ConnectionSettings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut settings = ConnectionSettings::new();
                while let Some((name, value)) = map.next_entry::<String, DataValue>()? {
                    settings.set(name, value);
                }
                Ok(settings)
            }
        }

        deserializer.deserialize_map(SettingsVisitor)
    }
}

/// Replace `${NAME}` with `lookup(NAME)`. Unknown or unterminated
/// placeholders are kept verbatim.
fn expand_placeholders(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            },
            _ => {
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }
    out.push_str(rest);
    out
}
