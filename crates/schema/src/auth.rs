//! Authentication methods and the parameter patterns that satisfy them.
//!
//! Each method is satisfied by any one of a fixed list of parameter groups;
//! a group is satisfied when every parameter in it has a value. Names are
//! matched case-insensitively against the connection settings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::settings::ConnectionSettings;

/// Authentication method a channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthenticationType {
    /// Anonymous access, always satisfied.
    #[serde(alias = "none")]
    None,
    #[serde(alias = "basic")]
    Basic,
    #[serde(alias = "api-key", alias = "apikey")]
    ApiKey,
    #[serde(alias = "token", alias = "bearer")]
    Token,
    #[serde(alias = "client-credentials", alias = "oauth2")]
    ClientCredentials,
    #[serde(alias = "certificate")]
    Certificate,
    #[serde(alias = "custom")]
    Custom,
}

const BASIC: &[&[&str]] = &[
    &["Username", "Password"],
    &["AccountSid", "AuthToken"],
    &["User", "Pass"],
    &["ClientId", "ClientSecret"],
];
const API_KEY: &[&[&str]] = &[&["ApiKey"], &["Key"], &["AccessKey"]];
const TOKEN: &[&[&str]] = &[&["Token"], &["AccessToken"], &["BearerToken"], &["AuthToken"]];
const CLIENT_CREDENTIALS: &[&[&str]] = &[&["ClientId", "ClientSecret"]];
const CERTIFICATE: &[&[&str]] = &[
    &["Certificate"],
    &["CertificatePath"],
    &["CertificateThumbprint"],
    &["PfxFile"],
];
const CUSTOM: &[&[&str]] = &[
    &["CustomAuth"],
    &["AuthenticationData"],
    &["Credentials"],
    &["AuthConfig"],
    &["SecretKey"],
    &["PrivateKey"],
    &["Signature"],
    &["Hash"],
];

/// Accepted next to a certificate but never required.
const CERTIFICATE_COMPANIONS: &[&str] = &["CertificatePassword", "PfxPassword"];

impl AuthenticationType {
    pub const ALL: &'static [AuthenticationType] = &[
        Self::None,
        Self::Basic,
        Self::ApiKey,
        Self::Token,
        Self::ClientCredentials,
        Self::Certificate,
        Self::Custom,
    ];

    /// Alternative parameter groups, any one of which satisfies this method.
    #[must_use]
    pub fn parameter_groups(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::None => &[],
            Self::Basic => BASIC,
            Self::ApiKey => API_KEY,
            Self::Token => TOKEN,
            Self::ClientCredentials => CLIENT_CREDENTIALS,
            Self::Certificate => CERTIFICATE,
            Self::Custom => CUSTOM,
        }
    }

    /// Every parameter name this method may read, including optional ones.
    pub fn parameter_names(&self) -> impl Iterator<Item = &'static str> {
        let companions: &'static [&'static str] = match self {
            Self::Certificate => CERTIFICATE_COMPANIONS,
            _ => &[],
        };
        self.parameter_groups()
            .iter()
            .flat_map(|group| group.iter().copied())
            .chain(companions.iter().copied())
    }

    /// Whether `name` is one of this method's parameters.
    #[must_use]
    pub fn uses_parameter(&self, name: &str) -> bool {
        self.parameter_names()
            .any(|candidate| candidate.eq_ignore_ascii_case(name))
    }

    /// The first group fully present in `settings`, if any.
    #[must_use]
    pub fn satisfying_group(
        &self,
        settings: &ConnectionSettings,
    ) -> Option<&'static [&'static str]> {
        self.parameter_groups().iter().copied().find(|group| {
            group
                .iter()
                .all(|name| settings.get(name).is_some_and(|v| v.has_content()))
        })
    }

    #[must_use]
    pub fn is_satisfied_by(&self, settings: &ConnectionSettings) -> bool {
        matches!(self, Self::None) || self.satisfying_group(settings).is_some()
    }

    /// Human-readable requirement, e.g. `ApiKey (ApiKey | Key | AccessKey)`.
    #[must_use]
    pub fn describe_requirement(&self) -> String {
        let groups: Vec<String> = self
            .parameter_groups()
            .iter()
            .map(|group| group.join(" + "))
            .collect();
        if groups.is_empty() {
            return self.to_string();
        }
        format!("{self} ({})", groups.join(" | "))
    }
}

impl fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
