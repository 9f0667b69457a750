//! Capability flags a channel schema can advertise.

use std::{
    fmt,
    ops::{BitAnd, BitOr, BitOrAssign, Sub},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::Error;

/// Set of operation classes a channel supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const SEND_MESSAGES: Self = Self(1);
    pub const RECEIVE_MESSAGES: Self = Self(1 << 1);
    pub const MESSAGE_STATUS_QUERY: Self = Self(1 << 2);
    pub const BULK_MESSAGING: Self = Self(1 << 3);
    pub const TEMPLATES: Self = Self(1 << 4);
    pub const MEDIA_ATTACHMENTS: Self = Self(1 << 5);
    pub const HEALTH_CHECK: Self = Self(1 << 6);
    pub const HANDLE_MESSAGE_STATE: Self = Self(1 << 7);
    pub const ALL: Self = Self((1 << 8) - 1);

    /// Canonical names, in bit order.
    const NAMES: &'static [(&'static str, Capabilities)] = &[
        ("SendMessages", Self::SEND_MESSAGES),
        ("ReceiveMessages", Self::RECEIVE_MESSAGES),
        ("MessageStatusQuery", Self::MESSAGE_STATUS_QUERY),
        ("BulkMessaging", Self::BULK_MESSAGING),
        ("Templates", Self::TEMPLATES),
        ("MediaAttachments", Self::MEDIA_ATTACHMENTS),
        ("HealthCheck", Self::HEALTH_CHECK),
        ("HandleMessageState", Self::HANDLE_MESSAGE_STATE),
    ];

    /// Short spellings accepted in schema definitions.
    const ALIASES: &'static [(&'static str, Capabilities)] = &[
        ("send", Self::SEND_MESSAGES),
        ("receive", Self::RECEIVE_MESSAGES),
        ("status", Self::MESSAGE_STATUS_QUERY),
        ("status-query", Self::MESSAGE_STATUS_QUERY),
        ("bulk", Self::BULK_MESSAGING),
        ("media", Self::MEDIA_ATTACHMENTS),
        ("health", Self::HEALTH_CHECK),
        ("message-state", Self::HANDLE_MESSAGE_STATE),
    ];

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Every flag of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[must_use]
    pub const fn is_subset_of(self, other: Self) -> bool {
        other.contains(self)
    }

    /// Canonical names of the set flags, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for Capabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Sub for Capabilities {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let names: Vec<&str> = self.names().collect();
        f.write_str(&names.join(" | "))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities({self})")
    }
}

impl FromStr for Capabilities {
    type Err = Error;

    /// Parse a single flag name or alias, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        if needle.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        Self::NAMES
            .iter()
            .chain(Self::ALIASES)
            .find(|(name, _)| name.eq_ignore_ascii_case(needle))
            .map(|(_, flag)| *flag)
            .ok_or_else(|| Error::UnknownCapability {
                name: s.to_string(),
            })
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

impl<'de> Deserialize<'de> for Capabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.iter().try_fold(Self::NONE, |acc, name| {
            name.parse::<Self>()
                .map(|flag| acc | flag)
                .map_err(de::Error::custom)
        })
    }
}
