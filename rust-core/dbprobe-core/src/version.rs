// SPDX-License-Identifier: PMPL-1.0-or-later
//! Version-to-protocol-variant selection.
//!
//! The mapping is a table ([`VARIANT_TABLE`]) of
//! `(auth plugin, major-version bracket) -> variant` rows. Adding support for
//! a new engine line is a new row; [`resolve_variant`] is the only place the
//! table is read.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// Security plugin an engine distribution ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthPlugin {
    /// Elastic's native security plugin.
    #[serde(rename = "X-Pack")]
    XPack,
    /// The OpenSearch security plugin.
    OpenSearch,
}

impl AuthPlugin {
    pub const fn as_str(self) -> &'static str {
        match self {
            AuthPlugin::XPack => "X-Pack",
            AuthPlugin::OpenSearch => "OpenSearch",
        }
    }
}

impl fmt::Display for AuthPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthPlugin {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "xpack" => Ok(AuthPlugin::XPack),
            "opensearch" => Ok(AuthPlugin::OpenSearch),
            _ => Err(ProbeError::UnsupportedVersion {
                version: String::new(),
                plugin: s.to_string(),
            }),
        }
    }
}

/// Protocol variant a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVariant {
    /// Elastic 7.x and earlier, and OpenSearch 1.x/2.x.
    V1,
    /// Elastic 8.x.
    V2,
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::V1 => f.write_str("v1"),
            ProtocolVariant::V2 => f.write_str("v2"),
        }
    }
}

/// Inclusive range of major versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorBracket {
    pub min: u64,
    pub max: u64,
}

impl MajorBracket {
    pub const fn up_to(max: u64) -> Self {
        Self { min: 0, max }
    }

    pub const fn exactly(major: u64) -> Self {
        Self { min: major, max: major }
    }

    pub const fn between(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn contains(&self, major: u64) -> bool {
        self.min <= major && major <= self.max
    }
}

/// One row of the variant table.
#[derive(Debug, Clone, Copy)]
pub struct VariantRule {
    pub plugin: AuthPlugin,
    pub majors: MajorBracket,
    pub variant: ProtocolVariant,
}

/// Supported `(plugin, major bracket)` combinations.
pub const VARIANT_TABLE: &[VariantRule] = &[
    VariantRule {
        plugin: AuthPlugin::XPack,
        majors: MajorBracket::up_to(7),
        variant: ProtocolVariant::V1,
    },
    VariantRule {
        plugin: AuthPlugin::XPack,
        majors: MajorBracket::exactly(8),
        variant: ProtocolVariant::V2,
    },
    // OpenSearch forked from Elastic 7.10 and kept its wire format.
    VariantRule {
        plugin: AuthPlugin::OpenSearch,
        majors: MajorBracket::between(1, 2),
        variant: ProtocolVariant::V1,
    },
];

/// Engine version plus auth plugin, as recorded in a version catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub version: String,
    pub auth_plugin: AuthPlugin,
}

impl EngineVersion {
    pub fn new(version: impl Into<String>, auth_plugin: AuthPlugin) -> Self {
        Self {
            version: version.into(),
            auth_plugin,
        }
    }

    pub fn variant(&self) -> Result<ProtocolVariant> {
        resolve_variant(self.auth_plugin, &self.version)
    }
}

/// Parse a version leniently.
///
/// Accepts a leading `v`, and fills missing minor/patch components with 0,
/// so `"8"`, `"v7.17"` and `"2.11.1"` all parse.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(at) => trimmed.split_at(at),
        None => (trimmed, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

/// Select the protocol variant for `(plugin, version)`.
pub fn resolve_variant(plugin: AuthPlugin, version: &str) -> Result<ProtocolVariant> {
    let unsupported = || ProbeError::UnsupportedVersion {
        version: version.to_string(),
        plugin: plugin.to_string(),
    };
    let parsed = parse_version(version).ok_or_else(unsupported)?;
    VARIANT_TABLE
        .iter()
        .find(|rule| rule.plugin == plugin && rule.majors.contains(parsed.major))
        .map(|rule| rule.variant)
        .ok_or_else(unsupported)
}
