// SPDX-License-Identifier: PMPL-1.0-or-later
//! Transport configuration.
//!
//! Defaults are the fixed timeouts every builder bakes into its transport:
//! - connect: 30s
//! - idle connection: 3s
//! - request: 30s
//!
//! Overrides come from `DBPROBE_*` environment variables via
//! [`TransportConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// Environment variable overriding [`TransportConfig::connect_timeout_secs`].
pub const ENV_CONNECT_TIMEOUT: &str = "DBPROBE_CONNECT_TIMEOUT_SECS";
/// Environment variable overriding [`TransportConfig::idle_timeout_secs`].
pub const ENV_IDLE_TIMEOUT: &str = "DBPROBE_IDLE_TIMEOUT_SECS";
/// Environment variable overriding [`TransportConfig::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT: &str = "DBPROBE_REQUEST_TIMEOUT_SECS";
/// Environment variable overriding [`TransportConfig::accept_invalid_certs`].
pub const ENV_ACCEPT_INVALID_CERTS: &str = "DBPROBE_ACCEPT_INVALID_CERTS";

/// Highest TLS protocol version a transport may negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsVersionCap {
    /// TLS 1.2 at most.
    Tls12,
    /// TLS 1.3 at most.
    Tls13,
}

impl Default for TlsVersionCap {
    fn default() -> Self {
        TlsVersionCap::Tls13
    }
}

/// Timeouts and TLS knobs applied to every transport a builder constructs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Dial timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Idle pooled-connection timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum TLS version.
    pub max_tls_version: TlsVersionCap,
    /// Skip server certificate verification. Never enabled by default.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            idle_timeout_secs: 3,
            request_timeout_secs: 30,
            max_tls_version: TlsVersionCap::Tls13,
            accept_invalid_certs: false,
        }
    }
}

impl TransportConfig {
    /// Defaults overlaid with `DBPROBE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Malformed values are a [`ProbeError::Config`]; absent ones keep the
    /// default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_CONNECT_TIMEOUT) {
            config.connect_timeout_secs = parse_secs(ENV_CONNECT_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_IDLE_TIMEOUT) {
            config.idle_timeout_secs = parse_secs(ENV_IDLE_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT, &v)?;
        }
        if let Some(v) = lookup(ENV_ACCEPT_INVALID_CERTS) {
            config.accept_invalid_certs = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ProbeError::Config(format!(
                        "{ENV_ACCEPT_INVALID_CERTS}: expected a boolean, got {other:?}"
                    )))
                }
            };
        }
        Ok(config)
    }

    /// Cap the negotiated TLS version.
    pub fn with_max_tls_version(mut self, cap: TlsVersionCap) -> Self {
        self.max_tls_version = cap;
        self
    }

    /// Dial timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Idle pooled-connection timeout.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    let secs: u64 = value
        .trim()
        .parse()
        .map_err(|_| ProbeError::Config(format!("{key}: expected seconds, got {value:?}")))?;
    if secs == 0 {
        return Err(ProbeError::Config(format!("{key}: timeout must be positive")));
    }
    Ok(secs)
}
