// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types shared by every dbprobe client builder and protocol client.
//
// Builder stages fail fast with one of the resolution variants; protocol
// operations report remote verdicts (rejections, missing markers, malformed
// payloads) separately from transport failures so callers can tell
// "unreachable" apart from "reachable but unhappy".

use thiserror::Error;

/// Boxed source error from a transport or driver crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while building clients or running protocol operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A required credential could not be resolved.
    #[error("credential missing for {secret}: {reason}")]
    CredentialMissing {
        /// `namespace/name` of the secret (or database) being resolved.
        secret: String,
        /// Which part was missing.
        reason: String,
    },

    /// TLS material could not be parsed or is incomplete.
    #[error("invalid certificate material in {secret}: {reason}")]
    CertificateInvalid {
        /// `namespace/name` of the certificate secret.
        secret: String,
        /// Parse or completeness failure.
        reason: String,
    },

    /// No protocol variant matches the engine version and auth plugin.
    #[error("unsupported version {version} for auth plugin {plugin}")]
    UnsupportedVersion {
        /// The version string as supplied.
        version: String,
        /// The auth-plugin discriminator as supplied.
        plugin: String,
    },

    /// The construction-time connectivity probe failed.
    #[error("connectivity check against {target} failed: {reason}")]
    ConnectivityFailure {
        /// Address the probe was sent to.
        target: String,
        /// Transport error or non-success status.
        reason: String,
    },

    /// The readiness marker (or another addressed object) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response payload was malformed or lacked a required field.
    #[error("failed to parse {operation} response: {reason}")]
    ResponseParseError {
        /// Operation whose response could not be interpreted.
        operation: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },

    /// The store accepted the write request but reported a failure.
    #[error("write rejected: {response}")]
    WriteRejected {
        /// Raw response body for diagnostics.
        response: serde_json::Value,
    },

    /// The store answered a read with a non-success status.
    #[error("read rejected with status {status}")]
    ReadRejected {
        /// HTTP (or protocol) status code.
        status: u16,
    },

    /// A password-change call did not succeed.
    #[error("credential sync failed for user {username}: {reason}")]
    CredentialSyncFailed {
        /// User whose password was being changed.
        username: String,
        /// Transport error or non-success status.
        reason: String,
    },

    /// A replica fan-out produced fewer clients than replicas.
    #[error("built {built} of {expected} replica clients")]
    PartialListFailure {
        /// Replicas requested.
        expected: usize,
        /// Clients successfully built.
        built: usize,
    },

    /// A transport-level failure, tagged with the operation that issued it.
    #[error("{operation} failed: {source}")]
    Transport {
        /// Operation name for diagnostics.
        operation: &'static str,
        /// Underlying transport or driver error.
        #[source]
        source: BoxError,
    },

    /// The secret store itself failed (as opposed to a missing secret).
    #[error("secret store error: {0}")]
    SecretStore(String),

    /// A target address could not be constructed or parsed.
    #[error("invalid target address: {0}")]
    InvalidTarget(String),

    /// Configuration value is malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Wrap a transport or driver error with the operation that produced it.
    pub fn transport<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        ProbeError::Transport {
            operation,
            source: source.into(),
        }
    }

    /// Shorthand for a [`ProbeError::ResponseParseError`].
    pub fn parse(operation: &'static str, reason: impl Into<String>) -> Self {
        ProbeError::ResponseParseError {
            operation,
            reason: reason.into(),
        }
    }

    /// `true` for the "marker not yet provisioned" signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound(_))
    }

    /// `true` when the failure is about reaching the store rather than a
    /// verdict from it.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ProbeError::Transport { .. } | ProbeError::ConnectivityFailure { .. }
        )
    }

    /// `true` when retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_unreachable()
            || self.is_not_found()
            || matches!(self, ProbeError::PartialListFailure { .. })
    }
}

/// Crate-level result alias using [`ProbeError`].
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_missing_display() {
        let err = ProbeError::CredentialMissing {
            secret: "demo/es-auth".to_string(),
            reason: "password is missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "credential missing for demo/es-auth: password is missing"
        );
    }

    #[test]
    fn test_transport_keeps_operation_name() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ProbeError::transport("cluster health", io);
        assert!(err.to_string().starts_with("cluster health failed"));
        assert!(err.is_unreachable());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_not_found_is_not_unreachable() {
        let err = ProbeError::NotFound("kubedb-system/info".to_string());
        assert!(err.is_not_found());
        assert!(!err.is_unreachable());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejections_are_not_retryable() {
        let err = ProbeError::WriteRejected {
            response: serde_json::json!({"errors": true}),
        };
        assert!(!err.is_retryable());
        assert!(!ProbeError::ReadRejected { status: 500 }.is_retryable());
    }

    #[test]
    fn test_partial_list_display() {
        let err = ProbeError::PartialListFailure { expected: 3, built: 2 };
        assert_eq!(err.to_string(), "built 2 of 3 replica clients");
    }
}
