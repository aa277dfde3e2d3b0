// SPDX-License-Identifier: PMPL-1.0-or-later
//! Credential resolution.
//!
//! A [`Credential`] is resolved eagerly from a secret holding the basic-auth
//! `username` and `password` fields. When security is disabled resolution is
//! skipped and the anonymous credential is returned; that is a valid state,
//! not an error. A missing field is never treated as an empty string.

use std::fmt;

use tracing::{debug, error};

use crate::consts::SecretField;
use crate::error::{ProbeError, Result};
use crate::secret::{Secret, SecretRef, SecretStore};

/// Username/password pair.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The empty credential used when security is disabled.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Read both fields from an already-fetched secret.
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let reference = secret.reference();
        let username = read_field(secret, &reference, SecretField::Username)?;
        let password = read_field(secret, &reference, SecretField::Password)?;
        Ok(Self { username, password })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn read_field(secret: &Secret, reference: &SecretRef, field: SecretField) -> Result<String> {
    let raw = secret.field(field).ok_or_else(|| {
        error!(secret = %reference, field = %field, "credential field is missing");
        ProbeError::CredentialMissing {
            secret: reference.to_string(),
            reason: format!("{field} is missing"),
        }
    })?;
    String::from_utf8(raw.to_vec()).map_err(|_| ProbeError::CredentialMissing {
        secret: reference.to_string(),
        reason: format!("{field} is not valid UTF-8"),
    })
}

/// Resolve the credential for a database.
///
/// * `security_enabled` - when `false`, returns [`Credential::anonymous`]
///   without touching the store.
/// * `reference` - the auth secret; required when security is enabled.
/// * `subject` - `namespace/name` of the database, for error messages.
pub async fn resolve_credential(
    store: &dyn SecretStore,
    security_enabled: bool,
    reference: Option<&SecretRef>,
    subject: &str,
) -> Result<Credential> {
    if !security_enabled {
        debug!(subject, "security disabled, skipping credential resolution");
        return Ok(Credential::anonymous());
    }

    let reference = reference.ok_or_else(|| ProbeError::CredentialMissing {
        secret: subject.to_string(),
        reason: "security is enabled but no auth secret is referenced".to_string(),
    })?;

    let secret = store
        .get(reference)
        .await?
        .ok_or_else(|| ProbeError::CredentialMissing {
            secret: reference.to_string(),
            reason: "secret does not exist".to_string(),
        })?;

    Credential::from_secret(&secret)
}

/// Prefer an explicit credential when it is complete, otherwise resolve.
///
/// An override with an empty username or password is ignored rather than
/// used half-filled.
pub async fn resolve_with_override(
    store: &dyn SecretStore,
    explicit: Option<&Credential>,
    reference: Option<&SecretRef>,
    subject: &str,
) -> Result<Credential> {
    match explicit {
        Some(c) if !c.username.is_empty() && !c.password.is_empty() => Ok(c.clone()),
        _ => resolve_credential(store, true, reference, subject).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::InMemorySecretStore;

    async fn store_with(secret: Secret) -> InMemorySecretStore {
        let store = InMemorySecretStore::new();
        store.insert(secret).await;
        store
    }

    #[tokio::test]
    async fn test_resolves_both_fields() {
        let store = store_with(
            Secret::new("demo", "es-auth")
                .with_field(SecretField::Username, "elastic")
                .with_field(SecretField::Password, "changeme"),
        )
        .await;
        let cred = resolve_credential(&store, true, Some(&SecretRef::new("demo", "es-auth")), "demo/es")
            .await
            .unwrap();
        assert_eq!(cred.username(), "elastic");
        assert_eq!(cred.password(), "changeme");
    }

    #[tokio::test]
    async fn test_missing_password_fails_even_with_username() {
        let store = store_with(
            Secret::new("demo", "es-auth").with_field(SecretField::Username, "elastic"),
        )
        .await;
        let err = resolve_credential(&store, true, Some(&SecretRef::new("demo", "es-auth")), "demo/es")
            .await
            .unwrap_err();
        match err {
            ProbeError::CredentialMissing { reason, .. } => assert!(reason.contains("password")),
            other => panic!("expected CredentialMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_security_disabled_skips_lookup() {
        let store = InMemorySecretStore::new();
        let cred = resolve_credential(&store, false, None, "demo/es").await.unwrap();
        assert!(cred.is_anonymous());
    }

    #[tokio::test]
    async fn test_security_enabled_without_reference() {
        let store = InMemorySecretStore::new();
        let err = resolve_credential(&store, true, None, "demo/es").await.unwrap_err();
        assert!(matches!(err, ProbeError::CredentialMissing { .. }));
    }

    #[tokio::test]
    async fn test_absent_secret() {
        let store = InMemorySecretStore::new();
        let err = resolve_credential(&store, true, Some(&SecretRef::new("demo", "gone")), "demo/es")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("demo/gone"));
    }

    #[tokio::test]
    async fn test_override_needs_both_fields() {
        let store = store_with(
            Secret::new("demo", "pg-auth")
                .with_field(SecretField::Username, "postgres")
                .with_field(SecretField::Password, "from-secret"),
        )
        .await;
        let reference = SecretRef::new("demo", "pg-auth");

        let full = Credential::new("app", "explicit");
        let cred = resolve_with_override(&store, Some(&full), Some(&reference), "demo/pb")
            .await
            .unwrap();
        assert_eq!(cred.username(), "app");

        let partial = Credential::new("app", "");
        let cred = resolve_with_override(&store, Some(&partial), Some(&reference), "demo/pb")
            .await
            .unwrap();
        assert_eq!(cred.password(), "from-secret");
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credential::new("elastic", "changeme"));
        assert!(rendered.contains("elastic"));
        assert!(!rendered.contains("changeme"));
    }
}
