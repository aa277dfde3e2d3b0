// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Key-value secret lookup consumed by the credential and TLS resolvers.
//
// Secret storage itself is someone else's job; builders only need to fetch
// a named bag of bytes from a namespace. `InMemorySecretStore` backs tests
// and callers that already hold the secret data.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::consts::SecretField;
use crate::error::Result;

/// Namespace-qualified reference to a secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl SecretRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A fetched secret: its reference plus raw field data.
#[derive(Clone, Default)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a well-known field.
    pub fn with_field(mut self, field: SecretField, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(field.key().to_string(), value.into());
        self
    }

    /// Raw bytes of a well-known field, if present.
    pub fn field(&self, field: SecretField) -> Option<&[u8]> {
        self.data.get(field.key()).map(Vec::as_slice)
    }

    pub fn reference(&self) -> SecretRef {
        SecretRef::new(self.namespace.clone(), self.name.clone())
    }
}

// Field values are credentials and keys; only the key names are printed.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Source of secrets for the resolvers.
///
/// `Ok(None)` means the secret does not exist; `Err` is reserved for the
/// store itself failing.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, reference: &SecretRef) -> Result<Option<Secret>>;
}

/// Secret store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<SecretRef, Secret>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a secret.
    pub async fn insert(&self, secret: Secret) {
        self.secrets.write().await.insert(secret.reference(), secret);
    }

    /// Remove a secret, returning it if it existed.
    pub async fn remove(&self, reference: &SecretRef) -> Option<Secret> {
        self.secrets.write().await.remove(reference)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, reference: &SecretRef) -> Result<Option<Secret>> {
        Ok(self.secrets.read().await.get(reference).cloned())
    }
}
