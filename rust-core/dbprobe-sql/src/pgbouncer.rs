// SPDX-License-Identifier: PMPL-1.0-or-later
//! Connection-pool proxy (PgBouncer) builder.
//!
//! The pooler authenticates clients with the backend database's
//! credentials, so those come from an explicit override or the backend's
//! auth secret. Connections to the pooler itself are unencrypted.

use tracing::{info, instrument};

use dbprobe_core::{
    build_replicas, resolve_with_override, Credential, DatabaseRef, Endpoint, ReplicaClients,
    Result, SecretStore,
};

use crate::dsn::{ConnectionString, SslMode};
use crate::postgres::PgSession;

/// The database a pooler fronts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDatabase {
    /// Backend reference; its auth secret supplies default credentials.
    pub db: DatabaseRef,
    /// Database name used when the builder is not given one.
    pub database_name: String,
}

impl BackendDatabase {
    pub fn new(db: DatabaseRef, database_name: impl Into<String>) -> Self {
        Self {
            db,
            database_name: database_name.into(),
        }
    }
}

pub struct PgBouncerClientBuilder<'a> {
    pgbouncer: DatabaseRef,
    backend: BackendDatabase,
    store: &'a dyn SecretStore,
    auth: Option<Credential>,
    database_name: Option<String>,
    pod: Option<String>,
    host: Option<String>,
}

impl<'a> PgBouncerClientBuilder<'a> {
    /// `pgbouncer.port` is the pooler's listening port.
    pub fn new(pgbouncer: DatabaseRef, backend: BackendDatabase, store: &'a dyn SecretStore) -> Self {
        Self {
            pgbouncer,
            backend,
            store,
            auth: None,
            database_name: None,
            pod: None,
            host: None,
        }
    }

    /// Explicit backend credentials. Ignored unless both fields are set.
    pub fn auth(mut self, credential: Credential) -> Self {
        self.auth = Some(credential);
        self
    }

    /// Target database; an empty name keeps the backend's default.
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.database_name = (!name.is_empty()).then_some(name);
        self
    }

    pub fn pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = Some(pod.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    async fn credential(&self) -> Result<Credential> {
        resolve_with_override(
            self.store,
            self.auth.as_ref(),
            self.backend.db.auth_secret.as_ref(),
            &self.backend.db.qualified_name(),
        )
        .await
    }

    fn dsn_for(&self, credential: &Credential, host: String) -> ConnectionString {
        let dbname = self
            .database_name
            .clone()
            .unwrap_or_else(|| self.backend.database_name.clone());
        ConnectionString::new(credential, host, self.pgbouncer.port, dbname)
            .with_ssl_mode(SslMode::Disable)
    }

    /// Resolve the connection parameters without connecting.
    pub async fn connection_string(&self) -> Result<ConnectionString> {
        let credential = self.credential().await?;
        let host = self
            .pgbouncer
            .host(&Endpoint::select(self.pod.as_deref(), self.host.as_deref()));
        Ok(self.dsn_for(&credential, host))
    }

    #[instrument(skip(self), fields(pgbouncer = %self.pgbouncer.qualified_name(), pod = ?self.pod))]
    pub async fn build(self) -> Result<PgSession> {
        let session = PgSession::connect(self.connection_string().await?).await?;
        session.ping().await?;
        info!(address = %session.connection_string().address(), "pgbouncer client ready");
        Ok(session)
    }

    /// Pod names of the first `replicas` pooler replicas.
    pub fn replica_pods(&self, replicas: usize) -> Vec<String> {
        (0..replicas).map(|i| self.pgbouncer.replica_pod(i)).collect()
    }

    /// Build one session per replica pod in parallel.
    ///
    /// Credentials are resolved once up front; failing that fails the whole
    /// call. Replicas that cannot be reached are left out of the result.
    #[instrument(skip(self), fields(pgbouncer = %self.pgbouncer.qualified_name()))]
    pub async fn build_replicas(self, replicas: usize) -> Result<ReplicaClients<PgSession>> {
        let credential = self.credential().await?;
        let built = build_replicas(self.replica_pods(replicas), |pod| {
            let dsn = self.dsn_for(&credential, self.pgbouncer.pod_host(&pod));
            async move {
                let session = PgSession::connect(dsn).await?;
                session.ping().await?;
                Ok(session)
            }
        })
        .await;

        info!(
            built = built.len(),
            expected = built.expected(),
            "pgbouncer replica clients built"
        );
        Ok(built)
    }
}
