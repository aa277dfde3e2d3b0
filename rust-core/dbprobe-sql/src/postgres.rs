// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Postgres client builder and the session handle shared with the
//! connection-pooler builder.
//!
//! A [`PgSession`] owns both halves of a tokio-postgres connection: the
//! [`Client`] and the spawned task driving the socket. Dropping the session
//! aborts the driver, so a handle never leaks a background task.

use tokio::task::JoinHandle;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage, Socket};
use tracing::{debug, info, instrument, warn};

use dbprobe_core::{
    resolve_credential, resolve_tls_material, ClientAuthMode, DatabaseRef, Endpoint, ProbeError,
    Result, SecretStore,
};

use crate::dsn::{ConnectionString, SslMode, DEFAULT_DBNAME};
use crate::tls::make_tls_connect;

/// Liveness query.
pub const LIVENESS_QUERY: &str = "SELECT 1";

// ---------------------------------------------------------------------------
// PgSession
// ---------------------------------------------------------------------------

/// A live connection plus its driver task.
pub struct PgSession {
    client: Client,
    driver: JoinHandle<()>,
    dsn: ConnectionString,
}

impl PgSession {
    /// Connect without TLS.
    pub async fn connect(dsn: ConnectionString) -> Result<Self> {
        Self::connect_with(dsn, NoTls).await
    }

    /// Connect through `tls`.
    pub async fn connect_with<T>(dsn: ConnectionString, tls: T) -> Result<Self>
    where
        T: MakeTlsConnect<Socket> + Send,
        T::Stream: Send + 'static,
        T::TlsConnect: Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        let address = dsn.address();
        let (client, connection) = dsn
            .to_config()
            .connect(tls)
            .await
            .map_err(|e| connectivity(&address, e.to_string()))?;

        let driver = tokio::spawn({
            let address = address.clone();
            async move {
                if let Err(e) = connection.await {
                    warn!(address = %address, error = %e, "postgres connection closed with error");
                }
            }
        });
        debug!(address = %address, "postgres connection established");
        Ok(Self { client, driver, dsn })
    }

    /// Run the liveness query.
    ///
    /// Uses the simple query protocol: poolers in transaction mode reject
    /// named prepared statements.
    pub async fn ping(&self) -> Result<()> {
        let messages = tokio::time::timeout(
            self.dsn.connect_timeout(),
            self.client.simple_query(LIVENESS_QUERY),
        )
        .await
        .map_err(|_| connectivity(&self.dsn.address(), "liveness query timed out".to_string()))?
        .map_err(|e| connectivity(&self.dsn.address(), e.to_string()))?;

        let rows = messages
            .iter()
            .filter(|m| matches!(m, SimpleQueryMessage::Row(_)))
            .count();
        if rows != 1 {
            return Err(ProbeError::parse(
                "liveness query",
                format!("expected one row, got {rows}"),
            ));
        }
        Ok(())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.dsn
    }

    /// `true` once the server side has gone away.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl std::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSession")
            .field("dsn", &self.dsn)
            .field("closed", &self.client.is_closed())
            .finish()
    }
}

pub(crate) fn connectivity(address: &str, reason: String) -> ProbeError {
    ProbeError::ConnectivityFailure {
        target: address.to_string(),
        reason,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`PgSession`] against a Postgres pod or service and checks it
/// with [`LIVENESS_QUERY`].
pub struct PostgresClientBuilder<'a> {
    db: DatabaseRef,
    store: &'a dyn SecretStore,
    pod: Option<String>,
    host: Option<String>,
    ssl_mode: Option<SslMode>,
}

impl<'a> PostgresClientBuilder<'a> {
    pub fn new(db: DatabaseRef, store: &'a dyn SecretStore) -> Self {
        Self {
            db,
            store,
            pod: None,
            host: None,
            ssl_mode: None,
        }
    }

    pub fn pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = Some(pod.into());
        self
    }

    /// Dial an explicit host instead of the service.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Defaults to `verify-full` with TLS configured, `disable` without.
    pub fn ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = Some(mode);
        self
    }

    /// Resolve the connection parameters without connecting.
    pub async fn connection_string(&self) -> Result<ConnectionString> {
        let host = self
            .db
            .host(&Endpoint::select(self.pod.as_deref(), self.host.as_deref()));

        // The auth secret is mandatory whatever `security_enabled` says.
        let credential = resolve_credential(
            self.store,
            true,
            self.db.auth_secret.as_ref(),
            &self.db.qualified_name(),
        )
        .await?;

        let default_mode = if self.db.tls.is_some() {
            SslMode::VerifyFull
        } else {
            SslMode::Disable
        };
        Ok(
            ConnectionString::new(&credential, host, self.db.port, DEFAULT_DBNAME)
                .with_ssl_mode(self.ssl_mode.unwrap_or(default_mode)),
        )
    }

    #[instrument(skip(self), fields(db = %self.db.qualified_name(), pod = ?self.pod))]
    pub async fn build(self) -> Result<PgSession> {
        let dsn = self.connection_string().await?;

        let session = if dsn.ssl_mode().requires_tls() {
            let spec = self.db.tls.as_ref().ok_or_else(|| {
                ProbeError::Config(format!(
                    "sslmode {} for {} needs a certificate secret",
                    dsn.ssl_mode(),
                    self.db.qualified_name()
                ))
            })?;
            let material = resolve_tls_material(self.store, &spec.cert_secret).await?;
            let tls = make_tls_connect(
                &material,
                spec.client_auth == ClientAuthMode::Cert,
                dsn.ssl_mode().server_name_check(),
            )?;
            PgSession::connect_with(dsn, tls).await?
        } else {
            PgSession::connect(dsn).await?
        };

        session.ping().await?;
        info!(
            address = %session.connection_string().address(),
            sslmode = %session.connection_string().ssl_mode(),
            "postgres client ready"
        );
        Ok(session)
    }
}
