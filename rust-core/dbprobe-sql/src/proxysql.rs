// SPDX-License-Identifier: PMPL-1.0-or-later
//! SQL load-balancing proxy (ProxySQL) admin client builder.
//!
//! The admin interface speaks the MySQL protocol on its own port and
//! authenticates with the root credentials from the auth secret.

use std::time::Duration;

use mysql_async::prelude::Queryable;
use mysql_async::{Opts, OptsBuilder, Pool};
use tracing::{debug, info, instrument};

use dbprobe_core::consts::{PROXYSQL_ADMIN_PORT, SQL_CONNECT_TIMEOUT_SECS};
use dbprobe_core::{
    resolve_credential, Credential, DatabaseRef, Endpoint, ProbeError, Result, SecretStore,
};

use crate::postgres::{connectivity, LIVENESS_QUERY};

/// Value reported for the admin session's packet limit.
const ADMIN_MAX_ALLOWED_PACKET: usize = 64 * 1024 * 1024;
/// Value reported for the admin session's idle timeout, in seconds.
const ADMIN_WAIT_TIMEOUT_SECS: usize = 28_800;

pub struct ProxySqlClientBuilder<'a> {
    db: DatabaseRef,
    store: &'a dyn SecretStore,
    pod: Option<String>,
    host: Option<String>,
    admin_port: u16,
}

impl<'a> ProxySqlClientBuilder<'a> {
    pub fn new(db: DatabaseRef, store: &'a dyn SecretStore) -> Self {
        Self {
            db,
            store,
            pod: None,
            host: None,
            admin_port: PROXYSQL_ADMIN_PORT,
        }
    }

    pub fn pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = Some(pod.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Defaults to 6032.
    pub fn admin_port(mut self, port: u16) -> Self {
        self.admin_port = port;
        self
    }

    fn opts(&self, credential: &Credential, host: String) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(self.admin_port)
            .user(Some(credential.username()))
            .pass(Some(credential.password()))
            .prefer_socket(false)
            // The admin interface does not serve session variables, so
            // these are pinned instead of read at connect.
            .max_allowed_packet(Some(ADMIN_MAX_ALLOWED_PACKET))
            .wait_timeout(Some(ADMIN_WAIT_TIMEOUT_SECS))
            .into()
    }

    #[instrument(skip(self), fields(db = %self.db.qualified_name(), pod = ?self.pod))]
    pub async fn build(self) -> Result<ProxySqlClient> {
        let credential = resolve_credential(
            self.store,
            true,
            self.db.auth_secret.as_ref(),
            &self.db.qualified_name(),
        )
        .await?;
        let host = self
            .db
            .host(&Endpoint::select(self.pod.as_deref(), self.host.as_deref()));
        let address = format!("{host}:{}", self.admin_port);

        let client = ProxySqlClient {
            pool: Pool::new(self.opts(&credential, host)),
            address,
        };
        if let Err(e) = client.ping().await {
            client.pool.disconnect().await.ok();
            return Err(e);
        }
        info!(address = %client.address, "proxysql admin client ready");
        Ok(client)
    }
}

/// Pooled admin connections to one ProxySQL endpoint.
#[derive(Debug, Clone)]
pub struct ProxySqlClient {
    pool: Pool,
    address: String,
}

impl ProxySqlClient {
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// `host:port` of the admin interface.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run the liveness query on a pooled connection.
    pub async fn ping(&self) -> Result<()> {
        let timeout = Duration::from_secs(SQL_CONNECT_TIMEOUT_SECS);
        let run = async {
            let mut conn = self.pool.get_conn().await?;
            conn.query_drop(LIVENESS_QUERY).await
        };
        tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| connectivity(&self.address, "liveness query timed out".to_string()))?
            .map_err(|e| connectivity(&self.address, e.to_string()))?;
        debug!(address = %self.address, "proxysql liveness ok");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> Result<()> {
        self.pool
            .disconnect()
            .await
            .map_err(|e| ProbeError::transport("proxysql disconnect", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbprobe_core::InMemorySecretStore;

    #[test]
    fn test_opts_target_admin_port() {
        let store = InMemorySecretStore::new();
        let builder = ProxySqlClientBuilder::new(DatabaseRef::new("demo", "proxy", 6033), &store);
        let opts = builder.opts(
            &Credential::new("root", "s3cret"),
            builder.db.pod_host("proxy-0"),
        );
        assert_eq!(opts.tcp_port(), 6032);
        assert_eq!(opts.ip_or_hostname(), "proxy-0.proxy-pods.demo.svc");
        assert_eq!(opts.user(), Some("root"));
        assert_eq!(opts.pass(), Some("s3cret"));
    }

    #[tokio::test]
    async fn test_root_credentials_required() {
        let store = InMemorySecretStore::new();
        let err = ProxySqlClientBuilder::new(
            DatabaseRef::new("demo", "proxy", 6033).with_auth_secret("proxy-auth"),
            &store,
        )
        .build()
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::CredentialMissing { .. }), "{err:?}");
    }
}
