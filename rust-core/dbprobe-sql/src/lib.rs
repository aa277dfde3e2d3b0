// SPDX-License-Identifier: PMPL-1.0-or-later
//
// dbprobe SQL clients
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client builders for the relational families:
//
// - Postgres: auth secret required, optional mutual TLS via rustls,
//   `SELECT 1` liveness
// - PgBouncer: backend credentials, unencrypted pooler connections,
//   parallel per-replica construction
// - ProxySQL: admin interface over the MySQL protocol, `SELECT 1` liveness
//
// Postgres-protocol handles own their connection driver task and abort it
// when dropped.
//
// ## Usage
//
// ```no_run
// use dbprobe_core::{DatabaseRef, InMemorySecretStore};
// use dbprobe_sql::PostgresClientBuilder;
//
// # async fn run() -> dbprobe_core::Result<()> {
// let store = InMemorySecretStore::new();
// let db = DatabaseRef::new("demo", "pg", 5432).with_auth_secret("pg-auth");
// let session = PostgresClientBuilder::new(db, &store).pod("pg-0").build().await?;
// println!("connected to {}", session.connection_string());
// # Ok(())
// # }
// ```

pub mod dsn;
pub mod pgbouncer;
pub mod postgres;
pub mod proxysql;
pub mod tls;

pub use dsn::{ConnectionString, SslMode, DEFAULT_DBNAME};
pub use pgbouncer::{BackendDatabase, PgBouncerClientBuilder};
pub use postgres::{PgSession, PostgresClientBuilder, LIVENESS_QUERY};
pub use proxysql::{ProxySqlClient, ProxySqlClientBuilder};
pub use tls::make_tls_connect;
