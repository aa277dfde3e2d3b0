// SPDX-License-Identifier: PMPL-1.0-or-later
//! Builder failures against local ports nobody listens on.

use dbprobe_core::{DatabaseRef, InMemorySecretStore, ProbeError, Secret, SecretField};
use dbprobe_sql::{PostgresClientBuilder, ProxySqlClientBuilder};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn store() -> InMemorySecretStore {
    let store = InMemorySecretStore::new();
    store
        .insert(
            Secret::new("demo", "db-auth")
                .with_field(SecretField::Username, "root")
                .with_field(SecretField::Password, "s3cret"),
        )
        .await;
    store
}

#[tokio::test]
async fn test_postgres_unreachable_is_connectivity_failure() {
    init_tracing();
    let store = store().await;
    let port = dead_port();
    let db = DatabaseRef::new("demo", "pg", port).with_auth_secret("db-auth");

    let err = PostgresClientBuilder::new(db, &store)
        .host("127.0.0.1")
        .build()
        .await
        .unwrap_err();
    match err {
        ProbeError::ConnectivityFailure { target, .. } => {
            assert_eq!(target, format!("127.0.0.1:{port}"));
        }
        other => panic!("expected ConnectivityFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_proxysql_unreachable_is_connectivity_failure() {
    init_tracing();
    let store = store().await;
    let port = dead_port();
    let db = DatabaseRef::new("demo", "proxy", 6033).with_auth_secret("db-auth");

    let err = ProxySqlClientBuilder::new(db, &store)
        .host("127.0.0.1")
        .admin_port(port)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::ConnectivityFailure { .. }), "{err:?}");
}
