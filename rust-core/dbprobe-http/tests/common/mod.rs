// SPDX-License-Identifier: PMPL-1.0-or-later
//! Helpers shared by the HTTP integration tests: tracing setup and an
//! in-process server bound to an ephemeral local port.

#![allow(dead_code)]

use axum::Router;
use dbprobe_core::{Secret, SecretField, InMemorySecretStore};
use tracing_subscriber::EnvFilter;

/// Route test logs through the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serve `app` on `127.0.0.1:0` and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A local address nothing is listening on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A store holding `namespace/name` with `username`/`password`.
pub async fn store_with_auth(namespace: &str, name: &str, username: &str, password: &str) -> InMemorySecretStore {
    let store = InMemorySecretStore::new();
    store
        .insert(
            Secret::new(namespace, name)
                .with_field(SecretField::Username, username)
                .with_field(SecretField::Password, password),
        )
        .await;
    store
}
