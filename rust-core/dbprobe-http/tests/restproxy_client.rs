// SPDX-License-Identifier: PMPL-1.0-or-later
//! Broker REST proxy tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use dbprobe_core::{DatabaseRef, InMemorySecretStore, ProbeError};
use dbprobe_http::{ListBrokers, RestProxyClient, RestProxyClientBuilder};

fn proxy() -> DatabaseRef {
    DatabaseRef::new("demo", "kafka-rest", 8082)
}

async fn brokers_server(code: StatusCode, body: Value) -> String {
    common::init_tracing();
    let app = Router::new().route("/brokers", get(move || async move { (code, Json(body)) }));
    common::serve(app).await
}

async fn client(url: &str) -> RestProxyClient {
    RestProxyClientBuilder::new(proxy(), &InMemorySecretStore::new())
        .url(url)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lists_brokers() {
    let url = brokers_server(StatusCode::OK, json!({"brokers": [0, 1, 2]})).await;
    let client = client(&url).await;
    assert_eq!(client.list_brokers().await.unwrap(), [0, 1, 2]);
    assert!(client.is_broker_available().await.unwrap());
}

#[tokio::test]
async fn test_empty_broker_list_is_unavailable() {
    let url = brokers_server(StatusCode::OK, json!({"brokers": []})).await;
    assert!(!client(&url).await.is_broker_available().await.unwrap());
}

#[tokio::test]
async fn test_non_200_is_read_rejected() {
    for code in [StatusCode::NO_CONTENT, StatusCode::INTERNAL_SERVER_ERROR] {
        let url = brokers_server(code, json!({"error_code": 50003})).await;
        match client(&url).await.list_brokers().await {
            Err(ProbeError::ReadRejected { status }) => assert_eq!(status, code.as_u16()),
            other => panic!("expected ReadRejected for {code}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let url = brokers_server(StatusCode::OK, json!({"brokers": "all of them"})).await;
    let err = client(&url).await.list_brokers().await.unwrap_err();
    assert!(matches!(err, ProbeError::ResponseParseError { .. }), "{err:?}");
}

#[tokio::test]
async fn test_credentials_are_sent_when_security_is_enabled() {
    common::init_tracing();
    let app = Router::new().route(
        "/brokers",
        get(|headers: HeaderMap| async move {
            match headers.get(AUTHORIZATION) {
                Some(_) => (StatusCode::OK, Json(json!({"brokers": [1]}))),
                None => (StatusCode::UNAUTHORIZED, Json(json!({"error_code": 401}))),
            }
        }),
    );
    let url = common::serve(app).await;
    let store = common::store_with_auth("demo", "kafka-auth", "admin", "secret").await;

    let secured = RestProxyClientBuilder::new(proxy().with_auth_secret("kafka-auth"), &store)
        .url(&url)
        .build()
        .await
        .unwrap();
    assert!(secured.is_broker_available().await.unwrap());

    let err = client(&url).await.list_brokers().await.unwrap_err();
    assert!(matches!(err, ProbeError::ReadRejected { status: 401 }));
}
