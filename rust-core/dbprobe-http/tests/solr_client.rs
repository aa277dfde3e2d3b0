// SPDX-License-Identifier: PMPL-1.0-or-later
//! Collection-store client tests: async action lifecycle, cluster-health
//! folding, and the readiness marker against a fake admin API.

mod common;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use dbprobe_core::{
    evaluate_readiness, marker_document, DatabaseRef, InMemorySecretStore, ProbeError, ReadProbe,
    Readiness, WriteProbe,
};
use dbprobe_http::solr::{ActionState, AsyncToken, BackupTarget, FlushOutcome};
use dbprobe_http::{SolrClient, SolrClientBuilder};

// ===========================================================================
// Fake admin API
// ===========================================================================

#[derive(Default)]
struct FakeSolr {
    /// Collection -> health token.
    collections: Mutex<BTreeMap<String, String>>,
    /// Async token -> number of status polls so far.
    tasks: Mutex<BTreeMap<String, u32>>,
    /// Collection -> stored marker document.
    docs: Mutex<BTreeMap<String, Value>>,
    /// (method, action, params) of every admin call.
    calls: Mutex<Vec<(Method, String, HashMap<String, String>)>>,
}

impl FakeSolr {
    fn with_collection(name: &str, health: &str) -> Self {
        let fake = Self::default();
        fake.collections
            .lock()
            .unwrap()
            .insert(name.to_string(), health.to_string());
        fake
    }
}

type Shared = Arc<FakeSolr>;

fn header() -> Value {
    json!({"status": 0, "QTime": 1})
}

async fn admin(
    State(solr): State<Shared>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let action = params.get("action").cloned().unwrap_or_default();
    solr.calls
        .lock()
        .unwrap()
        .push((method, action.clone(), params.clone()));

    let body = match action.as_str() {
        "CLUSTERSTATUS" => {
            let collections: BTreeMap<_, _> = solr
                .collections
                .lock()
                .unwrap()
                .iter()
                .map(|(name, health)| (name.clone(), json!({"health": health, "shards": {}})))
                .collect();
            json!({
                "responseHeader": header(),
                "cluster": {"collections": collections, "live_nodes": ["solr-0:8983_solr"]}
            })
        }
        "LIST" => {
            let names: Vec<_> = solr.collections.lock().unwrap().keys().cloned().collect();
            json!({"responseHeader": header(), "collections": names})
        }
        "CREATE" => {
            solr.collections
                .lock()
                .unwrap()
                .insert(params["name"].clone(), "GREEN".to_string());
            json!({"responseHeader": header(), "success": {}})
        }
        "BACKUP" | "RESTORE" | "DELETEBACKUP" => {
            let token = params["async"].clone();
            solr.tasks.lock().unwrap().insert(token.clone(), 0);
            json!({"responseHeader": header(), "requestid": token})
        }
        "REQUESTSTATUS" => {
            let token = &params["requestid"];
            let mut tasks = solr.tasks.lock().unwrap();
            match tasks.get_mut(token) {
                None => json!({
                    "responseHeader": header(),
                    "status": {"state": "notfound", "msg": format!("Did not find [{token}] in any tasks queue")}
                }),
                Some(polls) => {
                    *polls += 1;
                    if *polls == 1 {
                        json!({"responseHeader": header(), "status": {"state": "running", "msg": "found [t] in running tasks"}})
                    } else {
                        json!({
                            "responseHeader": header(),
                            "status": {"state": "completed", "msg": "found [t] in completed tasks"},
                            "response": ["collection", "books", "backupId", 0]
                        })
                    }
                }
            }
        }
        "DELETESTATUS" => {
            let token = &params["requestid"];
            match solr.tasks.lock().unwrap().remove(token) {
                Some(_) => json!({
                    "responseHeader": header(),
                    "status": format!("successfully removed stored response for [{token}]")
                }),
                None => json!({
                    "responseHeader": header(),
                    "status": format!("[{token}] not found in stored responses")
                }),
            }
        }
        other => json!({"responseHeader": {"status": 400}, "error": {"msg": format!("unknown action {other}")}}),
    };
    Json(body)
}

async fn update(
    State(solr): State<Shared>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !solr.collections.lock().unwrap().contains_key(&collection) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"msg": format!("Collection not found: {collection}"), "code": 404}})),
        );
    }
    // Schemaless collections store text fields as multi-valued.
    let mut doc = serde_json::Map::new();
    for (key, value) in body["add"]["doc"].as_object().unwrap() {
        let stored = match value {
            Value::String(_) => json!([value]),
            other => other.clone(),
        };
        doc.insert(key.clone(), stored);
    }
    doc.insert("_version_".to_string(), json!(1789012345678_u64));
    solr.docs.lock().unwrap().insert(collection, Value::Object(doc));
    (StatusCode::OK, Json(json!({"responseHeader": header()})))
}

async fn realtime_get(State(solr): State<Shared>, Path(collection): Path<String>) -> Json<Value> {
    let doc = solr.docs.lock().unwrap().get(&collection).cloned();
    Json(json!({ "doc": doc }))
}

async fn select(State(solr): State<Shared>, Path(collection): Path<String>) -> Json<Value> {
    let found = usize::from(solr.docs.lock().unwrap().contains_key(&collection));
    Json(json!({
        "responseHeader": header(),
        "response": {"numFound": found, "start": 0, "docs": []}
    }))
}

async fn start(fake: FakeSolr) -> (SolrClient, Shared) {
    common::init_tracing();
    let fake = Arc::new(fake);
    let app = Router::new()
        .route("/solr/admin/collections", any(admin))
        .route("/solr/{collection}/update", post(update))
        .route("/solr/{collection}/get", get(realtime_get))
        .route("/solr/{collection}/select", get(select))
        .with_state(Arc::clone(&fake));
    let url = common::serve(app).await;

    let client = SolrClientBuilder::new(
        DatabaseRef::new("demo", "solr-cluster", 8983),
        &InMemorySecretStore::new(),
    )
    .url(url)
    .build()
    .await
    .unwrap();
    (client, fake)
}

fn target() -> BackupTarget {
    BackupTarget::new("nightly", "/var/solr/backups", "s3-repo")
}

// ===========================================================================
// Async actions
// ===========================================================================

#[tokio::test]
async fn test_action_lifecycle_with_idempotent_flush() {
    let (client, fake) = start(FakeSolr::with_collection("books", "GREEN")).await;

    let submitted = client.backup("books", &target(), None).await.unwrap();
    assert_eq!(submitted.token, AsyncToken::new("books-backup"));

    assert_eq!(client.poll_action(&submitted.token).await.unwrap(), ActionState::Running);
    let status = client.request_status(&submitted.token).await.unwrap();
    assert_eq!(status.state, ActionState::Completed);
    assert_eq!(status.details.unwrap()["backupId"], json!(0));
    assert_eq!(client.poll_action(&submitted.token).await.unwrap(), ActionState::Completed);

    assert_eq!(
        client.flush_status(&submitted.token).await.unwrap(),
        FlushOutcome::Flushed
    );
    assert_eq!(client.poll_action(&submitted.token).await.unwrap(), ActionState::NotFound);
    assert_eq!(
        client.flush_status(&submitted.token).await.unwrap(),
        FlushOutcome::AlreadyAbsent
    );

    let calls = fake.calls.lock().unwrap();
    let (method, _, params) = &calls[0];
    assert_eq!(*method, Method::POST);
    assert_eq!(params["collection"], "books");
    assert_eq!(params["location"], "/var/solr/backups");
    assert_eq!(params["repository"], "s3-repo");
    assert_eq!(params["async"], "books-backup");
}

#[tokio::test]
async fn test_completed_action_on_unhealthy_cluster_is_failed() {
    let (client, _fake) = start(FakeSolr::with_collection("books", "YELLOW")).await;
    let token = AsyncToken::new("custom-restore");

    let submitted = client
        .restore("books", &target(), 3, Some(token.clone()))
        .await
        .unwrap();
    assert_eq!(submitted.token, token);

    assert_eq!(client.poll_action(&token).await.unwrap(), ActionState::Running);
    assert_eq!(client.poll_action(&token).await.unwrap(), ActionState::Failed);

    let report = client.cluster_status().await.unwrap();
    assert_eq!(report.unhealthy(), ["books"]);
    assert!(!report.is_healthy());
}

#[tokio::test]
async fn test_delete_and_purge_use_their_methods() {
    let (client, fake) = start(FakeSolr::with_collection("books", "GREEN")).await;

    let deleted = client
        .delete_backup("books", &target(), 2, Some("snap1"), None)
        .await
        .unwrap();
    assert_eq!(deleted.token.as_str(), "books-delete-snap1");
    let purged = client
        .purge_backups("books", &target(), Some("snap1"), None)
        .await
        .unwrap();
    assert_eq!(purged.token.as_str(), "books-purge-snap1");

    let calls = fake.calls.lock().unwrap();
    assert_eq!(calls[0].0, Method::DELETE);
    assert_eq!(calls[0].1, "DELETEBACKUP");
    assert_eq!(calls[0].2["backupId"], "2");
    assert_eq!(calls[1].0, Method::PUT);
    assert_eq!(calls[1].1, "DELETEBACKUP");
    assert_eq!(calls[1].2["purgeUnused"], "true");
}

#[tokio::test]
async fn test_unknown_token_polls_not_found() {
    let (client, _fake) = start(FakeSolr::default()).await;
    let token = AsyncToken::new("never-submitted");
    assert_eq!(client.poll_action(&token).await.unwrap(), ActionState::NotFound);
    assert_eq!(client.flush_status(&token).await.unwrap(), FlushOutcome::AlreadyAbsent);
}

// ===========================================================================
// Readiness marker
// ===========================================================================

#[tokio::test]
async fn test_missing_marker_collection_then_round_trip() {
    let (client, _fake) = start(FakeSolr::default()).await;
    let doc = marker_document("probe");

    let err = client.write_marker(&doc).await.unwrap_err();
    assert!(matches!(err, ProbeError::NotFound(_)), "{err:?}");
    assert_eq!(
        evaluate_readiness(&client, &doc).await.unwrap(),
        Readiness::NotProvisioned
    );

    assert!(client.ensure_marker_collection().await.unwrap());
    assert!(!client.ensure_marker_collection().await.unwrap());

    assert_eq!(
        evaluate_readiness(&client, &doc).await.unwrap(),
        Readiness::WriteCapable
    );
    assert_eq!(client.read_marker().await.unwrap(), doc);
    assert_eq!(client.document_count(client.marker_collection()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_single_element_list_survives_round_trip() {
    let (client, _fake) = start(FakeSolr::with_collection("kubedb-collection", "GREEN")).await;
    let doc = json!({"tags": ["only"], "writer": "dbprobe", "nested": {"ids": [7]}});

    assert_eq!(
        evaluate_readiness(&client, &doc).await.unwrap(),
        Readiness::WriteCapable
    );
    assert_eq!(client.read_marker().await.unwrap(), doc);
}

#[tokio::test]
async fn test_unwritten_marker_reads_not_found() {
    let (client, _fake) = start(FakeSolr::with_collection("kubedb-collection", "GREEN")).await;
    let err = client.read_marker().await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn test_list_and_create_collections() {
    let (client, _fake) = start(FakeSolr::with_collection("books", "GREEN")).await;
    client.create_collection("films").await.unwrap();
    assert_eq!(client.list_collections().await.unwrap(), ["books", "films"]);
}
