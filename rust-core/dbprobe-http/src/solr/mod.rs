// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Collection-store (Solr) client.
//!
//! Administrative calls go through the collections admin endpoint with an
//! `action` query parameter. Readiness uses a marker document in a
//! dedicated collection: the write goes through the update handler, the
//! read through real-time get, which sees the document before the
//! `commitWithin` window closes.

pub mod action;
pub mod types;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, info, instrument, warn};

use dbprobe_core::consts::{
    param, CollectionAction, MARKER_COLLECTION, MARKER_COLLECTION_DOC_ID,
};
use dbprobe_core::{
    resolve_credential, resolve_tls_material, ClientAuthMode, DatabaseRef, Endpoint, ProbeError,
    ReadProbe, Result, SecretStore, TransportConfig, WriteProbe,
};

use crate::transport::{decode_json, error_body, HttpTransport};

pub use action::{
    ActionKind, ActionState, ActionStatus, AsyncToken, BackupTarget, FlushOutcome,
    SubmittedAction,
};
pub use types::{flat_list_to_object, ClusterStatusReport};

use types::{
    ClusterStatusResponse, DeleteStatusResponse, HeaderOnly, ListResponse, RealtimeGetResponse,
    RequestStatusResponse, SelectResponse,
};

/// Collections admin endpoint.
pub const COLLECTIONS_ADMIN_PATH: &str = "/solr/admin/collections";
/// Stored field holding the JSON-encoded marker body.
pub const MARKER_BODY_FIELD: &str = "marker_body_s";
/// Milliseconds within which the marker write is committed.
pub const MARKER_COMMIT_WITHIN_MS: u64 = 5000;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds a [`SolrClient`]. No eager probe is issued.
pub struct SolrClientBuilder<'a> {
    db: DatabaseRef,
    store: &'a dyn SecretStore,
    pod: Option<String>,
    url: Option<String>,
    config: TransportConfig,
}

impl<'a> SolrClientBuilder<'a> {
    pub fn new(db: DatabaseRef, store: &'a dyn SecretStore) -> Self {
        Self {
            db,
            store,
            pod: None,
            url: None,
            config: TransportConfig::default(),
        }
    }

    pub fn pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = Some(pod.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(skip(self), fields(db = %self.db.qualified_name()))]
    pub async fn build(self) -> Result<SolrClient> {
        let endpoint = Endpoint::select(self.pod.as_deref(), self.url.as_deref());
        let base_url = self.db.base_url(&endpoint);

        let credential = resolve_credential(
            self.store,
            self.db.security_enabled,
            self.db.auth_secret.as_ref(),
            &self.db.qualified_name(),
        )
        .await?;

        let mut transport = HttpTransport::builder(base_url.clone())
            .credential(credential)
            .config(self.config);
        if let Some(spec) = &self.db.tls {
            let material = resolve_tls_material(self.store, &spec.cert_secret).await?;
            transport = transport.tls(material, spec.client_auth == ClientAuthMode::Cert);
        }
        let transport = transport.build()?;

        info!(address = %base_url, "collection store client ready");
        Ok(SolrClient {
            transport,
            marker_collection: MARKER_COLLECTION.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// SolrClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SolrClient {
    transport: HttpTransport,
    marker_collection: String,
}

impl SolrClient {
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn marker_collection(&self) -> &str {
        &self.marker_collection
    }

    async fn admin(
        &self,
        operation: &'static str,
        method: Method,
        action: CollectionAction,
        params: &[(&str, String)],
    ) -> Result<Response> {
        let request = self
            .transport
            .request(method, COLLECTIONS_ADMIN_PATH)?
            .query(&[(param::ACTION, action.as_str())])
            .query(params);
        self.transport.send(operation, request).await
    }

    // -- Cluster ------------------------------------------------------------

    /// `CLUSTERSTATUS`: header status and every collection's health.
    pub async fn cluster_status(&self) -> Result<ClusterStatusReport> {
        let response = self
            .admin("cluster status", Method::GET, CollectionAction::ClusterStatus, &[])
            .await?;
        let response: ClusterStatusResponse = read_body("cluster status", response).await?;
        Ok(ClusterStatusReport::from(response))
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let response = self
            .admin("list collections", Method::GET, CollectionAction::List, &[])
            .await?;
        let response: ListResponse = read_body("list collections", response).await?;
        if response.response_header.status != 0 {
            return Err(ProbeError::parse(
                "list collections",
                format!("responseHeader.status is {}", response.response_header.status),
            ));
        }
        Ok(response.collections)
    }

    /// Create a single-shard, single-replica collection.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let params = [
            (param::NAME, name.to_string()),
            (param::NUM_SHARDS, "1".to_string()),
            (param::REPLICATION_FACTOR, "1".to_string()),
        ];
        let response = self
            .admin("create collection", Method::POST, CollectionAction::Create, &params)
            .await?;
        expect_accepted(response).await?;
        info!(collection = name, "collection created");
        Ok(())
    }

    /// Create the marker collection unless it exists. Returns `true` if it
    /// was created.
    pub async fn ensure_marker_collection(&self) -> Result<bool> {
        if self
            .list_collections()
            .await?
            .iter()
            .any(|c| c == &self.marker_collection)
        {
            return Ok(false);
        }
        self.create_collection(&self.marker_collection).await?;
        Ok(true)
    }

    /// Documents in `collection`, by `q=*:*`.
    pub async fn document_count(&self, collection: &str) -> Result<u64> {
        let response: SelectResponse = self
            .transport
            .get_json("select", &format!("/solr/{collection}/select?q=*:*&rows=0"))
            .await?;
        Ok(response.response.num_found)
    }

    // -- Asynchronous actions -----------------------------------------------

    #[instrument(skip(self, target), fields(backup = %target.name))]
    pub async fn backup(
        &self,
        collection: &str,
        target: &BackupTarget,
        token: Option<AsyncToken>,
    ) -> Result<SubmittedAction> {
        let token = token.unwrap_or_else(|| AsyncToken::default_for(ActionKind::Backup, collection, None));
        let mut params = target_params(target, &token);
        params.push((param::COLLECTION, collection.to_string()));
        self.submit(ActionKind::Backup, Method::POST, CollectionAction::Backup, &params, token)
            .await
    }

    #[instrument(skip(self, target), fields(backup = %target.name))]
    pub async fn restore(
        &self,
        collection: &str,
        target: &BackupTarget,
        backup_id: u64,
        token: Option<AsyncToken>,
    ) -> Result<SubmittedAction> {
        let token = token.unwrap_or_else(|| AsyncToken::default_for(ActionKind::Restore, collection, None));
        let mut params = target_params(target, &token);
        params.push((param::COLLECTION, collection.to_string()));
        params.push((param::BACKUP_ID, backup_id.to_string()));
        self.submit(ActionKind::Restore, Method::POST, CollectionAction::Restore, &params, token)
            .await
    }

    /// Delete one backup point.
    #[instrument(skip(self, target), fields(backup = %target.name))]
    pub async fn delete_backup(
        &self,
        collection: &str,
        target: &BackupTarget,
        backup_id: u64,
        snapshot: Option<&str>,
        token: Option<AsyncToken>,
    ) -> Result<SubmittedAction> {
        let token = token.unwrap_or_else(|| {
            AsyncToken::default_for(ActionKind::DeleteBackup, collection, snapshot)
        });
        let mut params = target_params(target, &token);
        params.push((param::BACKUP_ID, backup_id.to_string()));
        self.submit(
            ActionKind::DeleteBackup,
            Method::DELETE,
            CollectionAction::DeleteBackup,
            &params,
            token,
        )
        .await
    }

    /// Delete index files no backup point references any more.
    #[instrument(skip(self, target), fields(backup = %target.name))]
    pub async fn purge_backups(
        &self,
        collection: &str,
        target: &BackupTarget,
        snapshot: Option<&str>,
        token: Option<AsyncToken>,
    ) -> Result<SubmittedAction> {
        let token =
            token.unwrap_or_else(|| AsyncToken::default_for(ActionKind::Purge, collection, snapshot));
        let mut params = target_params(target, &token);
        params.push((param::PURGE_UNUSED, "true".to_string()));
        self.submit(
            ActionKind::Purge,
            Method::PUT,
            CollectionAction::DeleteBackup,
            &params,
            token,
        )
        .await
    }

    async fn submit(
        &self,
        kind: ActionKind,
        method: Method,
        action: CollectionAction,
        params: &[(&str, String)],
        token: AsyncToken,
    ) -> Result<SubmittedAction> {
        let response = self.admin("submit action", method, action, params).await?;
        expect_accepted(response).await?;
        info!(?kind, token = %token, "action submitted");
        Ok(SubmittedAction { kind, token })
    }

    /// `REQUESTSTATUS` for `token`.
    pub async fn request_status(&self, token: &AsyncToken) -> Result<ActionStatus> {
        let params = [(param::REQUEST_ID, token.to_string())];
        let response = self
            .admin("request status", Method::GET, CollectionAction::RequestStatus, &params)
            .await?;
        let response: RequestStatusResponse = read_body("request status", response).await?;

        let details = match response.response {
            Some(list @ serde_json::Value::Array(_)) => Some(flat_list_to_object(&list)?),
            Some(serde_json::Value::Object(object)) => Some(object),
            _ => None,
        };
        let state = ActionState::from_token(&response.status.state)?;
        debug!(token = %token, ?state, "action status");
        Ok(ActionStatus {
            token: token.clone(),
            state,
            message: response.status.msg,
            details,
        })
    }

    /// `DELETESTATUS` for `token`. Idempotent: see the module docs of
    /// [`action`].
    pub async fn flush_status(&self, token: &AsyncToken) -> Result<FlushOutcome> {
        let params = [(param::REQUEST_ID, token.to_string())];
        let response = self
            .admin("flush status", Method::GET, CollectionAction::DeleteStatus, &params)
            .await?;
        let response: DeleteStatusResponse = read_body("flush status", response).await?;
        let outcome = FlushOutcome::from_message(&response.status);
        debug!(token = %token, ?outcome, "action status flushed");
        Ok(outcome)
    }

    /// Poll `token`, folding in cluster health.
    ///
    /// A completed action is reported as [`ActionState::Failed`] while any
    /// collection is not `GREEN`.
    pub async fn poll_action(&self, token: &AsyncToken) -> Result<ActionState> {
        let status = self.request_status(token).await?;
        if status.state != ActionState::Completed {
            return Ok(status.state);
        }
        let report = self.cluster_status().await?;
        if report.is_healthy() {
            Ok(ActionState::Completed)
        } else {
            warn!(
                token = %token,
                unhealthy = ?report.unhealthy(),
                status = report.status,
                "action completed but cluster is not healthy"
            );
            Ok(ActionState::Failed)
        }
    }
}

// ---------------------------------------------------------------------------
// Readiness marker
// ---------------------------------------------------------------------------

#[async_trait]
impl WriteProbe for SolrClient {
    async fn write_marker(&self, document: &serde_json::Value) -> Result<()> {
        let encoded = serde_json::to_string(document)
            .map_err(|e| ProbeError::parse("marker write", e.to_string()))?;
        let body = serde_json::json!({
            "add": {
                "doc": {
                    "id": MARKER_COLLECTION_DOC_ID,
                    MARKER_BODY_FIELD: encoded,
                },
                "commitWithin": MARKER_COMMIT_WITHIN_MS,
                "overwrite": true,
            }
        });

        let path = format!("/solr/{}/update", self.marker_collection);
        let request = self.transport.request(Method::POST, &path)?.json(&body);
        let response = self.transport.send("marker write", request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProbeError::NotFound(format!("collection {}", self.marker_collection)));
        }
        expect_accepted(response).await
    }
}

#[async_trait]
impl ReadProbe for SolrClient {
    async fn read_marker(&self) -> Result<serde_json::Value> {
        let path = format!(
            "/solr/{}/get?id={MARKER_COLLECTION_DOC_ID}",
            self.marker_collection
        );
        let response: RealtimeGetResponse = self.transport.get_json("marker read", &path).await?;
        let doc = response
            .doc
            .ok_or_else(|| ProbeError::NotFound(format!("{}/{MARKER_COLLECTION_DOC_ID}", self.marker_collection)))?;
        decode_marker(&doc)
    }
}

/// Recover the caller's document from the stored marker.
///
/// The body travels as one JSON-encoded string so that the collection's
/// field typing never reshapes it. Schemaless collections may hand that
/// string back as a one-element list.
fn decode_marker(doc: &serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value> {
    let stored = match doc.get(MARKER_BODY_FIELD) {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => match items.as_slice() {
            [serde_json::Value::String(s)] => s,
            _ => {
                return Err(ProbeError::parse(
                    "marker read",
                    format!("{MARKER_BODY_FIELD} holds {} values", items.len()),
                ))
            }
        },
        _ => {
            return Err(ProbeError::parse(
                "marker read",
                format!("marker document has no {MARKER_BODY_FIELD} string"),
            ))
        }
    };
    serde_json::from_str(stored).map_err(|e| ProbeError::parse("marker read", e.to_string()))
}

fn target_params<'p>(target: &BackupTarget, token: &AsyncToken) -> Vec<(&'p str, String)> {
    vec![
        (param::NAME, target.name.clone()),
        (param::LOCATION, target.location.clone()),
        (param::REPOSITORY, target.repository.clone()),
        (param::ASYNC, token.to_string()),
    ]
}

/// Decode a read response, turning non-success statuses into errors.
async fn read_body<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ProbeError::NotFound(response.url().path().to_string()));
    }
    if !status.is_success() {
        return Err(ProbeError::ReadRejected {
            status: status.as_u16(),
        });
    }
    decode_json(operation, response).await
}

/// Accept a write-style response: 2xx with `responseHeader.status == 0`.
async fn expect_accepted(response: Response) -> Result<()> {
    if !response.status().is_success() {
        return Err(ProbeError::WriteRejected {
            response: error_body(response).await,
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| ProbeError::transport("read write response", e))?;
    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| ProbeError::parse("write response", e.to_string()))?;
    let header: HeaderOnly = serde_json::from_value(value.clone())
        .map_err(|e| ProbeError::parse("write response", e.to_string()))?;
    if header.response_header.status != 0 {
        return Err(ProbeError::WriteRejected { response: value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_marker_keeps_body_shape() {
        let body = serde_json::json!({"tags": ["only"], "writer": "dbprobe"});
        let encoded = serde_json::to_string(&body).unwrap();

        let plain = serde_json::json!({"id": "1", MARKER_BODY_FIELD: encoded, "_version_": 1789});
        assert_eq!(decode_marker(plain.as_object().unwrap()).unwrap(), body);

        let listed = serde_json::json!({"id": "1", MARKER_BODY_FIELD: [encoded]});
        assert_eq!(decode_marker(listed.as_object().unwrap()).unwrap(), body);
    }

    #[test]
    fn test_decode_marker_without_body_is_parse_error() {
        let doc = serde_json::json!({"id": "1", "writer": ["dbprobe"]});
        let err = decode_marker(doc.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ProbeError::ResponseParseError { .. }), "{err:?}");
    }

    #[test]
    fn test_target_params_carry_token() {
        let target = BackupTarget::new("nightly", "/backups", "s3");
        let token = AsyncToken::new("custom-token");
        let params = target_params(&target, &token);
        assert!(params.contains(&(param::ASYNC, "custom-token".to_string())));
        assert!(params.contains(&(param::REPOSITORY, "s3".to_string())));
    }
}
