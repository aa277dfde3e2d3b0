// SPDX-License-Identifier: PMPL-1.0-or-later
//! REST calls shared by both search-engine variants.
//!
//! The variants differ in which of these they expose and in a few wire
//! details (bulk header shape, credential-sync endpoint); everything else
//! is the same request against the same path.

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use tracing::{debug, info, warn};

use dbprobe_core::consts::{MARKER_DOC_ID, MARKER_INDEX};
use dbprobe_core::{AuthPlugin, Credential, ProbeError, ProtocolVariant, Result};

use super::bulk::{encode_marker_write, interpret_bulk_response};
use super::types::{
    ClusterHealthInfo, ClusterStatusOnly, GetDocumentResponse, IndexInfo, NodesStats,
    SecurityUsers,
};
use crate::transport::{error_body, HttpTransport};

pub const CLUSTER_HEALTH_PATH: &str = "/_cluster/health";
pub const NODES_STATS_PATH: &str = "/_nodes/stats";
pub const CAT_INDICES_PATH: &str = "/_cat/indices?format=json&bytes=b";

pub(crate) async fn cluster_health(transport: &HttpTransport) -> Result<ClusterHealthInfo> {
    transport.get_json("cluster health", CLUSTER_HEALTH_PATH).await
}

pub(crate) async fn cluster_status(transport: &HttpTransport) -> Result<String> {
    let health: ClusterStatusOnly = transport.get_json("cluster status", CLUSTER_HEALTH_PATH).await?;
    health
        .status
        .ok_or_else(|| ProbeError::parse("cluster status", "`status` is missing"))
}

pub(crate) async fn nodes_stats(transport: &HttpTransport) -> Result<NodesStats> {
    transport.get_json("nodes stats", NODES_STATS_PATH).await
}

pub(crate) async fn list_indices(transport: &HttpTransport) -> Result<Vec<IndexInfo>> {
    transport.get_json("list indices", CAT_INDICES_PATH).await
}

pub(crate) async fn total_disk_usage(transport: &HttpTransport) -> Result<u64> {
    Ok(nodes_stats(transport).await?.total_store_bytes())
}

pub(crate) async fn write_marker(
    transport: &HttpTransport,
    variant: ProtocolVariant,
    document: &serde_json::Value,
) -> Result<()> {
    let payload = encode_marker_write(variant, document)?;
    let request = transport
        .request(Method::POST, &format!("/{MARKER_INDEX}/_bulk"))?
        .header(CONTENT_TYPE, "application/x-ndjson")
        .body(payload);
    let response = transport.send("bulk write", request).await?;

    if !response.status().is_success() {
        return Err(ProbeError::WriteRejected {
            response: error_body(response).await,
        });
    }
    let body = response
        .text()
        .await
        .map_err(|e| ProbeError::transport("bulk write", e))?;
    interpret_bulk_response(&body)
}

pub(crate) async fn read_marker(transport: &HttpTransport) -> Result<serde_json::Value> {
    let path = format!("/{MARKER_INDEX}/_doc/{MARKER_DOC_ID}");
    let document: GetDocumentResponse = transport.get_json("marker read", &path).await?;
    if !document.found {
        return Err(ProbeError::NotFound(path));
    }
    document
        .source
        .ok_or_else(|| ProbeError::parse("marker read", "`_source` is missing"))
}

pub(crate) async fn sync_credential(
    transport: &HttpTransport,
    plugin: AuthPlugin,
    credential: &Credential,
) -> Result<()> {
    let username = credential.username();
    let failed = |reason: String| ProbeError::CredentialSyncFailed {
        username: username.to_string(),
        reason,
    };

    let request = match plugin {
        AuthPlugin::XPack => transport
            .request(Method::POST, &format!("/_security/user/{username}/_password"))?
            .json(&serde_json::json!({ "password": credential.password() })),
        AuthPlugin::OpenSearch => transport
            .request(
                Method::PATCH,
                &format!("/_plugins/_security/api/internalusers/{username}"),
            )?
            .json(&serde_json::json!([
                { "op": "replace", "path": "/password", "value": credential.password() }
            ])),
    };

    let response = transport
        .send("credential sync", request)
        .await
        .map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        warn!(username, %status, "credential sync rejected");
        return Err(failed(format!("status {status}")));
    }
    info!(username, plugin = %plugin, "credential synced");
    Ok(())
}

pub(crate) async fn ensure_user_role(
    transport: &HttpTransport,
    username: &str,
    role: &str,
) -> Result<bool> {
    let path = format!("/_security/user/{username}");
    let mut users: SecurityUsers = transport.get_json("get user", &path).await?;
    let mut user = users
        .remove(username)
        .ok_or_else(|| ProbeError::NotFound(format!("user {username}")))?;

    if user.roles.iter().any(|r| r == role) {
        debug!(username, role, "user already holds role");
        return Ok(false);
    }

    user.roles.push(role.to_string());
    // The put API rejects the read-only username field.
    user.rest.remove("username");

    let request = transport.request(Method::PUT, &path)?.json(&user);
    let response = transport.send("put user", request).await?;
    if !response.status().is_success() {
        return Err(ProbeError::WriteRejected {
            response: error_body(response).await,
        });
    }
    info!(username, role, "role added to user");
    Ok(true)
}
