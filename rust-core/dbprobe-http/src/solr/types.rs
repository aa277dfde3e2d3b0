// SPDX-License-Identifier: PMPL-1.0-or-later
//! Collections admin and core API response schemas.

use std::collections::BTreeMap;

use serde::Deserialize;

use dbprobe_core::consts::COLLECTION_HEALTHY;
use dbprobe_core::{ProbeError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseHeader {
    /// 0 on success.
    pub status: i64,
    #[serde(rename = "QTime", default)]
    pub qtime: Option<u64>,
}

/// `action=CLUSTERSTATUS`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClusterStatusResponse {
    #[serde(rename = "responseHeader")]
    pub response_header: ResponseHeader,
    pub cluster: ClusterInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClusterInfo {
    pub collections: BTreeMap<String, CollectionHealth>,
    #[serde(default)]
    pub live_nodes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CollectionHealth {
    pub health: String,
}

/// Parsed cluster status: header status plus per-collection health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatusReport {
    pub status: i64,
    pub live_nodes: Vec<String>,
    /// Collection name -> health token.
    pub collections: BTreeMap<String, String>,
}

impl ClusterStatusReport {
    /// Collections whose health is not `GREEN`.
    pub fn unhealthy(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|(_, health)| health.as_str() != COLLECTION_HEALTHY)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.status == 0 && self.unhealthy().is_empty()
    }
}

impl From<ClusterStatusResponse> for ClusterStatusReport {
    fn from(response: ClusterStatusResponse) -> Self {
        Self {
            status: response.response_header.status,
            live_nodes: response.cluster.live_nodes,
            collections: response
                .cluster
                .collections
                .into_iter()
                .map(|(name, c)| (name, c.health))
                .collect(),
        }
    }
}

/// `action=LIST`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(rename = "responseHeader")]
    pub response_header: ResponseHeader,
    pub collections: Vec<String>,
}

/// Any response where only the header matters.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HeaderOnly {
    #[serde(rename = "responseHeader")]
    pub response_header: ResponseHeader,
}

/// `action=REQUESTSTATUS`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RequestStatusResponse {
    pub status: AsyncStatus,
    /// Flat key/value list some actions attach once finished.
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AsyncStatus {
    pub state: String,
    #[serde(default)]
    pub msg: Option<String>,
}

/// `action=DELETESTATUS`; `status` is a human-readable sentence.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeleteStatusResponse {
    pub status: String,
}

/// `GET /solr/{collection}/get?id=...`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RealtimeGetResponse {
    pub doc: Option<serde_json::Map<String, serde_json::Value>>,
}

/// `GET /solr/{collection}/select`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SelectResponse {
    pub response: SelectDocs,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SelectDocs {
    #[serde(rename = "numFound")]
    pub num_found: u64,
}

/// Convert a flat `[key, value, key, value, ...]` list into an object.
pub fn flat_list_to_object(
    list: &serde_json::Value,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    let items = list
        .as_array()
        .ok_or_else(|| ProbeError::parse("backup response", "expected a list"))?;
    if items.len() % 2 != 0 {
        return Err(ProbeError::parse(
            "backup response",
            format!("odd number of entries ({})", items.len()),
        ));
    }
    items
        .chunks_exact(2)
        .map(|pair| {
            let key = pair[0]
                .as_str()
                .ok_or_else(|| ProbeError::parse("backup response", format!("key {} is not a string", pair[0])))?;
            Ok((key.to_string(), pair[1].clone()))
        })
        .collect()
}
