// SPDX-License-Identifier: PMPL-1.0-or-later
//! Typed response schemas for the search-engine REST API.
//!
//! Required fields are plain fields so a payload without them fails to
//! decode; fields some versions omit are `Option` or defaulted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `GET /_cluster/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterHealthInfo {
    pub cluster_name: String,
    /// `green`, `yellow` or `red`.
    pub status: String,
    #[serde(default)]
    pub timed_out: bool,
    pub number_of_nodes: u32,
    pub number_of_data_nodes: u32,
    #[serde(default)]
    pub active_primary_shards: u32,
    #[serde(default)]
    pub active_shards: u32,
    #[serde(default)]
    pub relocating_shards: u32,
    #[serde(default)]
    pub initializing_shards: u32,
    #[serde(default)]
    pub unassigned_shards: u32,
}

/// Only the `status` field, for the cluster-status capability.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClusterStatusOnly {
    pub status: Option<String>,
}

/// `GET /_nodes/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesStats {
    pub cluster_name: String,
    pub nodes: BTreeMap<String, NodeStatsEntry>,
}

impl NodesStats {
    /// Sum of every node's on-disk store size. Nodes that report no store
    /// section contribute nothing.
    pub fn total_store_bytes(&self) -> u64 {
        self.nodes
            .values()
            .filter_map(|node| node.indices.as_ref())
            .filter_map(|indices| indices.store.as_ref())
            .map(|store| store.size_in_bytes)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatsEntry {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub indices: Option<NodeIndicesStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIndicesStats {
    #[serde(default)]
    pub store: Option<StoreStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub size_in_bytes: u64,
}

/// One row of `GET /_cat/indices?format=json&bytes=b`. The cat API reports
/// every column as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub index: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub pri: Option<String>,
    #[serde(default)]
    pub rep: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}

/// `GET /{index}/_doc/{id}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GetDocumentResponse {
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<serde_json::Value>,
}

/// `GET /_security/user/{username}`: username -> user.
pub(crate) type SecurityUsers = BTreeMap<String, SecurityUser>;

/// A native-realm user as returned by the security API. Unknown fields are
/// carried through so a `PUT` does not drop them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SecurityUser {
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_health_requires_status() {
        let ok: ClusterHealthInfo = serde_json::from_value(serde_json::json!({
            "cluster_name": "es", "status": "green", "timed_out": false,
            "number_of_nodes": 3, "number_of_data_nodes": 3,
            "active_primary_shards": 4, "active_shards": 8,
            "relocating_shards": 0, "initializing_shards": 0, "unassigned_shards": 0
        }))
        .unwrap();
        assert_eq!(ok.status, "green");

        let missing = serde_json::from_value::<ClusterHealthInfo>(serde_json::json!({
            "cluster_name": "es", "number_of_nodes": 3, "number_of_data_nodes": 3
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_total_store_bytes() {
        let stats: NodesStats = serde_json::from_value(serde_json::json!({
            "cluster_name": "es",
            "nodes": {
                "a": {"name": "es-0", "indices": {"store": {"size_in_bytes": 1024}}},
                "b": {"name": "es-1", "indices": {"store": {"size_in_bytes": 2048}}},
                "c": {"name": "es-2"}
            }
        }))
        .unwrap();
        assert_eq!(stats.total_store_bytes(), 3072);
    }

    #[test]
    fn test_cat_indices_row() {
        let row: IndexInfo = serde_json::from_value(serde_json::json!({
            "health": "green", "status": "open", "index": "kubedb-system",
            "docs.count": "1", "store.size": "5230"
        }))
        .unwrap();
        assert_eq!(row.docs_count.as_deref(), Some("1"));
        assert_eq!(row.store_size.as_deref(), Some("5230"));
    }
}
