// SPDX-License-Identifier: PMPL-1.0-or-later
//! Variant 1: Elastic 7.x and earlier, and OpenSearch 1.x/2.x.

use async_trait::async_trait;

use dbprobe_core::{AuthPlugin, Credential, ProtocolVariant, ReadProbe, Result, WriteProbe};

use super::api;
use super::types::{ClusterHealthInfo, IndexInfo, NodesStats};
use crate::capability::{
    ClusterHealth, ClusterStatus, CredentialSync, ListIndices, NodeStats, TotalDiskUsage,
};
use crate::transport::HttpTransport;

/// Search client speaking the V1 wire format.
///
/// The auth plugin decides which credential-sync endpoint is used.
#[derive(Debug, Clone)]
pub struct SearchClientV1 {
    transport: HttpTransport,
    plugin: AuthPlugin,
}

impl SearchClientV1 {
    pub fn new(transport: HttpTransport, plugin: AuthPlugin) -> Self {
        Self { transport, plugin }
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    pub fn auth_plugin(&self) -> AuthPlugin {
        self.plugin
    }
}

#[async_trait]
impl ClusterHealth for SearchClientV1 {
    async fn cluster_health(&self) -> Result<ClusterHealthInfo> {
        api::cluster_health(&self.transport).await
    }
}

#[async_trait]
impl NodeStats for SearchClientV1 {
    async fn nodes_stats(&self) -> Result<NodesStats> {
        api::nodes_stats(&self.transport).await
    }
}

#[async_trait]
impl ListIndices for SearchClientV1 {
    async fn list_indices(&self) -> Result<Vec<IndexInfo>> {
        api::list_indices(&self.transport).await
    }
}

#[async_trait]
impl ClusterStatus for SearchClientV1 {
    async fn cluster_status(&self) -> Result<String> {
        api::cluster_status(&self.transport).await
    }
}

#[async_trait]
impl CredentialSync for SearchClientV1 {
    async fn sync_credential(&self, credential: &Credential) -> Result<()> {
        api::sync_credential(&self.transport, self.plugin, credential).await
    }
}

#[async_trait]
impl TotalDiskUsage for SearchClientV1 {
    async fn total_disk_usage(&self) -> Result<u64> {
        api::total_disk_usage(&self.transport).await
    }
}

#[async_trait]
impl WriteProbe for SearchClientV1 {
    async fn write_marker(&self, document: &serde_json::Value) -> Result<()> {
        api::write_marker(&self.transport, ProtocolVariant::V1, document).await
    }
}

#[async_trait]
impl ReadProbe for SearchClientV1 {
    async fn read_marker(&self) -> Result<serde_json::Value> {
        api::read_marker(&self.transport).await
    }
}
