// SPDX-License-Identifier: PMPL-1.0-or-later
//! Variant 2: Elastic 8.x.
//!
//! Everything V1 offers, plus [`EnsureUserRole`]. Bulk headers no longer
//! carry a mapping type.

use async_trait::async_trait;

use dbprobe_core::{AuthPlugin, Credential, ProtocolVariant, ReadProbe, Result, WriteProbe};

use super::api;
use super::types::{ClusterHealthInfo, IndexInfo, NodesStats};
use crate::capability::{
    ClusterHealth, ClusterStatus, CredentialSync, EnsureUserRole, ListIndices, NodeStats,
    TotalDiskUsage,
};
use crate::transport::HttpTransport;

#[derive(Debug, Clone)]
pub struct SearchClientV2 {
    transport: HttpTransport,
}

impl SearchClientV2 {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }
}

#[async_trait]
impl ClusterHealth for SearchClientV2 {
    async fn cluster_health(&self) -> Result<ClusterHealthInfo> {
        api::cluster_health(&self.transport).await
    }
}

#[async_trait]
impl NodeStats for SearchClientV2 {
    async fn nodes_stats(&self) -> Result<NodesStats> {
        api::nodes_stats(&self.transport).await
    }
}

#[async_trait]
impl ListIndices for SearchClientV2 {
    async fn list_indices(&self) -> Result<Vec<IndexInfo>> {
        api::list_indices(&self.transport).await
    }
}

#[async_trait]
impl ClusterStatus for SearchClientV2 {
    async fn cluster_status(&self) -> Result<String> {
        api::cluster_status(&self.transport).await
    }
}

#[async_trait]
impl CredentialSync for SearchClientV2 {
    async fn sync_credential(&self, credential: &Credential) -> Result<()> {
        api::sync_credential(&self.transport, AuthPlugin::XPack, credential).await
    }
}

#[async_trait]
impl TotalDiskUsage for SearchClientV2 {
    async fn total_disk_usage(&self) -> Result<u64> {
        api::total_disk_usage(&self.transport).await
    }
}

#[async_trait]
impl EnsureUserRole for SearchClientV2 {
    async fn ensure_user_role(&self, username: &str, role: &str) -> Result<bool> {
        api::ensure_user_role(&self.transport, username, role).await
    }
}

#[async_trait]
impl WriteProbe for SearchClientV2 {
    async fn write_marker(&self, document: &serde_json::Value) -> Result<()> {
        api::write_marker(&self.transport, ProtocolVariant::V2, document).await
    }
}

#[async_trait]
impl ReadProbe for SearchClientV2 {
    async fn read_marker(&self) -> Result<serde_json::Value> {
        api::read_marker(&self.transport).await
    }
}
