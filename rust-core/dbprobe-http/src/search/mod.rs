// SPDX-License-Identifier: PMPL-1.0-or-later
//! Search-engine clients (Elasticsearch and OpenSearch).
//!
//! [`SearchClientBuilder`] resolves the protocol variant from the engine
//! version and returns a [`SearchClient`]. Capabilities every variant
//! shares are reachable through [`SearchClient::api`]; optional ones through
//! accessors that return `None` on variants without them.

pub mod api;
pub mod builder;
pub mod bulk;
pub mod types;
pub mod v1;
pub mod v2;

use async_trait::async_trait;

use dbprobe_core::{ProtocolVariant, ReadProbe, Result, WriteProbe};

use crate::capability::{
    ClusterHealth, ClusterStatus, CredentialSync, EnsureUserRole, ListIndices, NodeStats,
    TotalDiskUsage,
};
use crate::transport::HttpTransport;

pub use builder::SearchClientBuilder;
pub use types::{ClusterHealthInfo, IndexInfo, NodesStats};
pub use v1::SearchClientV1;
pub use v2::SearchClientV2;

/// Capabilities every search-engine variant implements.
pub trait SearchApi:
    ClusterHealth
    + NodeStats
    + ListIndices
    + ClusterStatus
    + CredentialSync
    + TotalDiskUsage
    + WriteProbe
    + ReadProbe
{
}

impl<T> SearchApi for T where
    T: ClusterHealth
        + NodeStats
        + ListIndices
        + ClusterStatus
        + CredentialSync
        + TotalDiskUsage
        + WriteProbe
        + ReadProbe
{
}

/// A search client of whichever variant the engine version selected.
#[derive(Debug, Clone)]
pub enum SearchClient {
    V1(SearchClientV1),
    V2(SearchClientV2),
}

impl SearchClient {
    pub fn variant(&self) -> ProtocolVariant {
        match self {
            SearchClient::V1(_) => ProtocolVariant::V1,
            SearchClient::V2(_) => ProtocolVariant::V2,
        }
    }

    /// The shared capability set.
    pub fn api(&self) -> &dyn SearchApi {
        match self {
            SearchClient::V1(client) => client,
            SearchClient::V2(client) => client,
        }
    }

    /// Role management, available from V2 on.
    pub fn user_roles(&self) -> Option<&dyn EnsureUserRole> {
        match self {
            SearchClient::V1(_) => None,
            SearchClient::V2(client) => Some(client),
        }
    }

    pub fn transport(&self) -> &HttpTransport {
        match self {
            SearchClient::V1(client) => client.transport(),
            SearchClient::V2(client) => client.transport(),
        }
    }
}

#[async_trait]
impl WriteProbe for SearchClient {
    async fn write_marker(&self, document: &serde_json::Value) -> Result<()> {
        self.api().write_marker(document).await
    }
}

#[async_trait]
impl ReadProbe for SearchClient {
    async fn read_marker(&self) -> Result<serde_json::Value> {
        self.api().read_marker().await
    }
}
