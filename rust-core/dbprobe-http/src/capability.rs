// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Optional protocol capabilities.
//!
//! Each capability is its own trait. A client variant implements the subset
//! it supports, and a newer variant adds traits instead of widening an
//! existing one, so callers written against an older variant keep working.
//! The write and read probes live in `dbprobe_core::health` because the
//! readiness evaluator is generic over them.

use async_trait::async_trait;

use dbprobe_core::{Credential, Result};

use crate::search::types::{ClusterHealthInfo, IndexInfo, NodesStats};

/// Cluster-level health summary.
#[async_trait]
pub trait ClusterHealth: Send + Sync {
    async fn cluster_health(&self) -> Result<ClusterHealthInfo>;
}

/// Per-node statistics.
#[async_trait]
pub trait NodeStats: Send + Sync {
    async fn nodes_stats(&self) -> Result<NodesStats>;
}

/// Index listing.
#[async_trait]
pub trait ListIndices: Send + Sync {
    async fn list_indices(&self) -> Result<Vec<IndexInfo>>;
}

/// Broker listing, the message-queue counterpart of [`ListIndices`].
#[async_trait]
pub trait ListBrokers: Send + Sync {
    async fn list_brokers(&self) -> Result<Vec<i64>>;
}

/// The cluster's overall status token (`green`, `yellow`, `red`).
#[async_trait]
pub trait ClusterStatus: Send + Sync {
    async fn cluster_status(&self) -> Result<String>;
}

/// Push a changed password to the store.
#[async_trait]
pub trait CredentialSync: Send + Sync {
    /// Set `credential.username()`'s password to `credential.password()`.
    ///
    /// Any transport failure or non-2xx answer is
    /// [`dbprobe_core::ProbeError::CredentialSyncFailed`].
    async fn sync_credential(&self, credential: &Credential) -> Result<()>;
}

/// Bytes on disk across the cluster.
#[async_trait]
pub trait TotalDiskUsage: Send + Sync {
    async fn total_disk_usage(&self) -> Result<u64>;
}

/// Make sure a user holds a role.
#[async_trait]
pub trait EnsureUserRole: Send + Sync {
    /// Returns `true` if the role had to be added, `false` if the user
    /// already had it.
    async fn ensure_user_role(&self, username: &str, role: &str) -> Result<bool>;
}
