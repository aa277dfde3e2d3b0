// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Normalised health results and the write-then-read readiness protocol.
//!
//! Stores report health in incompatible shapes; every family parses its own
//! payload into a [`HealthResult`]. Stores without a native readiness flag
//! implement [`WriteProbe`] and [`ReadProbe`] against a fixed marker
//! document, and [`evaluate_readiness`] turns the two probes into one of
//! four [`Readiness`] states.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProbeError, Result};

// ---------------------------------------------------------------------------
// HealthResult
// ---------------------------------------------------------------------------

/// Tri-state health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ready,
    Degraded,
    Unreachable,
}

/// Overall status plus per-component failure reasons.
///
/// An empty `reasons` map on a `Ready` result means fully healthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResult {
    pub status: HealthStatus,
    /// Overall state token exactly as the store reported it.
    pub overall: Option<String>,
    /// Component id or name -> `"<state>,<message>"`.
    pub reasons: BTreeMap<String, String>,
}

impl HealthResult {
    /// Key used in `reasons` when the store could not be reached.
    pub const CONNECTION_REASON: &'static str = "connection";

    pub fn unreachable(reason: impl Into<String>) -> Self {
        let mut reasons = BTreeMap::new();
        reasons.insert(Self::CONNECTION_REASON.to_string(), reason.into());
        Self {
            status: HealthStatus::Unreachable,
            overall: None,
            reasons,
        }
    }

    /// Classify a parsed payload: `Ready` only when the overall state is the
    /// healthy token and no component reported a failure.
    pub fn from_components(
        overall: impl Into<String>,
        healthy_token: &str,
        reasons: BTreeMap<String, String>,
    ) -> Self {
        let overall = overall.into();
        let status = if overall == healthy_token && reasons.is_empty() {
            HealthStatus::Ready
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            overall: Some(overall),
            reasons,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == HealthStatus::Ready
    }
}

// ---------------------------------------------------------------------------
// Write / read probes
// ---------------------------------------------------------------------------

/// Idempotently (re)write the readiness marker.
#[async_trait]
pub trait WriteProbe: Send + Sync {
    /// Replace the marker document with `document`.
    async fn write_marker(&self, document: &serde_json::Value) -> Result<()>;
}

/// Point lookup of the readiness marker.
#[async_trait]
pub trait ReadProbe: Send + Sync {
    /// Return the marker document, or [`ProbeError::NotFound`] if it has
    /// never been written.
    async fn read_marker(&self) -> Result<serde_json::Value>;
}

/// What the probes say about a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Transport failed.
    Unreachable,
    /// Reachable, marker never written.
    NotProvisioned,
    /// Writes land and are read back.
    WriteCapable,
    /// A write was accepted but the read did not return it.
    ReadInconsistent,
}

/// A default marker body identifying the writer and the time of the check.
pub fn marker_document(writer: &str) -> serde_json::Value {
    serde_json::json!({
        "writer": writer,
        "checked_at": chrono::Utc::now().to_rfc3339(),
    })
}

/// `true` when every field of `written` is present with the same value in
/// `read`. Stores may decorate documents with bookkeeping fields.
pub fn document_matches(written: &serde_json::Value, read: &serde_json::Value) -> bool {
    match (written, read) {
        (serde_json::Value::Object(w), serde_json::Value::Object(r)) => w
            .iter()
            .all(|(key, value)| r.get(key).is_some_and(|rv| document_matches(value, rv))),
        _ => written == read,
    }
}

/// Write `document` as the marker, read it back, and classify the store.
pub async fn evaluate_readiness<C>(client: &C, document: &serde_json::Value) -> Result<Readiness>
where
    C: WriteProbe + ReadProbe + ?Sized,
{
    match client.write_marker(document).await {
        Ok(()) => {}
        // The marker's container (index, collection) does not exist yet.
        Err(ProbeError::NotFound(what)) => {
            debug!(marker = %what, "readiness marker location not provisioned");
            return Ok(Readiness::NotProvisioned);
        }
        Err(e) => return unreachable_or(e),
    }

    match client.read_marker().await {
        Ok(read) if document_matches(document, &read) => {
            debug!("readiness marker round-trip succeeded");
            Ok(Readiness::WriteCapable)
        }
        Ok(read) => {
            warn!(written = %document, read = %read, "readiness marker read back differs");
            Ok(Readiness::ReadInconsistent)
        }
        Err(ProbeError::NotFound(what)) => {
            warn!(marker = %what, "readiness marker missing right after write");
            Ok(Readiness::ReadInconsistent)
        }
        Err(e) => unreachable_or(e),
    }
}

/// Read-only variant: is the marker there at all?
pub async fn marker_readiness<C>(client: &C) -> Result<Readiness>
where
    C: ReadProbe + ?Sized,
{
    match client.read_marker().await {
        Ok(_) => Ok(Readiness::WriteCapable),
        Err(ProbeError::NotFound(_)) => Ok(Readiness::NotProvisioned),
        Err(e) => unreachable_or(e),
    }
}

fn unreachable_or(e: ProbeError) -> Result<Readiness> {
    if e.is_unreachable() {
        warn!(error = %e, "store unreachable during readiness probe");
        Ok(Readiness::Unreachable)
    } else {
        Err(e)
    }
}
