// SPDX-License-Identifier: PMPL-1.0-or-later
//! `/api/status` payload schemas.
//!
//! Schema A (V1 dashboards) reports `status.overall.state` and a list of
//! components under `status.statuses`. Schema B (V2) reports
//! `status.overall.level` and a map of plugins under `status.plugins`.
//! Every key named here is required; a payload missing one does not decode.

use std::collections::BTreeMap;

use serde::Deserialize;

use dbprobe_core::{HealthResult, ProbeError, ProtocolVariant, Result};

/// Healthy overall/component token in schema A.
pub const SCHEMA_A_HEALTHY: &str = "green";
/// Healthy overall/component token in schema B.
pub const SCHEMA_B_HEALTHY: &str = "available";

#[derive(Debug, Deserialize)]
struct SchemaA {
    status: StatusA,
}

#[derive(Debug, Deserialize)]
struct StatusA {
    overall: OverallA,
    statuses: Vec<ComponentA>,
}

#[derive(Debug, Deserialize)]
struct OverallA {
    state: String,
}

#[derive(Debug, Deserialize)]
struct ComponentA {
    id: String,
    state: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SchemaB {
    status: StatusB,
}

#[derive(Debug, Deserialize)]
struct StatusB {
    overall: OverallB,
    plugins: BTreeMap<String, ComponentB>,
}

#[derive(Debug, Deserialize)]
struct OverallB {
    level: String,
}

#[derive(Debug, Deserialize)]
struct ComponentB {
    level: String,
    summary: String,
}

/// Healthy token for `variant`'s schema.
pub fn healthy_token(variant: ProtocolVariant) -> &'static str {
    match variant {
        ProtocolVariant::V1 => SCHEMA_A_HEALTHY,
        ProtocolVariant::V2 => SCHEMA_B_HEALTHY,
    }
}

/// Parse a status body with the schema `variant` selects.
pub fn parse_status(variant: ProtocolVariant, body: &str) -> Result<HealthResult> {
    let parse_err = |e: serde_json::Error| ProbeError::parse("dashboard status", e.to_string());
    let healthy = healthy_token(variant);

    let (overall, reasons) = match variant {
        ProtocolVariant::V1 => {
            let payload: SchemaA = serde_json::from_str(body).map_err(parse_err)?;
            let reasons = payload
                .status
                .statuses
                .into_iter()
                .filter(|c| c.state != healthy)
                .map(|c| (c.id, format!("{},{}", c.state, c.message)))
                .collect::<BTreeMap<_, _>>();
            (payload.status.overall.state, reasons)
        }
        ProtocolVariant::V2 => {
            let payload: SchemaB = serde_json::from_str(body).map_err(parse_err)?;
            let reasons = payload
                .status
                .plugins
                .into_iter()
                .filter(|(_, c)| c.level != healthy)
                .map(|(name, c)| (name, format!("{},{}", c.level, c.summary)))
                .collect::<BTreeMap<_, _>>();
            (payload.status.overall.level, reasons)
        }
    };

    Ok(HealthResult::from_components(overall, healthy, reasons))
}
