// SPDX-License-Identifier: PMPL-1.0-or-later
//! Newline-delimited bulk write encoding and response interpretation.
//!
//! A write probe is one bulk request of two records: the index-action
//! header, then the document body, each followed by `\n`.

use serde::Serialize;

use dbprobe_core::consts::{MARKER_DOC_ID, MARKER_DOC_TYPE};
use dbprobe_core::{ProbeError, ProtocolVariant, Result};

#[derive(Debug, Serialize)]
struct IndexAction<'a> {
    index: IndexActionBody<'a>,
}

#[derive(Debug, Serialize)]
struct IndexActionBody<'a> {
    #[serde(rename = "_id")]
    id: &'a str,
    /// Mapping types were removed from the V2 wire format.
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    doc_type: Option<&'a str>,
}

/// Encode the marker header plus `document` for `variant`.
pub fn encode_marker_write(variant: ProtocolVariant, document: &serde_json::Value) -> Result<String> {
    let header = IndexAction {
        index: IndexActionBody {
            id: MARKER_DOC_ID,
            doc_type: match variant {
                ProtocolVariant::V1 => Some(MARKER_DOC_TYPE),
                ProtocolVariant::V2 => None,
            },
        },
    };
    let header = serde_json::to_string(&header)
        .map_err(|e| ProbeError::parse("encode bulk header", e.to_string()))?;
    let body = serde_json::to_string(document)
        .map_err(|e| ProbeError::parse("encode bulk body", e.to_string()))?;
    Ok(format!("{header}\n{body}\n"))
}

/// Interpret a bulk response body.
///
/// `errors: false` is success, `errors: true` is [`ProbeError::WriteRejected`]
/// carrying the whole response, and a missing or non-boolean flag is
/// [`ProbeError::ResponseParseError`].
pub fn interpret_bulk_response(body: &str) -> Result<()> {
    let response: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ProbeError::parse("bulk write", e.to_string()))?;
    match response.get("errors") {
        Some(serde_json::Value::Bool(false)) => Ok(()),
        Some(serde_json::Value::Bool(true)) => Err(ProbeError::WriteRejected { response }),
        Some(other) => Err(ProbeError::parse(
            "bulk write",
            format!("`errors` is not a boolean: {other}"),
        )),
        None => Err(ProbeError::parse("bulk write", "`errors` flag is missing")),
    }
}
