// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
//! Asynchronous collection actions.
//!
//! Long-running admin actions (backup, restore, backup deletion, purge) are
//! submitted with a caller-chosen [`AsyncToken`] and return at once. The
//! caller then polls the token and must flush it when done, or the server
//! keeps its bookkeeping forever.
//!
//! Flush policy: flushing is idempotent. A token the server no longer knows
//! (never submitted, or already flushed) flushes with
//! [`FlushOutcome::AlreadyAbsent`], and polling a flushed token reports
//! [`ActionState::NotFound`].

use std::fmt;

use serde::{Deserialize, Serialize};

use dbprobe_core::consts::token_suffix;
use dbprobe_core::{ProbeError, Result};

/// Kinds of asynchronous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Backup,
    Restore,
    DeleteBackup,
    Purge,
}

impl ActionKind {
    fn suffix(self) -> &'static str {
        match self {
            ActionKind::Backup => token_suffix::BACKUP,
            ActionKind::Restore => token_suffix::RESTORE,
            ActionKind::DeleteBackup => token_suffix::DELETE,
            ActionKind::Purge => token_suffix::PURGE,
        }
    }
}

/// Caller-assigned identifier of an asynchronous action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsyncToken(String);

impl AsyncToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The conventional token: `{collection}-{kind}`, with `-{snapshot}`
    /// appended for deletes and purges scoped to a snapshot.
    pub fn default_for(kind: ActionKind, collection: &str, snapshot: Option<&str>) -> Self {
        let base = format!("{collection}-{}", kind.suffix());
        match (kind, snapshot) {
            (ActionKind::DeleteBackup | ActionKind::Purge, Some(snap)) if !snap.is_empty() => {
                Self(format!("{base}-{snap}"))
            }
            _ => Self(base),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AsyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side state of an asynchronous action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Submitted,
    Running,
    Completed,
    Failed,
    /// Unknown to the server: never submitted, or flushed.
    NotFound,
}

impl ActionState {
    /// Parse the `status.state` token of a status response.
    pub fn from_token(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "submitted" => Ok(ActionState::Submitted),
            "running" => Ok(ActionState::Running),
            "completed" => Ok(ActionState::Completed),
            "failed" => Ok(ActionState::Failed),
            "notfound" => Ok(ActionState::NotFound),
            other => Err(ProbeError::parse(
                "request status",
                format!("unknown action state {other:?}"),
            )),
        }
    }

    /// `true` once the action will not change state again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ActionState::Completed | ActionState::Failed | ActionState::NotFound
        )
    }
}

/// Result of a status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStatus {
    pub token: AsyncToken,
    pub state: ActionState,
    pub message: Option<String>,
    /// Action-specific details, decoded from the flat response list.
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Result of flushing a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Stored status removed.
    Flushed,
    /// Nothing was stored under the token.
    AlreadyAbsent,
}

impl FlushOutcome {
    /// Classify the sentence the server answers a flush with.
    pub fn from_message(message: &str) -> Self {
        if message.to_ascii_lowercase().contains("not found") {
            FlushOutcome::AlreadyAbsent
        } else {
            FlushOutcome::Flushed
        }
    }
}

/// Where backups live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTarget {
    /// Backup name.
    pub name: String,
    /// Path inside the repository.
    pub location: String,
    /// Configured backup repository.
    pub repository: String,
}

impl BackupTarget {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            repository: repository.into(),
        }
    }
}

/// An accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedAction {
    pub kind: ActionKind,
    pub token: AsyncToken,
}
