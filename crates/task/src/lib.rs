// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Shared data model for the verification task protocol: task records, their
//! lifecycle states, per-category requirements and outcomes, and the generic
//! [`TaskKind`] capability both ledger books and scanners are written against.

use std::{fmt, hash::Hash, str::FromStr};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod credential;
mod project;

pub use credential::{Credential, CredentialLevel, CredentialOutcome};
pub use project::{Project, ProjectOutcome, ProjectSpec};

/// An ordered index into the ledger (block height). Used for expiry arithmetic.
pub type Position = u64;

/// Ledger-assigned task identifier. Monotonically increasing, never reused.
pub type TaskId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Lifecycle state of a verification task.
///
/// `Pending` is the only non-terminal state. A task leaves it exactly once and
/// never returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Expired,
    Rejected,
}

impl TaskStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Expired => "expired",
            TaskStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
#[error("unknown task status `{0}`")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "expired" => Ok(TaskStatus::Expired),
            "rejected" => Ok(TaskStatus::Rejected),
            other => Err(ParseTaskStatusError(other.to_string())),
        }
    }
}

/// The two independently-evolving task categories sharing one protocol shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Credential,
    Project,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Credential => "credential",
            TaskCategory::Project => "project",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability implemented once per task category.
///
/// Ledger books, scanners, and the signature codec are generic over this
/// trait; a category supplies only its requirement/outcome types and the
/// result keying rule.
pub trait TaskKind: Clone + Copy + Send + Sync + 'static {
    const CATEGORY: TaskCategory;

    /// What the requester asks to be satisfied.
    type Requirement: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// The payload an operator signs and submits.
    type Outcome: Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// How committed results are keyed: by subject for credential results
    /// (latest-wins), by task id for project results (one per task).
    type ResultKey: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static;

    /// True for the null/zero requirement, which is rejected at creation.
    fn requirement_is_null(requirement: &Self::Requirement) -> bool;

    fn result_key(task: &Task<Self>) -> Self::ResultKey;

    /// Key under which a subject's standing result would be stored, if the
    /// category keeps one per subject. `None` for per-task categories.
    fn result_key_for_subject(_subject: Address) -> Option<Self::ResultKey> {
        None
    }

    /// Whether a live committed outcome already satisfies `requirement`.
    /// Categories without subject-standing results never pre-satisfy.
    fn outcome_satisfies(_outcome: &Self::Outcome, _requirement: &Self::Requirement) -> bool {
        false
    }
}

/// A verification task as recorded by the ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct Task<K: TaskKind> {
    pub id: TaskId,
    /// The identity the task concerns.
    pub subject: Address,
    pub requirement: K::Requirement,
    /// Ledger position at creation, the basis for expiry arithmetic.
    pub created_at: Position,
    pub status: TaskStatus,
    /// Opaque correlation token set by the requester.
    pub request_id: String,
}

/// A committed verification result.
///
/// Written exactly once per successful response. Never implicitly expires;
/// staleness is checked at read time against `expires_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord<K: TaskKind> {
    pub outcome: K::Outcome,
    pub verified_at: Timestamp,
    /// Operator whose signature validated against the task at submission time.
    pub verified_by: Address,
    /// Credential results only; project results do not age out.
    pub expires_at: Option<Timestamp>,
    pub active: bool,
}

impl<K: TaskKind> ResultRecord<K> {
    /// Active and not past its expiry at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.active && self.expires_at.map_or(true, |at| at > now)
    }
}

/// Task-creation notification observable by watchers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCreated {
    pub position: Position,
    pub task_id: TaskId,
    pub subject: Address,
    pub request_id: String,
}

/// Response-acceptance notification, published when a task completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskResponded {
    pub position: Position,
    pub task_id: TaskId,
    pub operator: Address,
}
