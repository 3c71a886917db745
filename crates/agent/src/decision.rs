// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! The decision-function collaborator boundary.
//!
//! The real judgment of whether an identity or a project actually checks out
//! lives outside this system. [`AutoApprover`] is the deterministic stand-in
//! used by the daemon and the tests.

use alloy_primitives::U256;
use async_trait::async_trait;
use attestor_task::{Credential, CredentialOutcome, Project, ProjectOutcome, Task, TaskKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    /// The decision function refuses to approve. The watcher submits nothing
    /// and records the task as processed.
    #[error("verification declined: {reason}")]
    Declined { reason: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Judgment for one task: a draft outcome (proof reference still unset) plus
/// the raw evidence backing it.
#[derive(Clone, Debug)]
pub struct Verdict<K: TaskKind> {
    pub draft: K::Outcome,
    pub evidence: Vec<u8>,
}

#[async_trait]
pub trait Decide<K: TaskKind>: Send + Sync + 'static {
    async fn decide(&self, task: &Task<K>) -> Result<Verdict<K>, DecisionError>;
}

/// Attach the stored proof reference to a draft outcome.
pub trait WithProof {
    fn with_proof_uri(self, proof_uri: String) -> Self;
}

impl WithProof for CredentialOutcome {
    fn with_proof_uri(mut self, proof_uri: String) -> Self {
        self.proof_uri = proof_uri;
        self
    }
}

impl WithProof for ProjectOutcome {
    fn with_proof_uri(mut self, proof_uri: String) -> Self {
        self.proof_uri = proof_uri;
        self
    }
}

/// Deterministic mock judgment: approves at exactly the requested level with
/// a score and credit amount derived from the task id.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoApprover;

#[async_trait]
impl Decide<Credential> for AutoApprover {
    async fn decide(&self, task: &Task<Credential>) -> Result<Verdict<Credential>, DecisionError> {
        let level = task.requirement;
        let score = 70 + (task.id % 30) as u32;
        let evidence = serde_json::to_vec(&serde_json::json!({
            "category": "credential",
            "task": task.id,
            "subject": task.subject.to_string(),
            "achieved_level": level.to_string(),
            "score": score,
        }))
        .map_err(|e| DecisionError::Failed(e.into()))?;

        Ok(Verdict {
            draft: CredentialOutcome {
                level,
                score,
                credits: U256::from(u64::from(level.as_u8()) * 1_000),
                proof_uri: String::new(),
            },
            evidence,
        })
    }
}

#[async_trait]
impl Decide<Project> for AutoApprover {
    async fn decide(&self, task: &Task<Project>) -> Result<Verdict<Project>, DecisionError> {
        let score = 70 + (task.id % 30) as u32;
        let credits = U256::from(1_000 + (task.id * 13) % 9_000);
        let evidence = serde_json::to_vec(&serde_json::json!({
            "category": "project",
            "task": task.id,
            "subject": task.subject.to_string(),
            "project_category": task.requirement.category,
            "metadata": task.requirement.metadata,
            "score": score,
        }))
        .map_err(|e| DecisionError::Failed(e.into()))?;

        Ok(Verdict {
            draft: ProjectOutcome {
                approved: true,
                score,
                credits,
                proof_uri: String::new(),
            },
            evidence,
        })
    }
}
