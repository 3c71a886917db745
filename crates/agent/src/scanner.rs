// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! Per-category task scanning: discover creation events behind a cursor,
//! deduplicate, decide, sign, submit.

use std::{collections::HashSet, sync::Arc, time::Duration};

use alloy_primitives::Address;
use async_trait::async_trait;
use attestor_attestation::{Attestable, AttestationSigner};
use attestor_ledger::{LedgerReader, ResponseSink};
use attestor_task::{Position, Task, TaskCreated, TaskId, TaskKind};
use attestor_watcher::PollCycle;

use crate::{
    decision::{Decide, DecisionError, WithProof},
    metrics,
    proofs::ProofStore,
};

/// Upper bound on one task's decide/prove/sign/submit pipeline, so a hung
/// collaborator cannot stall the whole scan loop.
const TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Task ids this watcher instance has already picked up.
///
/// A liveness cache, not a correctness guarantee: it prevents redundant
/// submission attempts within one process lifetime and is deliberately not
/// persisted. Exactly-once acceptance comes from the ledger rejecting
/// anything but the first valid response.
#[derive(Debug, Default)]
pub struct ProcessedTasks {
    seen: HashSet<TaskId>,
}

impl ProcessedTasks {
    /// Mark the task as handled. Returns false if it already was.
    pub fn mark(&mut self, task_id: TaskId) -> bool {
        self.seen.insert(task_id)
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.seen.contains(&task_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// One category's scan loop state. Owned by exactly one poller task; the
/// cursor and processed-set are never shared across categories.
pub struct TaskScanner<K, L>
where
    K: TaskKind,
    L: LedgerReader<K> + ResponseSink<K>,
{
    ledger: Arc<L>,
    signer: AttestationSigner,
    decider: Arc<dyn Decide<K>>,
    proofs: Arc<dyn ProofStore>,
    /// Verifying identity of this category's book, baked into every message.
    verifier: Address,
    /// Last ledger position already covered by a completed events query.
    cursor: Position,
    max_scan_window: u64,
    processed: ProcessedTasks,
}

impl<K, L> TaskScanner<K, L>
where
    K: TaskKind,
    K::Outcome: Attestable + WithProof,
    L: LedgerReader<K> + ResponseSink<K>,
{
    /// Set up a scanner starting at the ledger's current position. Tasks
    /// created before startup are not retroactively processed.
    pub async fn initialize(
        ledger: Arc<L>,
        signer: AttestationSigner,
        decider: Arc<dyn Decide<K>>,
        proofs: Arc<dyn ProofStore>,
        max_scan_window: u64,
    ) -> anyhow::Result<Self> {
        let cursor = ledger.current_position().await?;
        let verifier = ledger.verifying_address().await?;
        tracing::info!(
            category = %K::CATEGORY,
            start_position = cursor,
            %verifier,
            "task scanner initialized"
        );
        Ok(Self {
            ledger,
            signer,
            decider,
            proofs,
            verifier,
            cursor,
            max_scan_window,
            processed: ProcessedTasks::default(),
        })
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn processed(&self) -> &ProcessedTasks {
        &self.processed
    }

    /// One poll cycle over the range `(cursor, min(head, cursor + window)]`.
    ///
    /// The cursor only moves after the events query for that range completed,
    /// so a failed query is retried wholesale next tick and no range is ever
    /// skipped. A large gap is worked off across multiple cycles.
    pub async fn scan_once(&mut self) -> anyhow::Result<()> {
        let head = self.ledger.current_position().await?;
        if head <= self.cursor {
            return Ok(());
        }
        let to = head.min(self.cursor + self.max_scan_window);

        let events = self.ledger.created_events(self.cursor, to).await?;
        if !events.is_empty() {
            tracing::debug!(
                category = %K::CATEGORY,
                from = self.cursor,
                to,
                count = events.len(),
                "observed new tasks"
            );
        }

        for event in events {
            // Mark before attempting submission so a second discovery of the
            // same id can never double-submit.
            if !self.processed.mark(event.task_id) {
                continue;
            }
            metrics::TASKS_OBSERVED
                .with_label_values(&[K::CATEGORY.as_str()])
                .inc();
            if tokio::time::timeout(TASK_TIMEOUT, self.handle_task(&event))
                .await
                .is_err()
            {
                tracing::warn!(
                    category = %K::CATEGORY,
                    task_id = event.task_id,
                    "task processing timed out, task stays marked processed"
                );
                metrics::RESPONSES_FAILED
                    .with_label_values(&[K::CATEGORY.as_str()])
                    .inc();
            }
        }

        self.cursor = to;
        Ok(())
    }

    /// Process one newly observed task. Every failure mode here is terminal
    /// for the attempt: it is logged, the task stays marked processed, and
    /// nothing is retried.
    async fn handle_task(&self, event: &TaskCreated) {
        let category = K::CATEGORY.as_str();
        let task_id = event.task_id;

        let task: Task<K> = match self.ledger.task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::warn!(category, task_id, "creation event for an unknown task");
                return;
            }
            Err(err) => {
                tracing::warn!(category, task_id, error = %err, "failed to load task");
                return;
            }
        };
        if task.status.is_terminal() {
            // Somebody (possibly a previous incarnation of this process)
            // already settled it.
            tracing::debug!(category, task_id, status = %task.status, "task already settled");
            return;
        }

        let verdict = match self.decider.decide(&task).await {
            Ok(verdict) => verdict,
            Err(DecisionError::Declined { reason }) => {
                tracing::info!(category, task_id, %reason, "decision declined, not responding");
                metrics::DECISIONS_DECLINED.with_label_values(&[category]).inc();
                return;
            }
            Err(DecisionError::Failed(err)) => {
                tracing::error!(category, task_id, error = %err, "decision function failed");
                return;
            }
        };

        let proof_uri = match self.proofs.store(&verdict.evidence).await {
            Ok(uri) => uri,
            Err(err) => {
                tracing::error!(
                    category,
                    task_id,
                    error = %err,
                    "proof storage failed, task left without a response"
                );
                return;
            }
        };
        let outcome = verdict.draft.with_proof_uri(proof_uri);

        let signature =
            match self
                .signer
                .sign_response(task_id, task.subject, &outcome, self.verifier)
            {
                Ok(signature) => signature,
                Err(err) => {
                    tracing::error!(category, task_id, error = %err, "failed to sign response");
                    return;
                }
            };

        match self
            .ledger
            .submit_response(task_id, self.signer.address(), outcome, signature)
            .await
        {
            Ok(Ok(())) => {
                tracing::info!(category, task_id, "response accepted");
                metrics::RESPONSES_ACCEPTED.with_label_values(&[category]).inc();
            }
            Ok(Err(rejection)) => {
                tracing::warn!(category, task_id, error = %rejection, "response rejected, not retrying");
                metrics::RESPONSES_FAILED.with_label_values(&[category]).inc();
            }
            Err(err) => {
                tracing::warn!(category, task_id, error = %err, "submission failed in transport, not retrying");
                metrics::RESPONSES_FAILED.with_label_values(&[category]).inc();
            }
        }
    }
}

#[async_trait]
impl<K, L> PollCycle for TaskScanner<K, L>
where
    K: TaskKind,
    K::Outcome: Attestable + WithProof,
    L: LedgerReader<K> + ResponseSink<K>,
{
    async fn cycle(&mut self) -> anyhow::Result<()> {
        self.scan_once().await
    }
}
