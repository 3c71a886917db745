// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashSet};

use alloy_primitives::Address;
use attestor_attestation::{recover_response_signer, Attestable};
use attestor_task::{
    Position, ResultRecord, Task, TaskCreated, TaskId, TaskKind, TaskResponded, TaskStatus,
    Timestamp,
};

use crate::LedgerError;

/// Task and result state for one task category.
///
/// Both categories share this state machine; a [`TaskKind`] supplies the
/// requirement/outcome types and the result keying rule. Task ids start at 1
/// and are never reused; tasks and creation events are append-only.
#[derive(Debug)]
pub struct TaskBook<K: TaskKind> {
    /// Deployment identity the canonical response message is scoped to.
    verifying_address: Address,
    /// Maximum task age, in positions, before a response is too late.
    expiry_threshold: Position,
    /// How long committed results stay fresh. `None` means they never age out.
    result_validity: Option<u64>,
    next_task_id: TaskId,
    tasks: BTreeMap<TaskId, Task<K>>,
    created: Vec<TaskCreated>,
    responded: Vec<TaskResponded>,
    results: BTreeMap<K::ResultKey, ResultRecord<K>>,
}

impl<K: TaskKind> TaskBook<K> {
    pub fn new(
        verifying_address: Address,
        expiry_threshold: Position,
        result_validity: Option<u64>,
    ) -> Self {
        Self {
            verifying_address,
            expiry_threshold,
            result_validity,
            next_task_id: 1,
            tasks: BTreeMap::new(),
            created: Vec::new(),
            responded: Vec::new(),
            results: BTreeMap::new(),
        }
    }

    pub fn verifying_address(&self) -> Address {
        self.verifying_address
    }

    pub fn expiry_threshold(&self) -> Position {
        self.expiry_threshold
    }

    pub fn set_expiry_threshold(&mut self, positions: Position) {
        self.expiry_threshold = positions;
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task<K>> {
        self.tasks.get(&task_id)
    }

    pub fn result(&self, key: &K::ResultKey) -> Option<&ResultRecord<K>> {
        self.results.get(key)
    }

    /// Creation events in the half-open position range `(from, to]`.
    pub fn created_in_range(&self, from_exclusive: Position, to_inclusive: Position) -> Vec<TaskCreated> {
        self.created
            .iter()
            .filter(|event| event.position > from_exclusive && event.position <= to_inclusive)
            .cloned()
            .collect()
    }

    /// Response events in the half-open position range `(from, to]`.
    pub fn responded_in_range(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> Vec<TaskResponded> {
        self.responded
            .iter()
            .filter(|event| event.position > from_exclusive && event.position <= to_inclusive)
            .cloned()
            .collect()
    }

    /// Record a new pending task at `position`.
    pub fn create(
        &mut self,
        position: Position,
        now: Timestamp,
        subject: Address,
        requirement: K::Requirement,
        request_id: String,
    ) -> Result<TaskId, LedgerError> {
        if K::requirement_is_null(&requirement) {
            return Err(LedgerError::InvalidRequirement);
        }
        if let Some(key) = K::result_key_for_subject(subject) {
            if let Some(existing) = self.results.get(&key) {
                if existing.is_live(now) && K::outcome_satisfies(&existing.outcome, &requirement) {
                    return Err(LedgerError::AlreadySatisfied { subject });
                }
            }
        }

        let id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.insert(
            id,
            Task {
                id,
                subject,
                requirement,
                created_at: position,
                status: TaskStatus::Pending,
                request_id: request_id.clone(),
            },
        );
        self.created.push(TaskCreated {
            position,
            task_id: id,
            subject,
            request_id,
        });
        tracing::debug!(
            category = %K::CATEGORY,
            task_id = id,
            %subject,
            position,
            "task created"
        );
        Ok(id)
    }

    /// Validate and commit an operator response at `position`.
    ///
    /// Checks run in a fixed order: existence, pending status, lazy expiry
    /// (the `Expired` transition is persisted even though the call fails),
    /// signature recovery over the canonical message, operator registration.
    /// On success the task completes and the result record is written:
    /// overwriting for subject-keyed categories, inserting for per-task ones.
    pub fn respond(
        &mut self,
        position: Position,
        now: Timestamp,
        operators: &HashSet<Address>,
        task_id: TaskId,
        signer: Address,
        outcome: K::Outcome,
        signature: &[u8],
    ) -> Result<(), LedgerError>
    where
        K::Outcome: Attestable,
    {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(LedgerError::TaskNotFound { task_id })?;
        if !task.status.is_pending() {
            return Err(LedgerError::TaskNotPending {
                task_id,
                status: task.status,
            });
        }

        let age = position.saturating_sub(task.created_at);
        if age > self.expiry_threshold {
            // Expiry is discovered lazily, on the first late response
            // attempt. The transition sticks even though the call fails.
            task.status = TaskStatus::Expired;
            tracing::debug!(category = %K::CATEGORY, task_id, age, "task expired");
            return Err(LedgerError::TaskExpired {
                task_id,
                age,
                threshold: self.expiry_threshold,
            });
        }

        let recovered = recover_response_signer(
            task_id,
            task.subject,
            &outcome,
            self.verifying_address,
            signature,
        )
        .map_err(|err| {
            tracing::debug!(category = %K::CATEGORY, task_id, error = %err, "signature rejected");
            LedgerError::InvalidSignature { claimed: signer }
        })?;
        if recovered != signer {
            return Err(LedgerError::InvalidSignature { claimed: signer });
        }
        if !operators.contains(&signer) {
            return Err(LedgerError::NotOperator { address: signer });
        }

        task.status = TaskStatus::Completed;
        let key = K::result_key(task);
        self.results.insert(
            key,
            ResultRecord {
                outcome,
                verified_at: now,
                verified_by: signer,
                expires_at: self.result_validity.map(|validity| now + validity),
                active: true,
            },
        );
        self.responded.push(TaskResponded {
            position,
            task_id,
            operator: signer,
        });
        tracing::debug!(category = %K::CATEGORY, task_id, %signer, "response committed");
        Ok(())
    }

    /// Mark a subject's standing result inactive. Returns whether a record
    /// was deactivated. No-op for per-task categories.
    pub fn revoke(&mut self, subject: Address) -> bool {
        let Some(key) = K::result_key_for_subject(subject) else {
            return false;
        };
        match self.results.get_mut(&key) {
            Some(record) if record.active => {
                record.active = false;
                true
            }
            _ => false,
        }
    }
}
