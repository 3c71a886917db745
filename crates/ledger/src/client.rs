// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, Signature};
use async_trait::async_trait;
use attestor_task::{Credential, Position, Project, Task, TaskCreated, TaskId, TaskKind};

use crate::{Ledger, LedgerError};

/// Read access to one category's ledger surface, as seen by an operator.
///
/// All methods are fallible at the transport level; the in-process deployment
/// never fails, RPC-backed implementations do.
#[async_trait]
pub trait LedgerReader<K: TaskKind>: Send + Sync + 'static {
    async fn current_position(&self) -> anyhow::Result<Position>;

    /// Verifying identity responses for this category must be scoped to.
    async fn verifying_address(&self) -> anyhow::Result<Address>;

    /// Task-creation notifications in the half-open range `(from, to]`.
    async fn created_events(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> anyhow::Result<Vec<TaskCreated>>;

    async fn task(&self, task_id: TaskId) -> anyhow::Result<Option<Task<K>>>;
}

/// Submission of signed responses for one category.
#[async_trait]
pub trait ResponseSink<K: TaskKind>: Send + Sync + 'static {
    /// The outer error is a transport failure (response may or may not have
    /// landed); the inner one is the ledger's verdict.
    async fn submit_response(
        &self,
        task_id: TaskId,
        signer: Address,
        outcome: K::Outcome,
        signature: Signature,
    ) -> anyhow::Result<Result<(), LedgerError>>;
}

/// A [`Ledger`] deployment living in this process, shared behind a mutex.
///
/// Serves as both the authoritative store and the client handle the agent
/// polls, which is exactly what the single-process daemon and the end-to-end
/// tests need.
#[derive(Clone)]
pub struct InProcessLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl InProcessLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Direct access for administration and tests. The ledger is
    /// single-writer; callers must not hold the guard across awaits.
    pub fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl LedgerReader<Credential> for InProcessLedger {
    async fn current_position(&self) -> anyhow::Result<Position> {
        Ok(self.lock().current_position())
    }

    async fn verifying_address(&self) -> anyhow::Result<Address> {
        Ok(self.lock().credential_book_address())
    }

    async fn created_events(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> anyhow::Result<Vec<TaskCreated>> {
        Ok(self
            .lock()
            .credential_tasks_created_in(from_exclusive, to_inclusive))
    }

    async fn task(&self, task_id: TaskId) -> anyhow::Result<Option<Task<Credential>>> {
        Ok(self.lock().get_credential_task(task_id).cloned())
    }
}

#[async_trait]
impl LedgerReader<Project> for InProcessLedger {
    async fn current_position(&self) -> anyhow::Result<Position> {
        Ok(self.lock().current_position())
    }

    async fn verifying_address(&self) -> anyhow::Result<Address> {
        Ok(self.lock().project_book_address())
    }

    async fn created_events(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> anyhow::Result<Vec<TaskCreated>> {
        Ok(self
            .lock()
            .project_tasks_created_in(from_exclusive, to_inclusive))
    }

    async fn task(&self, task_id: TaskId) -> anyhow::Result<Option<Task<Project>>> {
        Ok(self.lock().get_project_task(task_id).cloned())
    }
}

#[async_trait]
impl ResponseSink<Credential> for InProcessLedger {
    async fn submit_response(
        &self,
        task_id: TaskId,
        signer: Address,
        outcome: <Credential as TaskKind>::Outcome,
        signature: Signature,
    ) -> anyhow::Result<Result<(), LedgerError>> {
        Ok(self.lock().respond_to_credential_task(
            task_id,
            signer,
            outcome,
            signature.as_bytes().as_slice(),
        ))
    }
}

#[async_trait]
impl ResponseSink<Project> for InProcessLedger {
    async fn submit_response(
        &self,
        task_id: TaskId,
        signer: Address,
        outcome: <Project as TaskKind>::Outcome,
        signature: Signature,
    ) -> anyhow::Result<Result<(), LedgerError>> {
        Ok(self.lock().respond_to_project_task(
            task_id,
            signer,
            outcome,
            signature.as_bytes().as_slice(),
        ))
    }
}
