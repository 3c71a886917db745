// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashSet,
    time::{SystemTime, UNIX_EPOCH},
};

use alloy_primitives::Address;
use attestor_task::{
    Credential, CredentialLevel, CredentialOutcome, Position, Project, ProjectOutcome, ProjectSpec,
    ResultRecord, Task, TaskCategory, TaskCreated, TaskId, TaskResponded, Timestamp,
};

use crate::{book::TaskBook, LedgerError};

/// Current unix time in seconds.
pub fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Deployment parameters for a [`Ledger`] instance.
#[derive(Clone, Debug)]
pub struct LedgerSettings {
    /// Verifying identity of the credential book.
    pub credential_book: Address,
    /// Verifying identity of the project book.
    pub project_book: Address,
    /// Task age limit in positions, applied to both books at deployment.
    pub expiry_threshold: Position,
    /// Freshness window for credential results, in seconds.
    pub credential_validity: u64,
}

/// Single-writer authoritative state for both task categories.
///
/// The position advances by one before every submitted mutation, mirroring a
/// transaction being applied at a new ledger position; `advance_by` simulates
/// positions passing without any protocol activity.
#[derive(Debug)]
pub struct Ledger {
    position: Position,
    owner: Address,
    operators: HashSet<Address>,
    requesters: HashSet<Address>,
    credentials: TaskBook<Credential>,
    projects: TaskBook<Project>,
}

impl Ledger {
    pub fn new(owner: Address, settings: LedgerSettings) -> Self {
        Self {
            position: 0,
            owner,
            operators: HashSet::new(),
            requesters: HashSet::new(),
            credentials: TaskBook::new(
                settings.credential_book,
                settings.expiry_threshold,
                Some(settings.credential_validity),
            ),
            projects: TaskBook::new(settings.project_book, settings.expiry_threshold, None),
        }
    }

    pub fn current_position(&self) -> Position {
        self.position
    }

    /// Simulate `positions` empty ledger positions.
    pub fn advance_by(&mut self, positions: Position) {
        self.position += positions;
    }

    fn advance(&mut self) -> Position {
        self.position += 1;
        self.position
    }

    pub fn credential_book_address(&self) -> Address {
        self.credentials.verifying_address()
    }

    pub fn project_book_address(&self) -> Address {
        self.projects.verifying_address()
    }

    // ---- task creation ----------------------------------------------------

    pub fn create_credential_task(
        &mut self,
        requester: Address,
        subject: Address,
        required_level: CredentialLevel,
        request_id: impl Into<String>,
    ) -> Result<TaskId, LedgerError> {
        self.ensure_requester(requester)?;
        let position = self.advance();
        self.credentials
            .create(position, unix_now(), subject, required_level, request_id.into())
    }

    pub fn create_project_task(
        &mut self,
        requester: Address,
        subject: Address,
        spec: ProjectSpec,
        request_id: impl Into<String>,
    ) -> Result<TaskId, LedgerError> {
        self.ensure_requester(requester)?;
        let position = self.advance();
        self.projects
            .create(position, unix_now(), subject, spec, request_id.into())
    }

    // ---- response submission ----------------------------------------------

    pub fn respond_to_credential_task(
        &mut self,
        task_id: TaskId,
        signer: Address,
        outcome: CredentialOutcome,
        signature: &[u8],
    ) -> Result<(), LedgerError> {
        let position = self.advance();
        self.credentials.respond(
            position,
            unix_now(),
            &self.operators,
            task_id,
            signer,
            outcome,
            signature,
        )
    }

    pub fn respond_to_project_task(
        &mut self,
        task_id: TaskId,
        signer: Address,
        outcome: ProjectOutcome,
        signature: &[u8],
    ) -> Result<(), LedgerError> {
        let position = self.advance();
        self.projects.respond(
            position,
            unix_now(),
            &self.operators,
            task_id,
            signer,
            outcome,
            signature,
        )
    }

    // ---- task reads --------------------------------------------------------

    pub fn get_credential_task(&self, task_id: TaskId) -> Option<&Task<Credential>> {
        self.credentials.task(task_id)
    }

    pub fn get_project_task(&self, task_id: TaskId) -> Option<&Task<Project>> {
        self.projects.task(task_id)
    }

    pub fn credential_tasks_created_in(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> Vec<TaskCreated> {
        self.credentials.created_in_range(from_exclusive, to_inclusive)
    }

    pub fn project_tasks_created_in(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> Vec<TaskCreated> {
        self.projects.created_in_range(from_exclusive, to_inclusive)
    }

    pub fn credential_responses_in(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> Vec<TaskResponded> {
        self.credentials
            .responded_in_range(from_exclusive, to_inclusive)
    }

    pub fn project_responses_in(
        &self,
        from_exclusive: Position,
        to_inclusive: Position,
    ) -> Vec<TaskResponded> {
        self.projects.responded_in_range(from_exclusive, to_inclusive)
    }

    // ---- result queries (no side effects) ----------------------------------

    pub fn is_operator(&self, address: Address) -> bool {
        self.operators.contains(&address)
    }

    pub fn has_valid_credential(&self, subject: Address, minimum: CredentialLevel) -> bool {
        self.has_valid_credential_at(subject, minimum, unix_now())
    }

    pub fn has_valid_credential_at(
        &self,
        subject: Address,
        minimum: CredentialLevel,
        now: Timestamp,
    ) -> bool {
        self.credentials
            .result(&subject)
            .is_some_and(|record| record.is_live(now) && record.outcome.level >= minimum)
    }

    /// The subject's live credential level; the null level when the record is
    /// missing, revoked, or stale.
    pub fn credential_level(&self, subject: Address) -> CredentialLevel {
        self.credential_level_at(subject, unix_now())
    }

    pub fn credential_level_at(&self, subject: Address, now: Timestamp) -> CredentialLevel {
        self.credentials
            .result(&subject)
            .filter(|record| record.is_live(now))
            .map(|record| record.outcome.level)
            .unwrap_or_default()
    }

    pub fn get_credential(&self, subject: Address) -> Option<&ResultRecord<Credential>> {
        self.credentials.result(&subject)
    }

    pub fn get_project_result(&self, task_id: TaskId) -> Option<&ResultRecord<Project>> {
        self.projects.result(&task_id)
    }

    // ---- administrative surface (owner-gated policy, not core protocol) ----

    pub fn register_operator(
        &mut self,
        caller: Address,
        operator: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.operators.insert(operator);
        Ok(())
    }

    pub fn deregister_operator(
        &mut self,
        caller: Address,
        operator: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.operators.remove(&operator);
        Ok(())
    }

    pub fn authorize_requester(
        &mut self,
        caller: Address,
        requester: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.requesters.insert(requester);
        Ok(())
    }

    pub fn revoke_requester(
        &mut self,
        caller: Address,
        requester: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        self.requesters.remove(&requester);
        Ok(())
    }

    pub fn set_expiry_threshold(
        &mut self,
        caller: Address,
        category: TaskCategory,
        positions: Position,
    ) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        match category {
            TaskCategory::Credential => self.credentials.set_expiry_threshold(positions),
            TaskCategory::Project => self.projects.set_expiry_threshold(positions),
        }
        Ok(())
    }

    /// Mark a subject's credential inactive. Returns whether a live record
    /// was deactivated.
    pub fn revoke_credential(
        &mut self,
        caller: Address,
        subject: Address,
    ) -> Result<bool, LedgerError> {
        self.ensure_owner(caller)?;
        Ok(self.credentials.revoke(subject))
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::NotAuthorized { caller });
        }
        Ok(())
    }

    fn ensure_requester(&self, requester: Address) -> Result<(), LedgerError> {
        if !self.requesters.contains(&requester) {
            return Err(LedgerError::NotAuthorized { caller: requester });
        }
        Ok(())
    }
}
