// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::Address;
use attestor_task::{Position, TaskId, TaskStatus};
use thiserror::Error;

/// Structural and validation failures surfaced synchronously by the task
/// state machine.
///
/// None of these leave partial state behind, with one deliberate exception:
/// [`LedgerError::TaskExpired`] persists the `Expired` transition before the
/// call fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("task {task_id} does not exist")]
    TaskNotFound { task_id: TaskId },

    #[error("task {task_id} is {status}, not pending")]
    TaskNotPending { task_id: TaskId, status: TaskStatus },

    #[error("task {task_id} expired: {age} positions old, threshold is {threshold}")]
    TaskExpired {
        task_id: TaskId,
        age: Position,
        threshold: Position,
    },

    /// The submitted signature is malformed or does not recover to the
    /// claimed signer over the canonical message.
    #[error("signature does not validate for signer {claimed}")]
    InvalidSignature { claimed: Address },

    #[error("{address} is not a registered operator")]
    NotOperator { address: Address },

    #[error("requirement is the null level")]
    InvalidRequirement,

    #[error("subject {subject} already holds a live result meeting the requirement")]
    AlreadySatisfied { subject: Address },

    #[error("{caller} is not authorized for this call")]
    NotAuthorized { caller: Address },
}
