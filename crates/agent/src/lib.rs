// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

//! # Attestor agent
//!
//! The operator-side daemon of the verification protocol. It watches the
//! ledger for newly created tasks, evaluates them through the decision
//! function, and submits signed responses. One independent scan loop runs per
//! task category, with the ledger state machine as the source of truth for
//! exactly-once acceptance.

pub mod agent;
pub mod cli;
pub mod decision;
pub mod metrics;
pub mod proofs;
pub mod scanner;
