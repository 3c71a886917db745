// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{Task, TaskCategory, TaskKind};

/// Ordered credential tier a subject can hold.
///
/// `None` is the null level: it is never a valid requirement and is what the
/// query interface reports for subjects with no live result.
#[repr(u8)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CredentialLevel {
    #[default]
    None = 0,
    Basic = 1,
    Intermediate = 2,
    Advanced = 3,
}

impl CredentialLevel {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for CredentialLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialLevel::None => "none",
            CredentialLevel::Basic => "basic",
            CredentialLevel::Intermediate => "intermediate",
            CredentialLevel::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

/// Outcome payload of a credential verification, as signed by the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOutcome {
    /// Level actually achieved; may be below the requested level.
    pub level: CredentialLevel,
    pub score: u32,
    /// Credit amount attached to the verification.
    pub credits: U256,
    /// Stable reference to the stored evidence.
    pub proof_uri: String,
}

/// Identity-verification task category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Credential;

impl TaskKind for Credential {
    const CATEGORY: TaskCategory = TaskCategory::Credential;

    type Requirement = CredentialLevel;
    type Outcome = CredentialOutcome;
    // Latest-wins per subject.
    type ResultKey = Address;

    fn requirement_is_null(requirement: &Self::Requirement) -> bool {
        *requirement == CredentialLevel::None
    }

    fn result_key(task: &Task<Self>) -> Self::ResultKey {
        task.subject
    }

    fn result_key_for_subject(subject: Address) -> Option<Self::ResultKey> {
        Some(subject)
    }

    fn outcome_satisfies(outcome: &Self::Outcome, requirement: &Self::Requirement) -> bool {
        outcome.level >= *requirement
    }
}
