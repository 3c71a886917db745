// Copyright 2023-, Edge & Node, GraphOps, and Semiotic Labs.
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{Task, TaskCategory, TaskId, TaskKind};

/// What an asset/project verification task must establish.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Project class, e.g. "reforestation" or "solar".
    pub category: String,
    /// Free-form descriptive payload forwarded to the decision function.
    pub metadata: String,
}

/// Outcome payload of a project verification, as signed by the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectOutcome {
    pub approved: bool,
    pub score: u32,
    /// Verified credit amount issued for the project.
    pub credits: U256,
    /// Stable reference to the stored evidence.
    pub proof_uri: String,
}

/// Asset/project-verification task category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Project;

impl TaskKind for Project {
    const CATEGORY: TaskCategory = TaskCategory::Project;

    type Requirement = ProjectSpec;
    type Outcome = ProjectOutcome;
    // One result per task.
    type ResultKey = TaskId;

    fn requirement_is_null(requirement: &Self::Requirement) -> bool {
        requirement.category.trim().is_empty()
    }

    fn result_key(task: &Task<Self>) -> Self::ResultKey {
        task.id
    }
}
