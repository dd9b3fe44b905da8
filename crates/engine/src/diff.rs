//! Batch application of diff operations.
//!
//! Operations run in order against one working copy of the graph:
//! 1. Each raw operation is parsed; a parse failure is a failed record.
//! 2. Parsed operations are applied; a lookup failure is a failed record.
//! 3. Under [`FailurePolicy::Atomic`] the first failure stops the batch and
//!    discards the working copy. Under [`FailurePolicy::ContinueOnError`]
//!    every operation is attempted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::WorkflowGraph;
use crate::operations::{raw_kind, DiffOperation};

/// What happens to the rest of a batch after an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Stop at the first failure and persist nothing from this batch.
    #[default]
    Atomic,
    /// Attempt every operation; keep whatever succeeded.
    ContinueOnError,
}

impl FailurePolicy {
    pub fn from_continue_on_error(continue_on_error: bool) -> Self {
        if continue_on_error {
            Self::ContinueOnError
        } else {
            Self::Atomic
        }
    }
}

/// Record of an operation that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedOperation {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Record of an operation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedOperation {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub error: String,
}

/// Result of running a batch.
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// The mutated graph, or the untouched input when the batch rolled back.
    pub workflow: WorkflowGraph,
    pub applied: Vec<AppliedOperation>,
    pub failed: Vec<FailedOperation>,
    /// Set when an atomic batch hit a failure and its mutations were discarded.
    pub rolled_back: bool,
}

impl DiffOutcome {
    /// Whether `workflow` differs from the input in a way worth writing back.
    pub fn is_committable(&self) -> bool {
        !self.applied.is_empty() && !self.rolled_back
    }
}

/// Apply `operations` to a copy of `graph` under `policy`.
///
/// `graph` itself is never modified.
pub fn apply_operations(graph: &WorkflowGraph, operations: &[Value], policy: FailurePolicy) -> DiffOutcome {
    let mut working = graph.clone();
    let mut applied = Vec::new();
    let mut failed = Vec::new();

    for (index, raw) in operations.iter().enumerate() {
        let result = DiffOperation::from_value(raw).and_then(|op| op.apply(&mut working).map(|effect| (op, effect)));

        match result {
            Ok((op, effect)) => {
                debug!(index, kind = op.kind(), "operation applied");
                applied.push(AppliedOperation {
                    index,
                    kind: op.kind().to_owned(),
                    node_name: effect.node_name,
                    description: effect.description,
                });
            }
            Err(err) => {
                let kind = raw_kind(raw).unwrap_or("unknown").to_owned();
                debug!(index, %kind, error = %err, "operation failed");
                failed.push(FailedOperation {
                    index,
                    kind,
                    error: err.to_string(),
                });
                if policy == FailurePolicy::Atomic {
                    break;
                }
            }
        }
    }

    let rolled_back = policy == FailurePolicy::Atomic && !failed.is_empty();
    DiffOutcome {
        workflow: if rolled_back { graph.clone() } else { working },
        applied,
        failed,
        rolled_back,
    }
}
