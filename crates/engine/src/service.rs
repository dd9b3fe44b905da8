//! Request-scoped orchestration of the engine against a remote store.
//!
//! `WorkflowService` is what the tool surface calls:
//! 1. Fetches a fresh snapshot of the workflow from the [`WorkflowStore`].
//! 2. Runs the operation, validation or autofix engine on a local copy.
//! 3. Writes the complete mutated document back, at most once, and only
//!    when something changed and the caller did not ask for a preview.
//!
//! Nothing is cached between calls and nothing is locked: a write replaces
//! whatever the remote holds at that moment.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use remote::WorkflowStore;

use crate::autofix::{autofix, FixOptions, FixSummary};
use crate::diff::{apply_operations, AppliedOperation, DiffOutcome, FailedOperation, FailurePolicy};
use crate::models::WorkflowGraph;
use crate::validation::{validate_workflow, ValidationOptions, ValidationReport};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// Input of the partial-update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUpdateRequest {
    /// Raw diff operations, parsed one at a time.
    pub operations: Vec<Value>,
    #[serde(default)]
    pub validate_only: bool,
    #[serde(default)]
    pub continue_on_error: bool,
}

impl PartialUpdateRequest {
    pub fn policy(&self) -> FailurePolicy {
        FailurePolicy::from_continue_on_error(self.continue_on_error)
    }
}

/// Output of the partial-update tool.
///
/// Counts are reported as `applied`/`failed`, or as `wouldApply`/`wouldFail`
/// for a validate-only run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUpdateReport {
    pub workflow_id: String,
    pub validate_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_apply: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_fail: Option<usize>,
    pub operations: Vec<AppliedOperation>,
    pub failures: Vec<FailedOperation>,
    pub rolled_back: bool,
    pub persisted: bool,
    pub message: String,
}

impl PartialUpdateReport {
    pub fn from_outcome(workflow_id: &str, outcome: &DiffOutcome, validate_only: bool, persisted: bool) -> Self {
        let applied = outcome.applied.len();
        let failed = outcome.failed.len();

        let message = if validate_only {
            format!("Validation only: {applied} operation(s) would apply, {failed} would fail")
        } else if outcome.rolled_back {
            format!(
                "Operation {} failed; batch rolled back and nothing was saved",
                outcome.failed.first().map_or(0, |f| f.index)
            )
        } else if persisted {
            format!("Applied {applied} operation(s), {failed} failed; workflow saved")
        } else {
            format!("Applied {applied} operation(s), {failed} failed; nothing to save")
        };

        let (counts, would) = if validate_only {
            ((None, None), (Some(applied), Some(failed)))
        } else {
            ((Some(applied), Some(failed)), (None, None))
        };

        Self {
            workflow_id: workflow_id.to_owned(),
            validate_only,
            applied: counts.0,
            failed: counts.1,
            would_apply: would.0,
            would_fail: would.1,
            operations: outcome.applied.clone(),
            failures: outcome.failed.clone(),
            rolled_back: outcome.rolled_back,
            persisted,
            message,
        }
    }
}

/// Output of the autofix tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofixReport {
    pub workflow_id: String,
    pub apply_fixes: bool,
    #[serde(flatten)]
    pub summary: FixSummary,
    pub persisted: bool,
}

// ---------------------------------------------------------------------------
// WorkflowService
// ---------------------------------------------------------------------------

/// Stateless entry point for the three workflow tools.
///
/// Holds only the injected store; construct one per process and share it.
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for pass-through calls.
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Apply a batch of diff operations to workflow `id`.
    ///
    /// # Errors
    /// Only transport and decode failures; per-operation failures are part
    /// of the report.
    #[instrument(skip(self, request), fields(workflow_id = %id, operations = request.operations.len()))]
    pub async fn apply_partial_update(
        &self,
        id: &str,
        request: &PartialUpdateRequest,
    ) -> Result<PartialUpdateReport, EngineError> {
        let graph = self.load(id).await?;
        let outcome = apply_operations(&graph, &request.operations, request.policy());

        if !outcome.failed.is_empty() {
            warn!(
                "{} of {} operation(s) failed (policy={:?})",
                outcome.failed.len(),
                request.operations.len(),
                request.policy()
            );
        }

        let persist = !request.validate_only && outcome.is_committable();
        if persist {
            self.save(id, &outcome.workflow).await?;
        }

        info!(
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            persisted = persist,
            "partial update finished"
        );
        Ok(PartialUpdateReport::from_outcome(id, &outcome, request.validate_only, persist))
    }

    /// Validate workflow `id` without modifying it.
    #[instrument(skip(self, options), fields(workflow_id = %id, profile = ?options.profile))]
    pub async fn validate_workflow(
        &self,
        id: &str,
        options: &ValidationOptions,
    ) -> Result<ValidationReport, EngineError> {
        let graph = self.load(id).await?;
        let report = validate_workflow(&graph, options);
        info!(
            valid = report.valid,
            errors = report.summary.error_count,
            warnings = report.summary.warning_count,
            "validation finished"
        );
        Ok(report)
    }

    /// Detect (and optionally repair) known defects in workflow `id`.
    #[instrument(skip(self, options), fields(workflow_id = %id, apply = options.apply_fixes))]
    pub async fn autofix_workflow(&self, id: &str, options: &FixOptions) -> Result<AutofixReport, EngineError> {
        let mut graph = self.load(id).await?;
        let summary = autofix(&mut graph, options);

        let persist = options.apply_fixes && summary.fixes_applied > 0;
        if persist {
            self.save(id, &graph).await?;
        }

        info!(
            found = summary.fixes_found,
            applied = summary.fixes_applied,
            persisted = persist,
            "autofix finished"
        );
        Ok(AutofixReport {
            workflow_id: id.to_owned(),
            apply_fixes: options.apply_fixes,
            summary,
            persisted: persist,
        })
    }

    // -----------------------------------------------------------------------
    // Internal: snapshot in, whole document out.
    // -----------------------------------------------------------------------

    async fn load(&self, id: &str) -> Result<WorkflowGraph, EngineError> {
        let document = self.store.fetch_workflow(id).await?;
        serde_json::from_value(document).map_err(|source| EngineError::Decode {
            id: id.to_owned(),
            source,
        })
    }

    async fn save(&self, id: &str, graph: &WorkflowGraph) -> Result<(), EngineError> {
        let document = serde_json::to_value(graph).map_err(|source| EngineError::Encode {
            id: id.to_owned(),
            source,
        })?;
        self.store.replace_workflow(id, document).await?;
        info!("workflow '{}' written back", id);
        Ok(())
    }
}
