//! `engine` crate — workflow graph model, diff operations, validation,
//! autofix, and the service that runs them against a remote store.

pub mod autofix;
pub mod diff;
pub mod error;
pub mod expression;
pub mod models;
pub mod operations;
pub mod service;
pub mod validation;

pub use autofix::{Confidence, FixOptions, FixType};
pub use diff::{apply_operations, FailurePolicy};
pub use error::EngineError;
pub use models::{ConnectionTarget, Node, WorkflowGraph};
pub use operations::DiffOperation;
pub use service::{PartialUpdateReport, PartialUpdateRequest, WorkflowService};
pub use validation::{validate_workflow, ValidationOptions, ValidationProfile, ValidationReport};

#[cfg(test)]
mod service_tests;
