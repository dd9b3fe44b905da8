//! Workflow validation, run before persisting or activating a workflow.
//!
//! Checks, each independently togglable:
//! 1. Nodes: required `id`/`name`/`type`, unique ids and names, and a
//!    two-element `position`.
//! 2. Connections: every source and target name refers to an existing node.
//! 3. Expressions: `{{ }}` expressions in parameters carry the marker.
//!
//! Validation never fails; it returns a report. It is pure, so running it
//! twice on the same graph yields identical reports.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::scan_parameters;
use crate::models::WorkflowGraph;

/// How much the validator reports beyond hard structural errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationProfile {
    /// Errors only.
    Minimal,
    /// Structural errors and position warnings; expressions are only counted.
    #[default]
    Runtime,
    /// Runtime plus unmarked-expression and connectivity warnings.
    AiFriendly,
    /// AiFriendly, with unmarked expressions raised to errors.
    Strict,
}

impl ValidationProfile {
    fn reports_position(self) -> bool {
        self != Self::Minimal
    }

    fn reports_topology(self) -> bool {
        matches!(self, Self::AiFriendly | Self::Strict)
    }
}

/// Which checks to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    pub validate_nodes: bool,
    pub validate_connections: bool,
    pub validate_expressions: bool,
    pub profile: ValidationProfile,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_nodes: true,
            validate_connections: true,
            validate_expressions: true,
            profile: ValidationProfile::default(),
        }
    }
}

/// One error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    /// `"<source> -> <target>"` for connection issues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn node(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: Some(node.into()),
            connection: None,
            message: message.into(),
        }
    }

    fn connection(connection: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: None,
            connection: Some(connection.into()),
            message: message.into(),
        }
    }

    fn workflow(message: impl Into<String>) -> Self {
        Self {
            node: None,
            connection: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_nodes: usize,
    pub enabled_nodes: usize,
    pub trigger_nodes: usize,
    pub expressions_checked: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff `errors` is empty.
    pub valid: bool,
    pub summary: ValidationSummary,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    expressions_checked: usize,
}

/// Validate `graph` with the checks selected in `options`.
pub fn validate_workflow(graph: &WorkflowGraph, options: &ValidationOptions) -> ValidationReport {
    let mut findings = Findings::default();

    if options.validate_nodes {
        check_nodes(graph, options.profile, &mut findings);
    }
    if options.validate_connections {
        check_connections(graph, options.profile, &mut findings);
    }
    if options.validate_expressions {
        check_expressions(graph, options.profile, &mut findings);
    }

    let summary = ValidationSummary {
        total_nodes: graph.nodes.len(),
        enabled_nodes: graph.enabled_count(),
        trigger_nodes: graph.trigger_count(),
        expressions_checked: findings.expressions_checked,
        error_count: findings.errors.len(),
        warning_count: findings.warnings.len(),
    };

    ValidationReport {
        valid: findings.errors.is_empty(),
        summary,
        errors: findings.errors,
        warnings: findings.warnings,
    }
}

// -----------------------------------------------------------------------
// Node check
// -----------------------------------------------------------------------

fn check_nodes(graph: &WorkflowGraph, profile: ValidationProfile, findings: &mut Findings) {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut seen_names: HashSet<&str> = HashSet::new();

    for (index, node) in graph.nodes.iter().enumerate() {
        let label = node.label(index);

        if node.id.is_empty() {
            findings.errors.push(ValidationIssue::node(&label, "Node is missing required field 'id'"));
        } else if !seen_ids.insert(node.id.as_str()) {
            findings
                .errors
                .push(ValidationIssue::node(&label, format!("Duplicate node id '{}'", node.id)));
        }

        if node.name.is_empty() {
            findings.errors.push(ValidationIssue::node(&label, "Node is missing required field 'name'"));
        } else if !seen_names.insert(node.name.as_str()) {
            findings
                .errors
                .push(ValidationIssue::node(&label, format!("Duplicate node name '{}'", node.name)));
        }

        if node.node_type.is_empty() {
            findings.errors.push(ValidationIssue::node(&label, "Node is missing required field 'type'"));
        }

        if profile.reports_position() {
            match &node.position {
                None => findings.warnings.push(ValidationIssue::node(&label, "Node has no position")),
                Some(position) if position.len() != 2 => findings.warnings.push(ValidationIssue::node(
                    &label,
                    format!("Node position must be [x, y], got {} values", position.len()),
                )),
                Some(position) if !position.iter().all(Value::is_number) => findings
                    .warnings
                    .push(ValidationIssue::node(&label, "Node position must contain numbers")),
                Some(_) => {}
            }
        }
    }
}

// -----------------------------------------------------------------------
// Connection check
// -----------------------------------------------------------------------

fn check_connections(graph: &WorkflowGraph, profile: ValidationProfile, findings: &mut Findings) {
    let names = graph.node_names();

    for (source, ports) in &graph.connections {
        if !names.contains(source.as_str()) {
            findings
                .errors
                .push(ValidationIssue::node(source, format!("Source node not found: {source}")));
        }

        for target in ports.values().flatten().flatten() {
            if !names.contains(target.node.as_str()) {
                findings.errors.push(ValidationIssue::connection(
                    format!("{source} -> {}", target.node),
                    format!("Target node not found: {}", target.node),
                ));
            }
        }
    }

    if profile.reports_topology() {
        if !graph.nodes.is_empty() && graph.trigger_count() == 0 {
            findings
                .warnings
                .push(ValidationIssue::workflow("Workflow has no trigger node and can only run manually"));
        }

        if graph.nodes.len() > 1 {
            for (index, node) in graph.nodes.iter().enumerate() {
                if !node.is_trigger() && !node.name.is_empty() && !graph.is_connected(&node.name) {
                    findings
                        .warnings
                        .push(ValidationIssue::node(node.label(index), "Node is not connected to any other node"));
                }
            }
        }
    }
}

// -----------------------------------------------------------------------
// Expression check
// -----------------------------------------------------------------------

fn check_expressions(graph: &WorkflowGraph, profile: ValidationProfile, findings: &mut Findings) {
    for (index, node) in graph.nodes.iter().enumerate() {
        for site in scan_parameters(&node.parameters) {
            findings.expressions_checked += site.expressions;
            if site.marked {
                continue;
            }

            let issue = ValidationIssue::node(
                node.label(index),
                format!(
                    "Expression {} at parameters{} is missing the '=' prefix and will be treated as text",
                    site.sample, site.pointer
                ),
            );
            match profile {
                ValidationProfile::Strict => findings.errors.push(issue),
                ValidationProfile::AiFriendly => findings.warnings.push(issue),
                ValidationProfile::Minimal | ValidationProfile::Runtime => {}
            }
        }
    }
}
