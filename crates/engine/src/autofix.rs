//! Detection and repair of common workflow defects.
//!
//! Detectors run unconditionally; the caller's options then filter the
//! proposals (by type, confidence and count) before they are reported and,
//! when requested, applied to the graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::{mark_expression, unmarked_expressions};
use crate::models::WorkflowGraph;

/// Default cap on reported fixes.
pub const DEFAULT_MAX_FIXES: usize = 50;

/// Version assigned to nodes that lack one.
const FALLBACK_TYPE_VERSION: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixType {
    ExpressionFormat,
    #[serde(rename = "typeversion-correction")]
    TypeVersionCorrection,
    WebhookMissingPath,
}

/// How sure a detector is that its proposal is right. Ordered low → high.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixOptions {
    /// Mutate the graph instead of only reporting.
    pub apply_fixes: bool,
    /// Restrict to these fix types; `None` allows all.
    pub fix_types: Option<Vec<FixType>>,
    /// Minimum confidence a proposal needs to be kept.
    pub confidence_threshold: Confidence,
    pub max_fixes: usize,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            apply_fixes: false,
            fix_types: None,
            confidence_threshold: Confidence::default(),
            max_fixes: DEFAULT_MAX_FIXES,
        }
    }
}

/// One proposed repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixProposal {
    /// Label of the affected node.
    pub node: String,
    #[serde(rename = "type")]
    pub fix_type: FixType,
    pub issue: String,
    pub fix: String,
    pub confidence: Confidence,
    /// Index into `nodes` at detection time.
    #[serde(skip)]
    pub node_index: usize,
    /// JSON pointer into the node's parameters, for expression fixes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Replacement value for webhook paths.
    #[serde(skip)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixSummary {
    /// Proposals that survived the filters.
    pub fixes_found: usize,
    pub fixes_applied: usize,
    /// Proposals produced before filtering.
    pub total_detected: usize,
    pub fixes: Vec<FixProposal>,
}

/// Run every detector over `graph`, in node order.
pub fn detect_fixes(graph: &WorkflowGraph) -> Vec<FixProposal> {
    let mut proposals = Vec::new();

    for (index, node) in graph.nodes.iter().enumerate() {
        let label = node.label(index);

        for site in unmarked_expressions(&node.parameters) {
            proposals.push(FixProposal {
                node: label.clone(),
                fix_type: FixType::ExpressionFormat,
                issue: format!("Expression {} is missing the '=' prefix", site.sample),
                fix: format!("Prefix parameters{} with '='", site.pointer),
                confidence: Confidence::High,
                node_index: index,
                parameter: Some(site.pointer),
                value: None,
            });
        }

        if node.type_version.is_none() {
            proposals.push(FixProposal {
                node: label.clone(),
                fix_type: FixType::TypeVersionCorrection,
                issue: "Node has no typeVersion".into(),
                fix: "Set typeVersion to 1".into(),
                confidence: Confidence::High,
                node_index: index,
                parameter: None,
                value: None,
            });
        }

        if node.is_webhook() && !node.parameters.contains_key("path") {
            let slug = webhook_slug(&node.name);
            proposals.push(FixProposal {
                node: label.clone(),
                fix_type: FixType::WebhookMissingPath,
                issue: "Webhook node has no path".into(),
                fix: format!("Set path to '{slug}'"),
                confidence: Confidence::Medium,
                node_index: index,
                parameter: None,
                value: Some(slug),
            });
        }
    }

    proposals
}

/// Keep the proposals allowed by `options`, capped at `max_fixes`.
pub fn filter_fixes(proposals: Vec<FixProposal>, options: &FixOptions) -> Vec<FixProposal> {
    proposals
        .into_iter()
        .filter(|p| {
            options
                .fix_types
                .as_ref()
                .map_or(true, |allowed| allowed.contains(&p.fix_type))
        })
        .filter(|p| p.confidence >= options.confidence_threshold)
        .take(options.max_fixes)
        .collect()
}

/// Apply `proposals` to `graph`, returning how many changed something.
///
/// Proposals must come from [`detect_fixes`] on this same graph.
pub fn apply_fixes(graph: &mut WorkflowGraph, proposals: &[FixProposal]) -> usize {
    proposals.iter().filter(|p| apply_fix(graph, p)).count()
}

fn apply_fix(graph: &mut WorkflowGraph, proposal: &FixProposal) -> bool {
    let Some(node) = graph.nodes.get_mut(proposal.node_index) else {
        return false;
    };

    match proposal.fix_type {
        FixType::TypeVersionCorrection => {
            if node.type_version.is_some() {
                return false;
            }
            node.type_version = Some(FALLBACK_TYPE_VERSION);
            true
        }
        FixType::ExpressionFormat => proposal
            .parameter
            .as_deref()
            .is_some_and(|pointer| mark_expression(&mut node.parameters, pointer)),
        FixType::WebhookMissingPath => {
            if node.parameters.contains_key("path") {
                return false;
            }
            let slug = proposal.value.clone().unwrap_or_else(|| webhook_slug(&node.name));
            node.parameters.insert("path".into(), Value::String(slug));
            true
        }
    }
}

/// Detect, filter and (optionally) apply in one pass.
pub fn autofix(graph: &mut WorkflowGraph, options: &FixOptions) -> FixSummary {
    let detected = detect_fixes(graph);
    let total_detected = detected.len();
    let fixes = filter_fixes(detected, options);

    let fixes_applied = if options.apply_fixes { apply_fixes(graph, &fixes) } else { 0 };

    FixSummary {
        fixes_found: fixes.len(),
        fixes_applied,
        total_detected,
        fixes,
    }
}

/// Lower-cased name with spaces replaced by hyphens.
pub fn webhook_slug(name: &str) -> String {
    let slug = name.trim().to_lowercase().replace(' ', "-");
    if slug.is_empty() {
        "webhook".to_owned()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defective() -> WorkflowGraph {
        serde_json::from_value(json!({
            "name": "needs work",
            "nodes": [
                { "id": "1", "name": "Incoming Order", "type": "n8n-nodes-base.webhook", "position": [0, 0],
                  "parameters": {} },
                { "id": "2", "name": "Call API", "type": "n8n-nodes-base.httpRequest", "typeVersion": 4, "position": [200, 0],
                  "parameters": { "url": "https://api.example.com/{{ $json.id }}" } }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn detects_all_three_defects() {
        let proposals = detect_fixes(&defective());
        let kinds: Vec<FixType> = proposals.iter().map(|p| p.fix_type).collect();
        assert_eq!(
            kinds,
            vec![FixType::TypeVersionCorrection, FixType::WebhookMissingPath, FixType::ExpressionFormat]
        );
        assert_eq!(proposals[1].fix, "Set path to 'incoming-order'");
        assert_eq!(proposals[1].confidence, Confidence::Medium);
        assert_eq!(proposals[2].node, "Call API");
        assert_eq!(proposals[2].parameter.as_deref(), Some("/url"));
    }

    #[test]
    fn preview_does_not_mutate() {
        let mut graph = defective();
        let summary = autofix(&mut graph, &FixOptions::default());
        assert_eq!(summary.fixes_found, 3);
        assert_eq!(summary.fixes_applied, 0);
        assert_eq!(graph, defective());
    }

    #[test]
    fn apply_repairs_every_fix_type() {
        let mut graph = defective();
        let summary = autofix(&mut graph, &FixOptions { apply_fixes: true, ..FixOptions::default() });

        assert_eq!(summary.fixes_applied, 3);
        assert_eq!(graph.nodes[0].type_version, Some(1.0));
        assert_eq!(graph.nodes[0].parameters["path"], "incoming-order");
        assert_eq!(graph.nodes[1].parameters["url"], "=https://api.example.com/{{ $json.id }}");
    }

    #[test]
    fn second_pass_finds_and_applies_nothing() {
        let mut graph = defective();
        let options = FixOptions { apply_fixes: true, ..FixOptions::default() };
        autofix(&mut graph, &options);

        let again = autofix(&mut graph, &options);
        assert_eq!(again.fixes_found, 0);
        assert_eq!(again.fixes_applied, 0);
        assert_eq!(again.total_detected, 0);
    }

    #[test]
    fn re_applying_stale_proposals_changes_nothing() {
        let mut graph = defective();
        let proposals = detect_fixes(&graph);
        assert_eq!(apply_fixes(&mut graph, &proposals), 3);
        assert_eq!(apply_fixes(&mut graph, &proposals), 0);
    }

    #[test]
    fn filters_gate_reporting_and_application() {
        let mut graph = defective();
        let options = FixOptions {
            apply_fixes: true,
            confidence_threshold: Confidence::High,
            ..FixOptions::default()
        };
        let summary = autofix(&mut graph, &options);
        assert_eq!(summary.total_detected, 3);
        assert_eq!(summary.fixes_found, 2);
        assert!(!graph.nodes[0].parameters.contains_key("path"));

        let mut graph = defective();
        let options = FixOptions {
            fix_types: Some(vec![FixType::WebhookMissingPath]),
            confidence_threshold: Confidence::Low,
            ..FixOptions::default()
        };
        let summary = autofix(&mut graph, &options);
        assert_eq!(summary.fixes.len(), 1);
        assert_eq!(summary.fixes[0].fix_type, FixType::WebhookMissingPath);

        let summary = autofix(&mut defective(), &FixOptions { max_fixes: 1, ..FixOptions::default() });
        assert_eq!(summary.fixes_found, 1);
        assert_eq!(summary.total_detected, 3);
    }

    #[test]
    fn wire_names_match_the_tool_contract() {
        let options: FixOptions = serde_json::from_value(json!({
            "applyFixes": true,
            "fixTypes": ["expression-format", "typeversion-correction", "webhook-missing-path"],
            "confidenceThreshold": "low"
        }))
        .unwrap();
        assert_eq!(options.fix_types.as_ref().map(Vec::len), Some(3));
        assert_eq!(options.max_fixes, DEFAULT_MAX_FIXES);

        let proposal = &detect_fixes(&defective())[0];
        let wire = serde_json::to_value(proposal).unwrap();
        assert_eq!(wire["type"], "typeversion-correction");
        assert_eq!(wire["confidence"], "high");
        assert!(wire.get("nodeIndex").is_none());
    }

    #[test]
    fn respond_to_webhook_gets_no_path() {
        let mut graph: WorkflowGraph = serde_json::from_value(json!({
            "name": "reply only",
            "nodes": [{ "id": "1", "name": "Reply", "type": "n8n-nodes-base.respondToWebhook", "typeVersion": 1,
                        "position": [0, 0], "parameters": { "respondWith": "json" } }]
        }))
        .unwrap();

        let summary = autofix(&mut graph, &FixOptions { apply_fixes: true, ..FixOptions::default() });
        assert_eq!(summary.total_detected, 0);
        assert_eq!(summary.fixes_applied, 0);
        assert!(!graph.nodes[0].parameters.contains_key("path"));
    }

    #[test]
    fn slug_falls_back_when_name_is_blank() {
        assert_eq!(webhook_slug("New Customer Signup"), "new-customer-signup");
        assert_eq!(webhook_slug("   "), "webhook");
    }
}
