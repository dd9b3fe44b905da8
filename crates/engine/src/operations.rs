//! Diff operations: declarative edits applied to a [`WorkflowGraph`].
//!
//! Operations arrive as raw JSON and are parsed one at a time by
//! [`DiffOperation::from_value`], so a malformed entry fails on its own
//! instead of rejecting the whole batch.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ConnectionTarget, Node, Tag, WorkflowGraph, MAIN_PORT};

/// Every `type` discriminator [`DiffOperation`] understands.
pub const OPERATION_TYPES: &[&str] = &[
    "addNode",
    "removeNode",
    "updateNode",
    "moveNode",
    "enableNode",
    "disableNode",
    "addConnection",
    "removeConnection",
    "updateName",
    "updateSettings",
    "addTag",
    "removeTag",
];

/// Highest output index `addConnection` will pad up to.
pub const MAX_OUTPUT_INDEX: usize = 255;

/// Why a single operation could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Operation requires nodeId or nodeName")]
    MissingNodeReference,

    #[error("Connection not found: {from} -> {to}")]
    ConnectionNotFound { from: String, to: String },

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Workflow name cannot be empty")]
    EmptyName,

    #[error("Unknown operation type: {0}")]
    UnknownType(String),

    #[error("Invalid {kind} operation: {message}")]
    InvalidPayload { kind: String, message: String },
}

/// One declarative edit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DiffOperation {
    AddNode {
        node: Node,
    },
    RemoveNode {
        node_id: Option<String>,
        node_name: Option<String>,
    },
    UpdateNode {
        node_id: Option<String>,
        node_name: Option<String>,
        /// Partial node; keys overwrite the node's fields shallowly.
        #[serde(alias = "changes")]
        updates: Map<String, Value>,
    },
    MoveNode {
        node_id: Option<String>,
        node_name: Option<String>,
        position: [f64; 2],
    },
    EnableNode {
        node_id: Option<String>,
        node_name: Option<String>,
    },
    DisableNode {
        node_id: Option<String>,
        node_name: Option<String>,
    },
    AddConnection {
        source: String,
        target: String,
        #[serde(default = "main_port")]
        source_output: String,
        #[serde(default = "main_port")]
        target_input: String,
        #[serde(default)]
        source_index: usize,
        #[serde(default)]
        target_index: u32,
    },
    RemoveConnection {
        source: String,
        target: String,
        #[serde(default = "main_port")]
        source_output: String,
        #[serde(default = "main_port")]
        target_input: String,
    },
    UpdateName {
        name: String,
    },
    UpdateSettings {
        settings: Map<String, Value>,
    },
    AddTag {
        tag_id: String,
        tag_name: Option<String>,
    },
    RemoveTag {
        tag_id: String,
    },
}

fn main_port() -> String {
    MAIN_PORT.to_owned()
}

/// What an applied operation touched, for the report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Effect {
    pub node_name: Option<String>,
    pub description: Option<String>,
}

impl Effect {
    fn node(name: &str) -> Self {
        Self {
            node_name: Some(name.to_owned()),
            description: None,
        }
    }

    fn described(description: String) -> Self {
        Self {
            node_name: None,
            description: Some(description),
        }
    }
}

/// The `type` string of a raw operation, if it has one.
pub fn raw_kind(raw: &Value) -> Option<&str> {
    raw.get("type").and_then(Value::as_str)
}

impl DiffOperation {
    /// Parse one raw operation.
    ///
    /// An absent or unrecognized `type` is [`OperationError::UnknownType`];
    /// a known type with bad fields is [`OperationError::InvalidPayload`].
    pub fn from_value(raw: &Value) -> Result<Self, OperationError> {
        let kind = raw_kind(raw).unwrap_or_default();
        if !OPERATION_TYPES.contains(&kind) {
            let shown = if kind.is_empty() { "<missing>" } else { kind };
            return Err(OperationError::UnknownType(shown.to_owned()));
        }

        serde_json::from_value(raw.clone()).map_err(|e| OperationError::InvalidPayload {
            kind: kind.to_owned(),
            message: e.to_string(),
        })
    }

    /// The `type` discriminator of this operation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "addNode",
            Self::RemoveNode { .. } => "removeNode",
            Self::UpdateNode { .. } => "updateNode",
            Self::MoveNode { .. } => "moveNode",
            Self::EnableNode { .. } => "enableNode",
            Self::DisableNode { .. } => "disableNode",
            Self::AddConnection { .. } => "addConnection",
            Self::RemoveConnection { .. } => "removeConnection",
            Self::UpdateName { .. } => "updateName",
            Self::UpdateSettings { .. } => "updateSettings",
            Self::AddTag { .. } => "addTag",
            Self::RemoveTag { .. } => "removeTag",
        }
    }

    /// Apply this operation to `graph` in place.
    ///
    /// On error the graph is left untouched.
    pub fn apply(&self, graph: &mut WorkflowGraph) -> Result<Effect, OperationError> {
        match self {
            Self::AddNode { node } => {
                let mut node = node.clone();
                if node.id.is_empty() {
                    node.id = Uuid::new_v4().to_string();
                }
                let effect = Effect::node(&node.name);
                graph.nodes.push(node);
                Ok(effect)
            }

            Self::RemoveNode { node_id, node_name } => {
                let index = locate(graph, node_id, node_name)?;
                let removed = graph.nodes.remove(index);
                Ok(Effect::node(&removed.name))
            }

            Self::UpdateNode { node_id, node_name, updates } => {
                let index = locate(graph, node_id, node_name)?;
                let merged = merge_node(&graph.nodes[index], updates).map_err(|message| {
                    OperationError::InvalidPayload {
                        kind: self.kind().to_owned(),
                        message,
                    }
                })?;
                let effect = Effect::node(&merged.name);
                graph.nodes[index] = merged;
                Ok(effect)
            }

            Self::MoveNode { node_id, node_name, position } => {
                let index = locate(graph, node_id, node_name)?;
                let node = &mut graph.nodes[index];
                node.position = Some(position.iter().map(|&coordinate| Value::from(coordinate)).collect());
                Ok(Effect::node(&node.name))
            }

            Self::EnableNode { node_id, node_name } => set_disabled(graph, node_id, node_name, false),
            Self::DisableNode { node_id, node_name } => set_disabled(graph, node_id, node_name, true),

            Self::AddConnection {
                source,
                target,
                source_output,
                target_input,
                source_index,
                target_index,
            } => {
                if *source_index > MAX_OUTPUT_INDEX {
                    return Err(OperationError::InvalidPayload {
                        kind: self.kind().to_owned(),
                        message: format!("sourceIndex {source_index} exceeds the maximum of {MAX_OUTPUT_INDEX}"),
                    });
                }
                let groups = graph
                    .connections
                    .entry(source.clone())
                    .or_default()
                    .entry(source_output.clone())
                    .or_default();
                if groups.len() <= *source_index {
                    groups.resize_with(source_index + 1, Vec::new);
                }

                let entry = ConnectionTarget::new(target.clone(), target_input.clone(), *target_index);
                let group = &mut groups[*source_index];
                if !group.contains(&entry) {
                    group.push(entry);
                }
                Ok(Effect::described(format!("{source} -> {target}")))
            }

            Self::RemoveConnection { source, target, source_output, target_input } => {
                remove_connection(graph, source, target, source_output, target_input)?;
                Ok(Effect::described(format!("{source} -> {target}")))
            }

            Self::UpdateName { name } => {
                if name.trim().is_empty() {
                    return Err(OperationError::EmptyName);
                }
                graph.name = name.clone();
                Ok(Effect::described(name.clone()))
            }

            Self::UpdateSettings { settings } => {
                for (key, value) in settings {
                    graph.settings.insert(key.clone(), value.clone());
                }
                let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
                Ok(Effect::described(keys.join(", ")))
            }

            Self::AddTag { tag_id, tag_name } => {
                if !graph.tags.iter().any(|tag| &tag.id == tag_id) {
                    graph.tags.push(Tag::new(tag_id.clone(), tag_name.clone()));
                }
                Ok(Effect::described(tag_id.clone()))
            }

            Self::RemoveTag { tag_id } => {
                let before = graph.tags.len();
                graph.tags.retain(|tag| &tag.id != tag_id);
                if graph.tags.len() == before {
                    return Err(OperationError::TagNotFound(tag_id.clone()));
                }
                Ok(Effect::described(tag_id.clone()))
            }
        }
    }
}

fn locate(
    graph: &WorkflowGraph,
    node_id: &Option<String>,
    node_name: &Option<String>,
) -> Result<usize, OperationError> {
    if node_id.is_none() && node_name.is_none() {
        return Err(OperationError::MissingNodeReference);
    }

    graph
        .find_node_index(node_id.as_deref(), node_name.as_deref())
        .ok_or_else(|| {
            let identifier = node_id.as_deref().or(node_name.as_deref()).unwrap_or_default();
            OperationError::NodeNotFound(identifier.to_owned())
        })
}

fn set_disabled(
    graph: &mut WorkflowGraph,
    node_id: &Option<String>,
    node_name: &Option<String>,
    disabled: bool,
) -> Result<Effect, OperationError> {
    let index = locate(graph, node_id, node_name)?;
    let node = &mut graph.nodes[index];
    node.disabled = Some(disabled);
    Ok(Effect::node(&node.name))
}

/// Shallow merge: every key in `updates` replaces the node's field wholesale.
fn merge_node(node: &Node, updates: &Map<String, Value>) -> Result<Node, String> {
    let mut document = match serde_json::to_value(node).map_err(|e| e.to_string())? {
        Value::Object(object) => object,
        _ => return Err("node did not serialize to an object".into()),
    };
    for (key, value) in updates {
        document.insert(key.clone(), value.clone());
    }
    serde_json::from_value(Value::Object(document)).map_err(|e| e.to_string())
}

fn remove_connection(
    graph: &mut WorkflowGraph,
    source: &str,
    target: &str,
    source_output: &str,
    target_input: &str,
) -> Result<(), OperationError> {
    let not_found = || OperationError::ConnectionNotFound {
        from: source.to_owned(),
        to: target.to_owned(),
    };

    let ports = graph.connections.get_mut(source).ok_or_else(not_found)?;
    let groups = ports.get_mut(source_output).ok_or_else(not_found)?;

    let mut removed = 0;
    for group in groups.iter_mut() {
        let before = group.len();
        group.retain(|entry| !(entry.node == target && entry.port == target_input));
        removed += before - group.len();
    }
    if removed == 0 {
        return Err(not_found());
    }

    // Trailing empty groups carry no meaning; inner ones keep output indices stable.
    while groups.last().is_some_and(Vec::is_empty) {
        groups.pop();
    }
    if groups.is_empty() {
        ports.shift_remove(source_output);
    }
    if ports.is_empty() {
        graph.connections.shift_remove(source);
    }
    Ok(())
}
