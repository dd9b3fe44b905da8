//! Core domain models for workflow graphs.
//!
//! These types mirror the platform's workflow document. They are
//! deserialized from the JSON fetched through the `remote` crate, mutated in
//! memory, and serialized back for a full-document replace. Fields this
//! crate does not model are carried in `extra` so a round-trip never drops
//! them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default port name for both outputs and inputs.
pub const MAIN_PORT: &str = "main";

/// Substrings of a node `type` that mark it as an entry point.
const TRIGGER_MARKERS: &[&str] = &["trigger", "webhook", "schedule"];

/// Node types that match a trigger marker but are not entry points.
const NON_TRIGGER_TYPES: &[&str] = &["respondtowebhook"];

/// Type name of the inbound webhook node, without package prefix.
const WEBHOOK_TYPE: &str = "webhook";

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
///
/// `id`, `name` and `node_type` deserialize to the empty string when absent;
/// validation reports the empty string as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Capability identifier, e.g. `n8n-nodes-base.httpRequest`.
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_version: Option<f64>,
    /// Canvas coordinates. Kept as a list so a wrong arity can be reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Kept as raw JSON so a malformed position is a validation finding
    /// rather than a decode failure.
    pub position: Option<Vec<Value>>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_fail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_fail: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_between_tries: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// Absent `disabled` means enabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    /// Whether the node's type marks it as a webhook, schedule or other trigger.
    pub fn is_trigger(&self) -> bool {
        let local = self.local_type();
        !NON_TRIGGER_TYPES.contains(&local.as_str()) && TRIGGER_MARKERS.iter().any(|marker| local.contains(marker))
    }

    /// Whether this is the inbound webhook node, the one that owns a `path`.
    pub fn is_webhook(&self) -> bool {
        self.local_type() == WEBHOOK_TYPE
    }

    /// Lower-cased type name after the last `.` (`n8n-nodes-base.webhook` → `webhook`).
    fn local_type(&self) -> String {
        let node_type = self.node_type.rsplit('.').next().unwrap_or_default();
        node_type.to_ascii_lowercase()
    }

    /// Label used in reports: the name, else the id, else the list position.
    pub fn label(&self, index: usize) -> String {
        if !self.name.is_empty() {
            self.name.clone()
        } else if !self.id.is_empty() {
            self.id.clone()
        } else {
            format!("node[{index}]")
        }
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// One input socket a connection group feeds into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    /// Target node *name*.
    pub node: String,
    /// Target input port, usually `main`.
    #[serde(rename = "type", default = "main_port")]
    pub port: String,
    #[serde(default)]
    pub index: u32,
}

impl ConnectionTarget {
    pub fn new(node: impl Into<String>, port: impl Into<String>, index: u32) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            index,
        }
    }
}

fn main_port() -> String {
    MAIN_PORT.to_owned()
}

/// Source node name → output port → output index → targets.
pub type Connections = IndexMap<String, IndexMap<String, Vec<Vec<ConnectionTarget>>>>;

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// Tag reference attached to a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowGraph
// ---------------------------------------------------------------------------

/// A complete workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    /// Assigned by the platform; absent before creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Connections,
    /// Opaque to the engine beyond shallow merges.
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowGraph {
    /// Convenience constructor for tests and new documents.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
            ..Self::default()
        }
    }

    /// Dual-key node lookup.
    ///
    /// A node whose id equals `id` wins; otherwise the first node whose name
    /// equals `name`. Returns `None` when neither key matches.
    pub fn find_node_index(&self, id: Option<&str>, name: Option<&str>) -> Option<usize> {
        id.and_then(|id| self.nodes.iter().position(|n| n.id == id))
            .or_else(|| name.and_then(|name| self.nodes.iter().position(|n| n.name == name)))
    }

    pub fn find_node(&self, id: Option<&str>, name: Option<&str>) -> Option<&Node> {
        self.find_node_index(id, name).map(|i| &self.nodes[i])
    }

    /// Set of all node names.
    pub fn node_names(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Whether `name` appears anywhere in `connections`, as source or target.
    pub fn is_connected(&self, name: &str) -> bool {
        self.connections.iter().any(|(source, ports)| {
            source == name
                || ports
                    .values()
                    .flatten()
                    .flatten()
                    .any(|target| target.node == name)
        })
    }

    pub fn trigger_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_trigger()).count()
    }

    pub fn enabled_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_disabled()).count()
    }
}
