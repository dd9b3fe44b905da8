//! Wire structs for the platform's workflow endpoints.
//!
//! These are *transport* models. Full workflow documents travel as
//! `serde_json::Value`; the typed graph lives in the `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level workflow fields the platform accepts on `PUT /workflows/{id}`.
///
/// Everything else (`id`, `active`, `tags`, timestamps, ...) is read-only
/// and rejected by the API if sent back.
pub const WRITABLE_FIELDS: &[&str] = &["name", "nodes", "connections", "settings", "staticData"];

/// One entry of `GET /workflows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

/// Reference to a tag as the platform returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Query parameters for `GET /workflows`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Comma-separated tag names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ListFilter {
    /// Render as query pairs, skipping unset fields.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(active) = self.active {
            pairs.push(("active", active.to_string()));
        }
        if let Some(tags) = &self.tags {
            pairs.push(("tags", tags.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        pairs
    }
}

/// Cursor-paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Strip a full workflow document down to [`WRITABLE_FIELDS`].
///
/// A missing `settings` is sent as `{}` because the platform requires it.
pub fn writable_document(document: &Value) -> Value {
    let mut body = Map::new();
    if let Some(object) = document.as_object() {
        for field in WRITABLE_FIELDS {
            if let Some(value) = object.get(*field) {
                if !value.is_null() {
                    body.insert((*field).to_owned(), value.clone());
                }
            }
        }
    }
    body.entry("settings").or_insert_with(|| Value::Object(Map::new()));
    Value::Object(body)
}

/// Tag ids carried by a full document, if it has a `tags` array.
pub fn document_tag_ids(document: &Value) -> Option<Vec<String>> {
    let tags = document.get("tags")?.as_array()?;
    Some(
        tags.iter()
            .filter_map(|tag| tag.get("id").and_then(Value::as_str).map(str::to_owned))
            .collect(),
    )
}
