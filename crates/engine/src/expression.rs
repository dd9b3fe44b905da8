//! Syntactic scan for `{{ ... }}` expressions inside node parameters.
//!
//! Shared by validation (which counts and, depending on the profile,
//! reports findings) and autofix (which proposes and applies the marker).
//! Nothing here evaluates an expression.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Prefix the platform requires on a parameter string for its `{{ }}` parts
/// to be evaluated.
pub const EXPRESSION_MARKER: char = '=';

static EXPRESSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("expression pattern is valid"));

/// A parameter string that holds at least one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSite {
    /// JSON pointer into the node's `parameters`, e.g. `/options/headers/0/value`.
    pub pointer: String,
    /// Number of `{{ }}` expressions in the string.
    pub expressions: usize,
    /// Whether the string carries the marker.
    pub marked: bool,
    /// The first unmarked expression, for messages.
    pub sample: String,
}

/// Every parameter string containing an expression, in document order.
pub fn scan_parameters(parameters: &Map<String, Value>) -> Vec<ExpressionSite> {
    let mut sites = Vec::new();
    for (key, value) in parameters {
        walk(value, &format!("/{}", escape_token(key)), &mut sites);
    }
    sites
}

/// Only the sites that are missing the marker.
pub fn unmarked_expressions(parameters: &Map<String, Value>) -> Vec<ExpressionSite> {
    scan_parameters(parameters)
        .into_iter()
        .filter(|site| !site.marked)
        .collect()
}

fn walk(value: &Value, pointer: &str, sites: &mut Vec<ExpressionSite>) {
    match value {
        Value::String(text) => {
            if let Some(site) = inspect(text, pointer) {
                sites.push(site);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, &format!("{pointer}/{index}"), sites);
            }
        }
        Value::Object(object) => {
            for (key, item) in object {
                walk(item, &format!("{pointer}/{}", escape_token(key)), sites);
            }
        }
        _ => {}
    }
}

fn inspect(text: &str, pointer: &str) -> Option<ExpressionSite> {
    let bodies: Vec<&str> = EXPRESSION
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if bodies.is_empty() {
        return None;
    }

    let string_marked = text.starts_with(EXPRESSION_MARKER);
    let unmarked_body = bodies
        .iter()
        .find(|body| !body.trim_start().starts_with(EXPRESSION_MARKER));

    Some(ExpressionSite {
        pointer: pointer.to_owned(),
        expressions: bodies.len(),
        marked: string_marked || unmarked_body.is_none(),
        sample: format!("{{{{{}}}}}", unmarked_body.unwrap_or(&bodies[0])),
    })
}

/// Prefix the string at `pointer` with the marker.
///
/// Returns `false` when the pointer no longer resolves to a string holding
/// an expression, or the string is already marked.
pub fn mark_expression(parameters: &mut Map<String, Value>, pointer: &str) -> bool {
    match parameter_mut(parameters, pointer) {
        Some(Value::String(text)) if !text.starts_with(EXPRESSION_MARKER) && EXPRESSION.is_match(text) => {
            text.insert(0, EXPRESSION_MARKER);
            true
        }
        _ => false,
    }
}

/// Resolve a JSON pointer relative to a parameters map.
pub fn parameter_mut<'a>(parameters: &'a mut Map<String, Value>, pointer: &str) -> Option<&'a mut Value> {
    let trimmed = pointer.strip_prefix('/')?;
    let (head, rest) = match trimmed.split_once('/') {
        Some((head, rest)) => (head, Some(rest)),
        None => (trimmed, None),
    };

    let value = parameters.get_mut(&unescape_token(head))?;
    match rest {
        Some(rest) => value.pointer_mut(&format!("/{rest}")),
        None => Some(value),
    }
}

fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
