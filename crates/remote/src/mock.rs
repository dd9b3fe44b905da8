//! `MockStore`: an in-memory test double for `WorkflowStore`.
//!
//! Useful in unit and integration tests where a running automation platform
//! is either unavailable or irrelevant.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    models::{ListFilter, WorkflowSummary},
    store::WorkflowStore,
    RemoteError,
};

#[derive(Debug, Default)]
struct MockState {
    workflows: BTreeMap<String, Value>,
    /// Every `(id, document)` passed to `replace_workflow`, in call order.
    writes: Vec<(String, Value)>,
    fail_with: Option<String>,
}

/// A store that keeps documents in memory and records every write.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with one document.
    ///
    /// The document's `id` field is set to `id`.
    pub fn with_workflow(id: impl Into<String>, mut workflow: Value) -> Self {
        let id = id.into();
        if let Some(object) = workflow.as_object_mut() {
            object.insert("id".into(), Value::String(id.clone()));
        }
        let store = Self::new();
        store.lock().workflows.insert(id, workflow);
        store
    }

    /// Make every subsequent call fail with [`RemoteError::Unavailable`].
    pub fn fail_with(&self, message: impl Into<String>) {
        self.lock().fail_with = Some(message.into());
    }

    /// Number of `replace_workflow` calls seen so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// The document passed to the most recent `replace_workflow` call.
    pub fn last_write(&self) -> Option<Value> {
        self.lock().writes.last().map(|(_, doc)| doc.clone())
    }

    /// Current stored document for `id`.
    pub fn document(&self, id: &str) -> Option<Value> {
        self.lock().workflows.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(state: &MockState) -> Result<(), RemoteError> {
        match &state.fail_with {
            Some(message) => Err(RemoteError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowStore for MockStore {
    async fn fetch_workflow(&self, id: &str) -> Result<Value, RemoteError> {
        let state = self.lock();
        Self::check_failure(&state)?;
        state
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))
    }

    async fn replace_workflow(&self, id: &str, workflow: Value) -> Result<Value, RemoteError> {
        let mut state = self.lock();
        Self::check_failure(&state)?;
        if !state.workflows.contains_key(id) {
            return Err(RemoteError::NotFound(id.to_owned()));
        }

        let mut stored = workflow.clone();
        if let Some(object) = stored.as_object_mut() {
            object.insert("id".into(), Value::String(id.to_owned()));
            object.insert("updatedAt".into(), Value::String(Utc::now().to_rfc3339()));
        }

        state.writes.push((id.to_owned(), workflow));
        state.workflows.insert(id.to_owned(), stored.clone());
        Ok(stored)
    }

    async fn list_workflows(&self, filter: &ListFilter) -> Result<Vec<WorkflowSummary>, RemoteError> {
        let state = self.lock();
        Self::check_failure(&state)?;

        let summaries = state
            .workflows
            .values()
            .filter_map(|doc| serde_json::from_value::<WorkflowSummary>(doc.clone()).ok())
            .filter(|summary| filter.active.map_or(true, |active| summary.active == active))
            .take(filter.limit.map_or(usize::MAX, |limit| limit as usize))
            .collect();
        Ok(summaries)
    }

    async fn create_workflow(&self, workflow: Value) -> Result<Value, RemoteError> {
        let mut state = self.lock();
        Self::check_failure(&state)?;

        let id = Uuid::new_v4().to_string();
        let mut stored = match workflow {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        stored.insert("id".into(), Value::String(id.clone()));
        stored.entry("active").or_insert(Value::Bool(false));
        stored.insert("createdAt".into(), Value::String(Utc::now().to_rfc3339()));

        let stored = Value::Object(stored);
        state.workflows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), RemoteError> {
        let mut state = self.lock();
        Self::check_failure(&state)?;
        state
            .workflows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(id.to_owned()))
    }
}
