//! The `WorkflowStore` trait, the remote collaborator the engine depends on.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    client::ApiClient,
    models::{document_tag_ids, ListFilter, WorkflowSummary},
    repository::workflows,
    RemoteError,
};

/// Whole-document access to remotely stored workflows.
///
/// There is no patch primitive: callers fetch a snapshot, mutate it locally
/// and hand the complete document back to [`WorkflowStore::replace_workflow`].
/// The last full write wins.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Fetch the current document for `id`.
    async fn fetch_workflow(&self, id: &str) -> Result<Value, RemoteError>;

    /// Overwrite the stored document for `id` and return what was stored.
    ///
    /// Not atomic against the platform: the body and the tag set are two
    /// requests. If the tag update fails the body has already been replaced,
    /// and the error is returned as is.
    async fn replace_workflow(&self, id: &str, workflow: Value) -> Result<Value, RemoteError>;

    async fn list_workflows(&self, filter: &ListFilter) -> Result<Vec<WorkflowSummary>, RemoteError>;

    async fn create_workflow(&self, workflow: Value) -> Result<Value, RemoteError>;

    async fn delete_workflow(&self, id: &str) -> Result<(), RemoteError>;
}

#[async_trait]
impl WorkflowStore for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_workflow(&self, id: &str) -> Result<Value, RemoteError> {
        workflows::get_workflow(self, id).await
    }

    #[instrument(skip(self, workflow))]
    async fn replace_workflow(&self, id: &str, workflow: Value) -> Result<Value, RemoteError> {
        let mut stored = workflows::update_workflow(self, id, &workflow).await?;

        // Tags are read-only on the workflow endpoint and go through their own.
        if let Some(tag_ids) = document_tag_ids(&workflow) {
            let tags = workflows::update_workflow_tags(self, id, &tag_ids)
                .await
                .inspect_err(|e| warn!("workflow '{}' body replaced but tag sync failed: {}", id, e))?;
            if let Some(object) = stored.as_object_mut() {
                object.insert("tags".into(), tags);
            }
        }

        info!("workflow '{}' replaced", id);
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn list_workflows(&self, filter: &ListFilter) -> Result<Vec<WorkflowSummary>, RemoteError> {
        Ok(workflows::list_workflows(self, filter).await?.data)
    }

    #[instrument(skip(self, workflow))]
    async fn create_workflow(&self, workflow: Value) -> Result<Value, RemoteError> {
        workflows::create_workflow(self, &workflow).await
    }

    #[instrument(skip(self))]
    async fn delete_workflow(&self, id: &str) -> Result<(), RemoteError> {
        workflows::delete_workflow(self, id).await
    }
}
