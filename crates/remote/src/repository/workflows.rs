//! Workflow CRUD calls.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    client::{check_status, ApiClient},
    models::{writable_document, ListFilter, Page, WorkflowSummary},
    RemoteError,
};

/// Create a workflow. The platform assigns the id.
///
/// Only the writable fields of `definition` are sent.
pub async fn create_workflow(client: &ApiClient, definition: &Value) -> Result<Value, RemoteError> {
    let response = client
        .request(Method::POST, &["workflows"])
        .json(&writable_document(definition))
        .send()
        .await?;

    let created = check_status(response, "new workflow").await?.json::<Value>().await?;
    debug!(id = ?created.get("id"), "workflow created");
    Ok(created)
}

/// Fetch a single workflow document by id.
pub async fn get_workflow(client: &ApiClient, id: &str) -> Result<Value, RemoteError> {
    let response = client
        .request(Method::GET, &["workflows", checked_id(id)?])
        .send()
        .await?;

    Ok(check_status(response, id).await?.json::<Value>().await?)
}

/// Return one page of workflows matching `filter`.
pub async fn list_workflows(
    client: &ApiClient,
    filter: &ListFilter,
) -> Result<Page<WorkflowSummary>, RemoteError> {
    let response = client
        .request(Method::GET, &["workflows"])
        .query(&filter.query_pairs())
        .send()
        .await?;

    Ok(check_status(response, "workflows").await?.json::<Page<WorkflowSummary>>().await?)
}

/// Replace a workflow with `definition` (full-document PUT).
///
/// Returns the document as stored by the platform.
pub async fn update_workflow(
    client: &ApiClient,
    id: &str,
    definition: &Value,
) -> Result<Value, RemoteError> {
    let response = client
        .request(Method::PUT, &["workflows", checked_id(id)?])
        .json(&writable_document(definition))
        .send()
        .await?;

    Ok(check_status(response, id).await?.json::<Value>().await?)
}

/// Replace the tag set of a workflow.
pub async fn update_workflow_tags(
    client: &ApiClient,
    id: &str,
    tag_ids: &[String],
) -> Result<Value, RemoteError> {
    let body: Vec<Value> = tag_ids.iter().map(|tag| json!({ "id": tag })).collect();
    let response = client
        .request(Method::PUT, &["workflows", checked_id(id)?, "tags"])
        .json(&body)
        .send()
        .await?;

    Ok(check_status(response, id).await?.json::<Value>().await?)
}

/// Permanently delete a workflow.
///
/// Returns `RemoteError::NotFound` if the platform has no such workflow.
pub async fn delete_workflow(client: &ApiClient, id: &str) -> Result<(), RemoteError> {
    let response = client
        .request(Method::DELETE, &["workflows", checked_id(id)?])
        .send()
        .await?;

    check_status(response, id).await?;
    Ok(())
}

/// Ids that could never name a workflow, and that URL normalization would
/// otherwise drop or resolve, are reported as not found.
fn checked_id(id: &str) -> Result<&str, RemoteError> {
    match id.trim() {
        "" | "." | ".." => Err(RemoteError::NotFound(id.to_owned())),
        _ => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_segments_are_not_workflow_ids() {
        for id in ["", " ", ".", ".."] {
            assert!(matches!(checked_id(id), Err(RemoteError::NotFound(_))), "{id:?}");
        }
        assert_eq!(checked_id("..x").unwrap(), "..x");
        assert_eq!(checked_id("Zx81kQ").unwrap(), "Zx81kQ");
    }

    #[tokio::test]
    async fn dot_segment_id_never_reaches_the_network() {
        let client = crate::create_client(&crate::ClientConfig {
            base_url: "http://127.0.0.1:9/api/v1".into(),
            api_key: "key".into(),
            ..crate::ClientConfig::default()
        })
        .unwrap();

        let err = delete_workflow(&client, "..").await.unwrap_err();
        assert!(matches!(err, RemoteError::NotFound(id) if id == ".."));
    }
}
