//! Handlers for the three workflow tools.
//!
//! Options bodies are optional and default when absent. Per-operation and
//! per-check failures are part of the JSON result; only
//! transport and decode failures turn into an error status.

use axum::{
    extract::{Path, State},
    Json,
};

use super::AppState;
use crate::ApiError;
use engine::{
    service::AutofixReport, FixOptions, PartialUpdateReport, PartialUpdateRequest, ValidationOptions,
    ValidationReport,
};

pub async fn partial_update(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PartialUpdateRequest>,
) -> Result<Json<PartialUpdateReport>, ApiError> {
    let report = state.service.apply_partial_update(&id, &request).await?;
    Ok(Json(report))
}

pub async fn validate(
    Path(id): Path<String>,
    State(state): State<AppState>,
    options: Option<Json<ValidationOptions>>,
) -> Result<Json<ValidationReport>, ApiError> {
    let options = options.map(|Json(options)| options).unwrap_or_default();
    let report = state.service.validate_workflow(&id, &options).await?;
    Ok(Json(report))
}

pub async fn autofix(
    Path(id): Path<String>,
    State(state): State<AppState>,
    options: Option<Json<FixOptions>>,
) -> Result<Json<AutofixReport>, ApiError> {
    let options = options.map(|Json(options)| options).unwrap_or_default();
    let report = state.service.autofix_workflow(&id, &options).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{state, ID};
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::json;

    #[tokio::test]
    async fn partial_update_reports_and_persists() {
        let (state, store) = state();
        let request: PartialUpdateRequest = serde_json::from_value(json!({
            "operations": [
                { "type": "moveNode", "nodeName": "CRM", "position": [400, 100] },
                { "type": "updateNode", "nodeId": "b", "updates": { "notes": "syncs leads" } }
            ]
        }))
        .unwrap();

        let Json(report) = partial_update(Path(ID.into()), State(state), Json(request)).await.unwrap();

        assert_eq!(report.applied, Some(2));
        assert!(report.persisted);
        let written = store.last_write().unwrap();
        assert_eq!(written["nodes"][1]["position"], json!([400.0, 100.0]));
        assert_eq!(written["nodes"][1]["notes"], "syncs leads");
    }

    #[tokio::test]
    async fn validate_uses_requested_profile() {
        let (state, store) = state();
        let options: ValidationOptions = serde_json::from_value(json!({ "profile": "strict" })).unwrap();

        let Json(report) = validate(Path(ID.into()), State(state), Some(Json(options))).await.unwrap();

        assert!(!report.valid);
        assert_eq!(report.errors[0].node.as_deref(), Some("CRM"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn autofix_preview_lists_fixes() {
        let (state, store) = state();
        let Json(report) = autofix(Path(ID.into()), State(state), None).await.unwrap();

        let wire = serde_json::to_value(&report).unwrap();
        assert_eq!(wire["fixesFound"], 2);
        assert_eq!(wire["persisted"], false);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn remote_outage_becomes_bad_gateway() {
        let (state, store) = state();
        store.fail_with("connection reset");

        let err = validate(Path(ID.into()), State(state), None)
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
