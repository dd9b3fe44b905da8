//! Tests for `WorkflowService` against the in-memory `MockStore`.
//!
//! No running automation platform is required; every remote call lands in
//! the mock, which counts writes so the persistence rules can be asserted.

use std::sync::Arc;

use serde_json::{json, Value};

use remote::{MockStore, RemoteError};

use crate::autofix::{Confidence, FixOptions};
use crate::service::{PartialUpdateRequest, WorkflowService};
use crate::validation::ValidationOptions;
use crate::EngineError;

const ID: &str = "wf-1";

fn document() -> Value {
    json!({
        "name": "Order intake",
        "active": false,
        "nodes": [
            { "id": "a", "name": "Start", "type": "n8n-nodes-base.manualTrigger", "typeVersion": 1, "position": [0, 0] },
            { "id": "b", "name": "Notify", "type": "n8n-nodes-base.slack", "typeVersion": 2, "position": [200, 0],
              "parameters": { "text": "New order {{ $json.orderId }}" } }
        ],
        "connections": {
            "Start": { "main": [[{ "node": "Notify", "type": "main", "index": 0 }]] }
        },
        "settings": { "executionOrder": "v1" },
        "tags": [{ "id": "t-ops", "name": "ops" }]
    })
}

fn service() -> (WorkflowService, MockStore) {
    let store = MockStore::with_workflow(ID, document());
    (WorkflowService::new(Arc::new(store.clone())), store)
}

fn request(operations: Vec<Value>) -> PartialUpdateRequest {
    PartialUpdateRequest {
        operations,
        ..PartialUpdateRequest::default()
    }
}

// ============================================================
// Partial update
// ============================================================

#[tokio::test]
async fn successful_batch_is_written_back_once() {
    let (svc, store) = service();
    let report = svc
        .apply_partial_update(
            ID,
            &request(vec![
                json!({ "type": "disableNode", "nodeName": "Start" }),
                json!({ "type": "updateSettings", "settings": { "timezone": "Europe/Berlin" } }),
            ]),
        )
        .await
        .expect("update should succeed");

    assert_eq!(report.applied, Some(2));
    assert_eq!(report.failed, Some(0));
    assert!(report.persisted);
    assert_eq!(store.write_count(), 1);

    let written = store.last_write().unwrap();
    assert_eq!(written["nodes"][0]["disabled"], true);
    assert_eq!(written["settings"]["executionOrder"], "v1");
    assert_eq!(written["settings"]["timezone"], "Europe/Berlin");
    assert_eq!(written["tags"][0]["id"], "t-ops");
}

#[tokio::test]
async fn failed_lookup_causes_no_write() {
    let (svc, store) = service();
    let report = svc
        .apply_partial_update(ID, &request(vec![json!({ "type": "removeNode", "nodeName": "Missing" })]))
        .await
        .unwrap();

    assert_eq!(report.applied, Some(0));
    assert_eq!(report.failures[0].error, "Node not found: Missing");
    assert!(!report.persisted);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn atomic_failure_discards_earlier_operations() {
    let (svc, store) = service();
    let report = svc
        .apply_partial_update(
            ID,
            &request(vec![
                json!({ "type": "updateName", "name": "Renamed" }),
                json!({ "type": "removeNode", "nodeId": "zzz" }),
                json!({ "type": "disableNode", "nodeName": "Start" }),
            ]),
        )
        .await
        .unwrap();

    assert!(report.rolled_back);
    assert_eq!(report.operations.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.document(ID).unwrap()["name"], "Order intake");
}

#[tokio::test]
async fn continue_on_error_persists_the_successes() {
    let (svc, store) = service();
    let ops = vec![
        json!({ "type": "updateName", "name": "Renamed" }),
        json!({ "type": "removeNode", "nodeId": "zzz" }),
        json!({ "type": "teleportNode" }),
        json!({ "type": "addTag", "tagId": "t-new" }),
    ];
    let report = svc
        .apply_partial_update(ID, &PartialUpdateRequest { continue_on_error: true, ..request(ops.clone()) })
        .await
        .unwrap();

    assert_eq!(report.applied.unwrap() + report.failed.unwrap(), ops.len());
    assert!(report.persisted);
    assert_eq!(store.write_count(), 1);
    let written = store.last_write().unwrap();
    assert_eq!(written["name"], "Renamed");
    assert_eq!(written["tags"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn validate_only_never_writes() {
    let (svc, store) = service();
    let batches = vec![
        vec![json!({ "type": "disableNode", "nodeName": "Start" })],
        vec![json!({ "type": "removeNode", "nodeName": "Missing" })],
        vec![json!({ "type": "nonsense" }), json!(42)],
    ];

    for ops in batches {
        for continue_on_error in [false, true] {
            let req = PartialUpdateRequest {
                operations: ops.clone(),
                validate_only: true,
                continue_on_error,
            };
            let report = svc.apply_partial_update(ID, &req).await.unwrap();
            assert!(report.applied.is_none() && report.failed.is_none());
            assert!(report.would_apply.is_some() && report.would_fail.is_some());
            assert!(!report.persisted);
        }
    }

    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn dry_run_report_uses_would_counts_on_the_wire() {
    let (svc, _store) = service();
    let req = PartialUpdateRequest {
        operations: vec![json!({ "type": "disableNode", "nodeName": "Start" })],
        validate_only: true,
        continue_on_error: false,
    };
    let wire = serde_json::to_value(svc.apply_partial_update(ID, &req).await.unwrap()).unwrap();

    assert_eq!(wire["wouldApply"], 1);
    assert_eq!(wire["wouldFail"], 0);
    assert!(wire.get("applied").is_none());
    assert_eq!(wire["operations"][0], json!({ "index": 0, "type": "disableNode", "nodeName": "Start" }));
}

#[tokio::test]
async fn removed_node_leaves_dangling_connection_for_validation() {
    let (svc, _store) = service();
    svc.apply_partial_update(
        ID,
        &request(vec![
            json!({ "type": "removeNode", "nodeName": "Notify" }),
            json!({ "type": "addNode", "node": { "id": "b", "name": "Notify2", "type": "n8n-nodes-base.slack",
                                                  "typeVersion": 2, "position": [200, 0] } }),
        ]),
    )
    .await
    .unwrap();

    let report = svc.validate_workflow(ID, &ValidationOptions::default()).await.unwrap();
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].connection.as_deref(), Some("Start -> Notify"));
}

// ============================================================
// Validation
// ============================================================

#[tokio::test]
async fn validation_is_read_only_and_repeatable() {
    let (svc, store) = service();
    let first = svc.validate_workflow(ID, &ValidationOptions::default()).await.unwrap();
    let second = svc.validate_workflow(ID, &ValidationOptions::default()).await.unwrap();

    assert!(first.valid);
    assert_eq!(first, second);
    assert_eq!(first.summary.trigger_nodes, 1);
    assert_eq!(first.summary.expressions_checked, 1);
    assert_eq!(store.write_count(), 0);
}

// ============================================================
// Autofix
// ============================================================

#[tokio::test]
async fn autofix_preview_reports_without_writing() {
    let (svc, store) = service();
    let report = svc.autofix_workflow(ID, &FixOptions::default()).await.unwrap();

    assert_eq!(report.summary.fixes_found, 1);
    assert_eq!(report.summary.fixes[0].node, "Notify");
    assert_eq!(report.summary.fixes_applied, 0);
    assert!(!report.persisted);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn autofix_apply_is_idempotent() {
    let store = MockStore::with_workflow(
        ID,
        json!({
            "name": "legacy",
            "nodes": [{ "id": "a", "name": "Old Node", "type": "n8n-nodes-base.set", "position": [0, 0] }],
            "connections": {}
        }),
    );
    let svc = WorkflowService::new(Arc::new(store.clone()));
    let options = FixOptions {
        apply_fixes: true,
        confidence_threshold: Confidence::High,
        ..FixOptions::default()
    };

    let first = svc.autofix_workflow(ID, &options).await.unwrap();
    assert_eq!(first.summary.fixes_applied, 1);
    assert!(first.persisted);
    assert_eq!(store.document(ID).unwrap()["nodes"][0]["typeVersion"], 1.0);

    let second = svc.autofix_workflow(ID, &options).await.unwrap();
    assert_eq!(second.summary.fixes_applied, 0);
    assert!(!second.persisted);
    assert_eq!(store.write_count(), 1);
}

// ============================================================
// Transport failures
// ============================================================

#[tokio::test]
async fn unknown_workflow_is_a_remote_error() {
    let (svc, _store) = service();
    let err = svc
        .validate_workflow("nope", &ValidationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Remote(RemoteError::NotFound(id)) if id == "nope"));
}

#[tokio::test]
async fn store_outage_aborts_the_call() {
    let (svc, store) = service();
    store.fail_with("connection refused");

    let err = svc
        .apply_partial_update(ID, &request(vec![json!({ "type": "disableNode", "nodeName": "Start" })]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Remote(RemoteError::Unavailable(_))));
}

#[tokio::test]
async fn non_workflow_document_is_a_decode_error() {
    let store = MockStore::with_workflow(ID, json!({ "name": "x", "nodes": "not a list" }));
    let svc = WorkflowService::new(Arc::new(store));

    let err = svc.autofix_workflow(ID, &FixOptions::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::Decode { .. }));
}
