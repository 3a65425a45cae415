//! Wire normalization tests
//!
//! Raw backend JSON in both field casings through the DTO layer and into
//! the canonical models.

use orchestrator_api::models::{ApiEnvelope, ConfigSnapshotResponseDto, TimelineResponseDto};
use pipedeck::errors::DeckError;
use pipedeck::models::config::ConfigCollection;
use pipedeck::models::history::{normalize_history, preceding};
use pipedeck::models::timeline::{AggregateStatus, DeploymentTimeline, TimelineStatus};

#[test]
fn test_timeline_payload_normalizes_from_camel_case() {
    let payload = r#"{
        "wfrId": 311,
        "pipelineId": 7,
        "deploymentStatus": "Progressing",
        "deploymentStartedOn": "2025-11-02T10:00:00Z",
        "timelines": [
            {
                "status": "GIT_COMMIT",
                "statusDetail": "manifest pushed",
                "statusTime": "2025-11-02T10:00:05Z"
            }
        ]
    }"#;

    let dto: TimelineResponseDto = serde_json::from_str(payload).unwrap();
    let timeline = DeploymentTimeline::try_from(dto).unwrap();

    assert_eq!(timeline.workflow_id, 311);
    assert_eq!(timeline.pipeline_id, 7);
    assert_eq!(timeline.status, AggregateStatus::Progressing);
    assert!(timeline.started_on.is_some());
    assert_eq!(timeline.events.len(), 1);
    assert_eq!(timeline.events[0].status, TimelineStatus::GitCommit);
    assert_eq!(timeline.events[0].detail, "manifest pushed");
    assert!(!timeline.is_settled());
}

#[test]
fn test_legacy_snake_case_payload_parses_identically() {
    let camel = r#"{
        "wfrId": 311,
        "pipelineId": 7,
        "deploymentStatus": "Healthy",
        "timelines": [
            { "status": "HEALTHY", "statusTime": "2025-11-02T10:00:41Z" }
        ]
    }"#;
    let snake = r#"{
        "wfr_id": 311,
        "pipeline_id": 7,
        "deployment_status": "Healthy",
        "timelines": [
            { "status": "HEALTHY", "status_time": "2025-11-02T10:00:41Z" }
        ]
    }"#;

    let from_camel =
        DeploymentTimeline::try_from(serde_json::from_str::<TimelineResponseDto>(camel).unwrap())
            .unwrap();
    let from_snake =
        DeploymentTimeline::try_from(serde_json::from_str::<TimelineResponseDto>(snake).unwrap())
            .unwrap();

    assert_eq!(from_camel, from_snake);
}

#[test]
fn test_missing_identifiers_fail_with_the_field_name() {
    let dto: TimelineResponseDto = serde_json::from_str(r#"{ "pipelineId": 7 }"#).unwrap();
    assert!(matches!(
        DeploymentTimeline::try_from(dto).unwrap_err(),
        DeckError::MissingField("wfrId")
    ));

    let dto: TimelineResponseDto = serde_json::from_str(r#"{ "wfrId": 311 }"#).unwrap();
    assert!(matches!(
        DeploymentTimeline::try_from(dto).unwrap_err(),
        DeckError::MissingField("pipelineId")
    ));
}

#[test]
fn test_history_page_normalizes_records_and_defaults() {
    let payload = r#"{
        "cdWorkflows": [
            {
                "id": 42,
                "pipelineId": 7,
                "status": "Succeeded",
                "startedOn": "2025-11-01T12:00:00Z",
                "finishedOn": "2025-11-01T12:04:10Z",
                "artifact": "registry/app:2025.11.01",
                "triggeredByEmail": "dev@example.com",
                "deploymentAppType": "argo_cd",
                "gitTriggers": {
                    "12": { "commitHash": "abc123", "message": "fix login", "author": "dev" }
                }
            },
            { "cdWorkflowId": 41, "pipelineId": 7 }
        ]
    }"#;

    let records = normalize_history(serde_json::from_str(payload).unwrap()).unwrap();
    assert_eq!(records.len(), 2);

    let latest = &records[0];
    assert_eq!(latest.workflow_id, 42);
    assert_eq!(latest.status, AggregateStatus::Succeeded);
    assert_eq!(latest.artifact, "registry/app:2025.11.01");
    assert_eq!(latest.triggered_by_email, "dev@example.com");
    assert_eq!(
        latest.git_triggers.get("12").map(|t| t.commit_hash.as_str()),
        Some("abc123")
    );

    // Sparse legacy record: run id from cdWorkflowId, everything else at
    // its default.
    let older = &records[1];
    assert_eq!(older.workflow_id, 41);
    assert_eq!(older.status, AggregateStatus::Unknown);
    assert_eq!(older.artifact, "");
    assert!(older.git_triggers.is_empty());
    assert!(older.app_type.is_none());
    assert!(!older.is_virtual_environment);

    // Newest-first pages make the next entry the comparison base.
    assert_eq!(preceding(&records, 42).map(|r| r.workflow_id), Some(41));
    assert!(preceding(&records, 41).is_none());
}

#[test]
fn test_history_record_without_any_run_id_fails_the_page() {
    let payload = r#"{ "cdWorkflows": [ { "pipelineId": 7 } ] }"#;
    let err = normalize_history(serde_json::from_str(payload).unwrap()).unwrap_err();
    assert!(matches!(err, DeckError::MissingField("id")));
}

#[test]
fn test_envelope_unwraps_results_and_joins_errors() {
    let ok: ApiEnvelope<Vec<i64>> =
        serde_json::from_str(r#"{ "code": 200, "status": "OK", "result": [1, 2] }"#).unwrap();
    assert_eq!(ok.into_result(), Some(vec![1, 2]));

    let failed: ApiEnvelope<Vec<i64>> = serde_json::from_str(
        r#"{
            "code": 403,
            "status": "Forbidden",
            "errors": [
                { "code": "4030", "userMessage": "not authorized" },
                { "code": "4031", "internalMessage": "rbac denied for app 3" }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(
        failed.error_message().as_deref(),
        Some("not authorized; rbac denied for app 3")
    );
    assert!(failed.into_result().is_none());

    // No errors array at all: the status line is the best we have.
    let bare: ApiEnvelope<Vec<i64>> =
        serde_json::from_str(r#"{ "code": 500, "status": "Internal Server Error" }"#).unwrap();
    assert_eq!(bare.error_message().as_deref(), Some("Internal Server Error"));
}

#[test]
fn test_config_snapshot_parses_documents_and_variables() {
    let payload = r#"{
        "deploymentTemplate": {
            "codeEditorValue": {
                "value": "{\"replicas\":\"@{{replicas}}\"}",
                "variableSnapshot": { "replicas": "3" }
            }
        },
        "configMapData": { "configData": [
            {
                "name": "app-settings",
                "values": {
                    "mountPath": { "displayName": "Mount path", "value": "/etc/app" }
                },
                "codeEditorValue": { "value": "{}" }
            }
        ]},
        "isAppAdmin": true
    }"#;

    let dto: ConfigSnapshotResponseDto = serde_json::from_str(payload).unwrap();
    let collection = ConfigCollection::from(dto);

    let keys: Vec<&str> = collection.resources.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["deployment-template", "configmap/app-settings"]);
    assert!(collection.is_app_admin);

    let template = collection.get("deployment-template").unwrap();
    let editor = template.snapshot.code_editor_value.as_ref().unwrap();
    assert_eq!(editor.value, r#"{"replicas":"@{{replicas}}"}"#);
    assert_eq!(
        editor.variable_snapshot.get("replicas").map(String::as_str),
        Some("3")
    );

    let settings = collection.get("configmap/app-settings").unwrap();
    let mount = &settings.snapshot.values["mountPath"];
    assert_eq!(mount.display_name, "Mount path");
    assert_eq!(mount.value, serde_json::json!("/etc/app"));
}
