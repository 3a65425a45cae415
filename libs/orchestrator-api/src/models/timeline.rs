//! Deployment timeline wire types
//!
//! The timeline endpoint reports a deployment as a list of timestamped status
//! events plus an aggregate status. Field casing is inconsistent on the wire
//! (older endpoints emit snake_case, newer ones camelCase), hence the alias
//! attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /app/{appId}/env/{envId}/timeline`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponseDto {
    /// Workflow-runner id of the deployment this timeline belongs to.
    #[serde(default, alias = "wfr_id")]
    pub wfr_id: Option<i64>,

    /// Pipeline the deployment was triggered on.
    #[serde(default, alias = "pipeline_id")]
    pub pipeline_id: Option<i64>,

    /// Legacy duplicate of the run id kept by some backend versions.
    #[serde(default, alias = "cd_workflow_id")]
    pub cd_workflow_id: Option<i64>,

    #[serde(default)]
    pub timelines: Vec<TimelineEventDto>,

    /// Aggregate status string, e.g. "Healthy", "Progressing", "Failed".
    #[serde(default, alias = "deployment_status")]
    pub deployment_status: Option<String>,

    #[serde(default, alias = "deployment_started_on")]
    pub deployment_started_on: Option<DateTime<Utc>>,

    #[serde(default, alias = "deployment_finished_on")]
    pub deployment_finished_on: Option<DateTime<Utc>>,
}

/// One backend-reported status transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventDto {
    /// Status code, e.g. "GIT_COMMIT", "KUBECTL_APPLY_STARTED".
    pub status: Option<String>,

    #[serde(default, alias = "status_detail")]
    pub status_detail: Option<String>,

    #[serde(default, alias = "status_time")]
    pub status_time: Option<DateTime<Utc>>,

    /// Per-object sync state, attached to apply/health events only.
    #[serde(default, alias = "resource_details")]
    pub resource_details: Option<Vec<ResourceDetailDto>>,
}

/// Sync status of a single Kubernetes object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDetailDto {
    #[serde(default, alias = "resource_kind")]
    pub resource_kind: Option<String>,

    #[serde(default, alias = "resource_name")]
    pub resource_name: Option<String>,

    #[serde(default, alias = "resource_status")]
    pub resource_status: Option<String>,

    #[serde(default, alias = "status_message")]
    pub status_message: Option<String>,
}
