//! Deployment history wire types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of the paged deployment history endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponseDto {
    #[serde(default, alias = "cd_workflows")]
    pub cd_workflows: Vec<HistoryRecordDto>,
}

/// One past (or running) deployment of a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecordDto {
    /// Workflow-runner id; identifies the deployment run.
    pub id: Option<i64>,

    #[serde(default, alias = "cd_workflow_id")]
    pub cd_workflow_id: Option<i64>,

    #[serde(default, alias = "pipeline_id")]
    pub pipeline_id: Option<i64>,

    #[serde(default, alias = "trigger_id")]
    pub trigger_id: Option<i64>,

    #[serde(default)]
    pub status: Option<String>,

    /// Pod status of the triggered workload, reported by older backends only.
    #[serde(default, alias = "pod_status")]
    pub pod_status: Option<String>,

    #[serde(default, alias = "started_on")]
    pub started_on: Option<DateTime<Utc>>,

    #[serde(default, alias = "finished_on")]
    pub finished_on: Option<DateTime<Utc>>,

    /// Image/chart that was deployed.
    #[serde(default)]
    pub artifact: Option<String>,

    /// Git material that triggered the run, keyed by material id.
    #[serde(default, alias = "git_triggers")]
    pub git_triggers: Option<BTreeMap<String, GitTriggerDto>>,

    #[serde(default, alias = "triggered_by")]
    pub triggered_by: Option<i64>,

    #[serde(default, alias = "triggered_by_email")]
    pub triggered_by_email: Option<String>,

    /// "argo_cd" or "helm".
    #[serde(default, alias = "deployment_app_type")]
    pub deployment_app_type: Option<String>,

    #[serde(default, alias = "is_virtual_environment")]
    pub is_virtual_environment: Option<bool>,
}

/// Commit that triggered a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitTriggerDto {
    #[serde(default, alias = "commit_hash", alias = "Commit")]
    pub commit_hash: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}
