//! Deployment history models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use orchestrator_api::models::{GitTriggerDto, HistoryRecordDto, HistoryResponseDto};
use serde::{Deserialize, Serialize};

use crate::errors::DeckError;
use crate::models::timeline::{AggregateStatus, DeploymentAppType};

/// Commit that triggered a deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitTrigger {
    pub commit_hash: String,
    pub message: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
}

impl From<GitTriggerDto> for GitTrigger {
    fn from(dto: GitTriggerDto) -> Self {
        Self {
            commit_hash: dto.commit_hash.unwrap_or_default(),
            message: dto.message.unwrap_or_default(),
            author: dto.author.unwrap_or_default(),
            date: dto.date,
        }
    }
}

/// One deployment run from the paged history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentHistoryRecord {
    /// Workflow-runner id; identifies the run.
    pub workflow_id: i64,

    pub pipeline_id: i64,

    pub trigger_id: Option<i64>,

    pub status: AggregateStatus,

    pub started_on: Option<DateTime<Utc>>,

    pub finished_on: Option<DateTime<Utc>>,

    pub artifact: String,

    pub git_triggers: BTreeMap<String, GitTrigger>,

    pub triggered_by_email: String,

    pub app_type: Option<DeploymentAppType>,

    pub is_virtual_environment: bool,
}

impl TryFrom<HistoryRecordDto> for DeploymentHistoryRecord {
    type Error = DeckError;

    fn try_from(dto: HistoryRecordDto) -> Result<Self, Self::Error> {
        // Older backends report the run id only under cd_workflow_id.
        let workflow_id = dto
            .id
            .or(dto.cd_workflow_id)
            .ok_or(DeckError::MissingField("id"))?;
        let pipeline_id = dto.pipeline_id.ok_or(DeckError::MissingField("pipelineId"))?;

        Ok(Self {
            workflow_id,
            pipeline_id,
            trigger_id: dto.trigger_id,
            status: dto
                .status
                .as_deref()
                .map(AggregateStatus::parse)
                .unwrap_or(AggregateStatus::Unknown),
            started_on: dto.started_on,
            finished_on: dto.finished_on,
            artifact: dto.artifact.unwrap_or_default(),
            git_triggers: dto
                .git_triggers
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, GitTrigger::from(v)))
                .collect(),
            triggered_by_email: dto.triggered_by_email.unwrap_or_default(),
            app_type: dto.deployment_app_type.as_deref().and_then(DeploymentAppType::parse),
            is_virtual_environment: dto.is_virtual_environment.unwrap_or(false),
        })
    }
}

/// Normalize a history page. Records missing their identifiers are a
/// backend contract violation and fail the whole page.
pub fn normalize_history(dto: HistoryResponseDto) -> Result<Vec<DeploymentHistoryRecord>, DeckError> {
    dto.cd_workflows
        .into_iter()
        .map(DeploymentHistoryRecord::try_from)
        .collect()
}

/// The deployment that ran immediately before `workflow_id`, used as the
/// comparison base for config diffs. Records arrive newest-first.
pub fn preceding(
    records: &[DeploymentHistoryRecord],
    workflow_id: i64,
) -> Option<&DeploymentHistoryRecord> {
    let idx = records.iter().position(|r| r.workflow_id == workflow_id)?;
    records.get(idx + 1)
}
