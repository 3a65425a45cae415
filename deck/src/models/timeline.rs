//! Deployment timeline models

use chrono::{DateTime, Utc};
use orchestrator_api::models::{ResourceDetailDto, TimelineEventDto, TimelineResponseDto};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::DeckError;

/// Backend-reported timeline status codes.
///
/// Several codes collapse onto one breakdown stage (e.g. `GIT_COMMIT` and
/// `GIT_COMMIT_FAILED` are both git-stage codes); the mapping lives in
/// `breakdown::stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineStatus {
    DeploymentInitiated,
    GitCommit,
    GitCommitFailed,
    ArgocdSync,
    ArgocdSyncFailed,
    KubectlApplyStarted,
    KubectlApplySynced,
    KubectlApplyFailed,
    Healthy,
    Degraded,
    DeploymentTimedOut,
    UnableToFetchStatus,
    DeploymentSuperseded,
    HelmPackageGenerated,
    HelmPackageGenerationFailed,
    HelmManifestPushedToHelmRepo,
    HelmManifestPushFailed,
}

impl TimelineStatus {
    /// Parse a wire status code. Unknown codes yield None so that newer
    /// backends never break older clients.
    pub fn from_wire(s: &str) -> Option<Self> {
        let status = match s {
            "DEPLOYMENT_INITIATED" => Self::DeploymentInitiated,
            "GIT_COMMIT" => Self::GitCommit,
            "GIT_COMMIT_FAILED" => Self::GitCommitFailed,
            "ARGOCD_SYNC" => Self::ArgocdSync,
            "ARGOCD_SYNC_FAILED" => Self::ArgocdSyncFailed,
            "KUBECTL_APPLY_STARTED" => Self::KubectlApplyStarted,
            "KUBECTL_APPLY_SYNCED" => Self::KubectlApplySynced,
            "KUBECTL_APPLY_FAILED" => Self::KubectlApplyFailed,
            "HEALTHY" => Self::Healthy,
            "DEGRADED" => Self::Degraded,
            "DEPLOYMENT_TIMED_OUT" => Self::DeploymentTimedOut,
            "UNABLE_TO_FETCH_STATUS" => Self::UnableToFetchStatus,
            "DEPLOYMENT_SUPERSEDED" => Self::DeploymentSuperseded,
            "HELM_PACKAGE_GENERATED" => Self::HelmPackageGenerated,
            "HELM_PACKAGE_GENERATION_FAILED" => Self::HelmPackageGenerationFailed,
            "HELM_MANIFEST_PUSHED_TO_HELM_REPO" => Self::HelmManifestPushedToHelmRepo,
            "HELM_MANIFEST_PUSH_FAILED" => Self::HelmManifestPushFailed,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeploymentInitiated => "DEPLOYMENT_INITIATED",
            Self::GitCommit => "GIT_COMMIT",
            Self::GitCommitFailed => "GIT_COMMIT_FAILED",
            Self::ArgocdSync => "ARGOCD_SYNC",
            Self::ArgocdSyncFailed => "ARGOCD_SYNC_FAILED",
            Self::KubectlApplyStarted => "KUBECTL_APPLY_STARTED",
            Self::KubectlApplySynced => "KUBECTL_APPLY_SYNCED",
            Self::KubectlApplyFailed => "KUBECTL_APPLY_FAILED",
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED",
            Self::DeploymentTimedOut => "DEPLOYMENT_TIMED_OUT",
            Self::UnableToFetchStatus => "UNABLE_TO_FETCH_STATUS",
            Self::DeploymentSuperseded => "DEPLOYMENT_SUPERSEDED",
            Self::HelmPackageGenerated => "HELM_PACKAGE_GENERATED",
            Self::HelmPackageGenerationFailed => "HELM_PACKAGE_GENERATION_FAILED",
            Self::HelmManifestPushedToHelmRepo => "HELM_MANIFEST_PUSHED_TO_HELM_REPO",
            Self::HelmManifestPushFailed => "HELM_MANIFEST_PUSH_FAILED",
        }
    }

    /// Whether the code reports a stage failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::GitCommitFailed
                | Self::ArgocdSyncFailed
                | Self::KubectlApplyFailed
                | Self::Degraded
                | Self::DeploymentTimedOut
                | Self::UnableToFetchStatus
                | Self::HelmPackageGenerationFailed
                | Self::HelmManifestPushFailed
        )
    }

    /// Whether the code ends the deployment attempt, successfully or not.
    pub fn is_settling(&self) -> bool {
        matches!(
            self,
            Self::Healthy
                | Self::Degraded
                | Self::DeploymentTimedOut
                | Self::UnableToFetchStatus
                | Self::DeploymentSuperseded
                | Self::HelmManifestPushedToHelmRepo
                | Self::HelmManifestPushFailed
                | Self::HelmPackageGenerationFailed
        ) || self.is_failure()
    }
}

/// Aggregate deployment status, as reported next to the timeline.
///
/// The wire value is free-form text; parsing is case-insensitive and
/// ignores separators, so "TIMED_OUT", "TimedOut" and "timedout" agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStatus {
    Succeeded,
    Healthy,
    Failed,
    Error,
    Cancelled,
    Aborted,
    Starting,
    Running,
    Pending,
    Waiting,
    Progressing,
    Degraded,
    TimedOut,
    Unknown,
}

impl AggregateStatus {
    pub fn parse(s: &str) -> Self {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "succeeded" => Self::Succeeded,
            "healthy" => Self::Healthy,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "cancelled" | "canceled" => Self::Cancelled,
            "aborted" => Self::Aborted,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "pending" => Self::Pending,
            "waiting" => Self::Waiting,
            "progressing" | "inprogress" => Self::Progressing,
            "degraded" => Self::Degraded,
            "timedout" => Self::TimedOut,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Healthy => "healthy",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Aborted => "aborted",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Progressing => "progressing",
            Self::Degraded => "degraded",
            Self::TimedOut => "timedout",
            Self::Unknown => "unknown",
        }
    }

    /// Terminal statuses: the deployment is over and will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::Healthy
                | Self::Failed
                | Self::Error
                | Self::Cancelled
                | Self::Aborted
        )
    }

    /// Actively transitioning statuses: the deployment is moving and worth
    /// watching closely.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Starting | Self::Running | Self::Pending)
    }
}

impl serde::Serialize for AggregateStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for AggregateStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AggregateStatus::parse(&s))
    }
}

/// How the deployment reaches the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentAppType {
    ArgoCd,
    Helm,
}

impl DeploymentAppType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "argo_cd" | "argocd" | "gitops" => Some(Self::ArgoCd),
            "helm" => Some(Self::Helm),
            _ => None,
        }
    }
}

/// Sync status of a single Kubernetes object, shown under the apply stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDetail {
    pub kind: String,
    pub name: String,
    pub status: String,
    pub message: String,
}

impl From<ResourceDetailDto> for ResourceDetail {
    fn from(dto: ResourceDetailDto) -> Self {
        Self {
            kind: dto.resource_kind.unwrap_or_default(),
            name: dto.resource_name.unwrap_or_default(),
            status: dto.resource_status.unwrap_or_default(),
            message: dto.status_message.unwrap_or_default(),
        }
    }
}

/// One timeline transition, immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub status: TimelineStatus,
    pub detail: String,
    pub time: DateTime<Utc>,
    pub resources: Vec<ResourceDetail>,
}

/// Canonical timeline of one deployment run.
///
/// Events keep their received order; the backend emits them ascending by
/// time and the reducer's tie-break depends on that order being preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTimeline {
    /// Workflow-runner id of this deployment.
    pub workflow_id: i64,

    pub pipeline_id: i64,

    pub status: AggregateStatus,

    pub started_on: Option<DateTime<Utc>>,

    pub finished_on: Option<DateTime<Utc>>,

    pub events: Vec<TimelineEvent>,
}

impl DeploymentTimeline {
    /// Whether the deployment attempt has come to rest: either the aggregate
    /// status is terminal or some event already settled the run.
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
            || self.finished_on.is_some()
            || self.events.iter().any(|e| e.status.is_settling())
    }

    pub fn latest_event(&self) -> Option<&TimelineEvent> {
        self.events.last()
    }
}

impl TryFrom<TimelineResponseDto> for DeploymentTimeline {
    type Error = DeckError;

    fn try_from(dto: TimelineResponseDto) -> Result<Self, Self::Error> {
        let workflow_id = dto.wfr_id.ok_or(DeckError::MissingField("wfrId"))?;
        let pipeline_id = dto.pipeline_id.ok_or(DeckError::MissingField("pipelineId"))?;

        let status = dto
            .deployment_status
            .as_deref()
            .map(AggregateStatus::parse)
            .unwrap_or(AggregateStatus::Unknown);

        let events = dto
            .timelines
            .into_iter()
            .filter_map(normalize_event)
            .collect();

        Ok(Self {
            workflow_id,
            pipeline_id,
            status,
            started_on: dto.deployment_started_on,
            finished_on: dto.deployment_finished_on,
            events,
        })
    }
}

/// Shape one wire event. Events without a recognizable status or a
/// timestamp carry nothing the breakdown can use and are dropped.
fn normalize_event(dto: TimelineEventDto) -> Option<TimelineEvent> {
    let raw_status = dto.status?;
    let Some(status) = TimelineStatus::from_wire(&raw_status) else {
        debug!("Skipping timeline event with unknown status: {}", raw_status);
        return None;
    };
    let Some(time) = dto.status_time else {
        debug!("Skipping timeline event without a timestamp: {}", raw_status);
        return None;
    };

    Some(TimelineEvent {
        status,
        detail: dto.status_detail.unwrap_or_default(),
        time,
        resources: dto
            .resource_details
            .unwrap_or_default()
            .into_iter()
            .map(ResourceDetail::from)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline_dto(wfr_id: Option<i64>, pipeline_id: Option<i64>) -> TimelineResponseDto {
        TimelineResponseDto {
            wfr_id,
            pipeline_id,
            deployment_status: Some("Progressing".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_required_ids_are_typed_errors() {
        let err = DeploymentTimeline::try_from(timeline_dto(None, Some(4))).unwrap_err();
        assert!(matches!(err, DeckError::MissingField("wfrId")));

        let err = DeploymentTimeline::try_from(timeline_dto(Some(9), None)).unwrap_err();
        assert!(matches!(err, DeckError::MissingField("pipelineId")));
    }

    #[test]
    fn test_unknown_event_statuses_are_skipped_not_fatal() {
        let mut dto = timeline_dto(Some(9), Some(4));
        dto.timelines = vec![
            TimelineEventDto {
                status: Some("GIT_COMMIT".to_string()),
                status_time: Some(Utc::now()),
                ..Default::default()
            },
            TimelineEventDto {
                status: Some("SOMETHING_NEW".to_string()),
                status_time: Some(Utc::now()),
                ..Default::default()
            },
            TimelineEventDto {
                status: Some("HEALTHY".to_string()),
                status_time: None, // no timestamp, dropped
                ..Default::default()
            },
        ];

        let timeline = DeploymentTimeline::try_from(dto).unwrap();
        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.events[0].status, TimelineStatus::GitCommit);
    }

    #[test]
    fn test_aggregate_status_parse_is_case_and_separator_insensitive() {
        assert_eq!(AggregateStatus::parse("Healthy"), AggregateStatus::Healthy);
        assert_eq!(AggregateStatus::parse("TIMED_OUT"), AggregateStatus::TimedOut);
        assert_eq!(AggregateStatus::parse("in-progress"), AggregateStatus::Progressing);
        assert_eq!(AggregateStatus::parse("weird"), AggregateStatus::Unknown);
    }

    #[test]
    fn test_settled_via_event_even_when_aggregate_lags() {
        let mut dto = timeline_dto(Some(9), Some(4));
        dto.timelines = vec![TimelineEventDto {
            status: Some("HEALTHY".to_string()),
            status_time: Some(Utc::now()),
            ..Default::default()
        }];
        let timeline = DeploymentTimeline::try_from(dto).unwrap();
        assert!(timeline.is_settled());
    }

    #[test]
    fn test_wire_roundtrip_of_timeline_status() {
        for status in [
            TimelineStatus::DeploymentInitiated,
            TimelineStatus::GitCommitFailed,
            TimelineStatus::KubectlApplyStarted,
            TimelineStatus::HelmManifestPushedToHelmRepo,
        ] {
            assert_eq!(TimelineStatus::from_wire(status.as_str()), Some(status));
        }
        assert_eq!(TimelineStatus::from_wire("NOT_A_STATUS"), None);
    }
}
