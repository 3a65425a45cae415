//! Deployment timeline endpoint

use async_trait::async_trait;
use tracing::debug;

use orchestrator_api::models::TimelineResponseDto;

use crate::api::client::HttpClient;
use crate::errors::DeckError;
use crate::models::timeline::DeploymentTimeline;

/// Route parameters identifying one deployment's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineQuery {
    pub app_id: i64,
    pub env_id: i64,

    /// Specific trigger to inspect; the latest deployment when absent.
    pub trigger_id: Option<i64>,
}

/// Anything that can produce the current timeline for a deployment target.
///
/// The poller takes this instead of `HttpClient` directly so tests can feed
/// it scripted timelines.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_timeline(&self, query: &TimelineQuery) -> Result<DeploymentTimeline, DeckError>;
}

#[async_trait]
impl TimelineSource for HttpClient {
    async fn fetch_timeline(&self, query: &TimelineQuery) -> Result<DeploymentTimeline, DeckError> {
        let mut path = format!(
            "/app/{}/env/{}/deployment/timeline?showTimeline=true",
            query.app_id, query.env_id
        );
        if let Some(trigger_id) = query.trigger_id {
            path.push_str(&format!("&triggerId={}", trigger_id));
        }

        let dto: TimelineResponseDto = self.get(&path).await?;
        let timeline = DeploymentTimeline::try_from(dto)?;
        debug!(
            "Fetched timeline for workflow {}: {} events, status {:?}",
            timeline.workflow_id,
            timeline.events.len(),
            timeline.status
        );
        Ok(timeline)
    }
}
