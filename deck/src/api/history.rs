//! Deployment history endpoint

use tracing::debug;

use orchestrator_api::models::HistoryResponseDto;

use crate::api::client::HttpClient;
use crate::errors::DeckError;
use crate::models::history::{normalize_history, DeploymentHistoryRecord};

/// Route and paging parameters for one pipeline's deployment history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub app_id: i64,
    pub env_id: i64,
    pub pipeline_id: i64,

    /// Zero-based offset into the newest-first list.
    pub offset: usize,
    pub size: usize,
}

impl HttpClient {
    /// Fetch one page of deployment history, newest first.
    pub async fn fetch_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<Vec<DeploymentHistoryRecord>, DeckError> {
        let path = format!(
            "/app/{}/env/{}/pipeline/{}/deployments?offset={}&size={}",
            query.app_id, query.env_id, query.pipeline_id, query.offset, query.size
        );

        let dto: HistoryResponseDto = self.get(&path).await?;
        let records = normalize_history(dto)?;
        debug!(
            "Fetched {} history records for pipeline {}",
            records.len(),
            query.pipeline_id
        );
        Ok(records)
    }
}
