//! Deployment config snapshot endpoint

use tracing::debug;

use orchestrator_api::models::ConfigSnapshotResponseDto;

use crate::api::client::HttpClient;
use crate::errors::DeckError;
use crate::models::config::ConfigCollection;

/// Parameters identifying the config snapshot of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigQuery {
    pub app_name: String,
    pub env_name: String,
    pub pipeline_id: i64,
    pub workflow_id: i64,
}

impl ConfigQuery {
    fn query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("appName", &self.app_name)
            .append_pair("envName", &self.env_name)
            .append_pair("pipelineId", &self.pipeline_id.to_string())
            .append_pair("wfrId", &self.workflow_id.to_string());
        query.finish()
    }
}

impl HttpClient {
    /// Fetch the config snapshot a deployment ran with.
    ///
    /// `None` means the backend kept no snapshot for this run (the first
    /// deployment of a pipeline, or history pruned past it), which callers
    /// treat as "nothing to compare against" rather than a failure.
    pub async fn fetch_config_snapshot(
        &self,
        query: &ConfigQuery,
    ) -> Result<Option<ConfigCollection>, DeckError> {
        let path = format!("/app/deployment-config?{}", query.query_string());

        match self.get::<ConfigSnapshotResponseDto>(&path).await {
            Ok(dto) => Ok(Some(ConfigCollection::from(dto))),
            Err(e) if e.is_not_found() => {
                debug!(
                    "No config snapshot for workflow {} of pipeline {}",
                    query.workflow_id, query.pipeline_id
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_escapes_names() {
        let query = ConfigQuery {
            app_name: "orders api".to_string(),
            env_name: "prod/eu".to_string(),
            pipeline_id: 7,
            workflow_id: 42,
        };
        assert_eq!(
            query.query_string(),
            "appName=orders+api&envName=prod%2Feu&pipelineId=7&wfrId=42"
        );
    }
}
