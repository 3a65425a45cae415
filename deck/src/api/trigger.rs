//! Deployment trigger endpoints: manual sync and abort

use tracing::info;

use crate::api::client::HttpClient;
use crate::errors::DeckError;

impl HttpClient {
    /// Ask the orchestrator to re-sync an application's deployed state.
    pub async fn trigger_manual_sync(&self, app_id: i64, env_id: i64) -> Result<(), DeckError> {
        let path = format!("/app/{}/env/{}/deployment/manual-sync", app_id, env_id);
        let _: serde_json::Value = self.get(&path).await?;
        info!("Manual sync triggered for app {} env {}", app_id, env_id);
        Ok(())
    }

    /// Abort a running deployment workflow.
    pub async fn abort_workflow(&self, pipeline_id: i64, workflow_id: i64) -> Result<(), DeckError> {
        let path = format!("/pipeline/{}/workflow/{}", pipeline_id, workflow_id);
        let _: serde_json::Value = self.delete(&path).await?;
        info!(
            "Abort requested for workflow {} of pipeline {}",
            workflow_id, pipeline_id
        );
        Ok(())
    }
}
