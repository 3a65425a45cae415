//! Application configuration options

use secrecy::SecretString;

use crate::api::log_stream::LogStreamOptions;
use crate::bulk::executor;
use crate::workers::status_poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Orchestrator API base URL
    pub backend_base_url: String,

    /// Bearer token for the orchestrator API
    pub api_token: Option<SecretString>,

    /// Status poller options
    pub status_poller: status_poller::Options,

    /// Log stream options
    pub log_stream: LogStreamOptions,

    /// Bulk executor options
    pub bulk: executor::Options,

    /// Page size for history fetches
    pub history_page_size: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "https://api.pipedeck.dev/orchestrator/v1".to_string(),
            api_token: None,
            status_poller: status_poller::Options::default(),
            log_stream: LogStreamOptions::default(),
            bulk: executor::Options::default(),
            history_page_size: 20,
        }
    }
}
