//! Response envelope
//!
//! Every JSON body from the orchestrator is wrapped in the same envelope:
//! `{ "code": 200, "status": "OK", "result": { ... } }`, with an `errors`
//! array instead of `result` on failures.

use serde::{Deserialize, Serialize};

/// Standard response wrapper around every endpoint's payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: Option<u16>,

    pub status: Option<String>,

    pub result: Option<T>,

    #[serde(default)]
    pub errors: Vec<ApiErrorDto>,
}

/// A single backend-reported error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDto {
    pub code: Option<String>,

    #[serde(default, alias = "user_message")]
    pub user_message: Option<String>,

    #[serde(default, alias = "internal_message")]
    pub internal_message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Take the payload out of the envelope, if the backend sent one.
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// Best human-readable summary of the backend-reported errors.
    pub fn error_message(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        for err in &self.errors {
            if let Some(msg) = err.user_message.as_deref().or(err.internal_message.as_deref()) {
                parts.push(msg);
            }
        }
        if parts.is_empty() {
            self.status.clone()
        } else {
            Some(parts.join("; "))
        }
    }
}
