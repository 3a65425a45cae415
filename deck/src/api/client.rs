//! HTTP client implementation

use reqwest::{header, Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use orchestrator_api::models::ApiEnvelope;

use crate::errors::DeckError;

/// HTTP client for orchestrator communication
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, DeckError> {
        // Catch malformed base URLs before the first request does
        Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new HTTP client with a bearer token for authentication
    pub fn with_token(base_url: &str, token: SecretString) -> Result<Self, DeckError> {
        let mut client = Self::new(base_url)?;
        client.token = Some(token);
        Ok(client)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
        request
    }

    /// Make a GET request and unwrap the response envelope
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeckError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.request(Method::GET, &url).send().await?;
        Self::decode(response).await
    }

    /// Make a DELETE request and unwrap the response envelope
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeckError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {}", url);

        let response = self.request(Method::DELETE, &url).send().await?;
        Self::decode(response).await
    }

    /// Open a GET request for streaming without buffering the body
    pub async fn get_stream(&self, path: &str) -> Result<reqwest::Response, DeckError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} (stream)", url);

        let response = self.request(Method::GET, &url).send().await?;
        Self::check_status(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DeckError> {
        let response = Self::check_status(response).await?;

        let envelope: ApiEnvelope<T> = response.json().await?;
        let status = envelope.code.unwrap_or(200);
        let message = envelope.error_message();
        envelope.into_result().ok_or_else(|| {
            error!("Response envelope carried no result");
            DeckError::ApiError {
                status,
                message: message.unwrap_or_else(|| "response carried no result".to_string()),
            }
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DeckError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP request failed: {} {} - {}", status, url, body);

        if status == http::StatusCode::NOT_FOUND {
            return Err(DeckError::NotFound(url));
        }

        // Error bodies usually still carry the envelope; prefer its message
        let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|envelope| envelope.error_message())
            .unwrap_or(body);

        Err(DeckError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let client = HttpClient::new("https://example.test/orchestrator/").unwrap();
        assert_eq!(client.base_url(), "https://example.test/orchestrator");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let err = HttpClient::new("not a url").unwrap_err();
        assert!(matches!(err, DeckError::UrlError(_)));
    }

    #[test]
    fn test_with_token_keeps_the_secret() {
        let client =
            HttpClient::with_token("https://example.test", SecretString::from("t0ken".to_string()))
                .unwrap();
        assert_eq!(client.token.as_ref().unwrap().expose_secret(), "t0ken");
    }
}
