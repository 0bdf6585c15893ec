//! Adapter to the remote recommendation function.
//!
//! The adapter is a passthrough: it owns no session state and never retries.
//! Failures keep the HTTP status when one exists so the sequencer can classify
//! rate limiting (429) and exhausted credits (402) without parsing text.

use std::time::Duration;

use async_trait::async_trait;
use copilot_core::config::ServiceConfig;
use copilot_core::domain::run::RunType;
use copilot_core::errors::ServiceError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub client_brief: String,
    pub run_type: RunType,
}

impl RecommendationRequest {
    pub fn new(client_brief: impl Into<String>, run_type: RunType) -> Self {
        Self { client_brief: client_brief.into(), run_type }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    recommendation: String,
}

#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn recommend(&self, request: &RecommendationRequest) -> Result<String, ServiceError>;
}

pub struct HttpRecommendationClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpRecommendationClient {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let mut builder = Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().map_err(transport_error)?;

        Ok(Self { client, endpoint: config.endpoint(), api_key: config.api_key.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecommendationService for HttpRecommendationClient {
    async fn recommend(&self, request: &RecommendationRequest) -> Result<String, ServiceError> {
        let mut call = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key.expose_secret()).header("apikey", api_key.expose_secret());
        }

        let response = call.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        debug!(
            event_name = "recommender.response",
            status = status.as_u16(),
            run_type = request.run_type.as_str(),
            body_bytes = body.len(),
            "recommendation service responded"
        );

        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("unexpected status");
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| fallback.to_string()),
            });
        }

        serde_json::from_str::<RecommendationResponse>(&body)
            .map(|payload| payload.recommendation)
            .map_err(|error| ServiceError::MalformedResponse(error.to_string()))
    }
}

/// The request URL is stripped so host or port digits never reach classification.
fn transport_error(error: reqwest::Error) -> ServiceError {
    if let Some(status) = error.status() {
        let message = error.without_url().to_string();
        return ServiceError::Status { status: status.as_u16(), message };
    }
    ServiceError::Transport(error.without_url().to_string())
}

fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }

    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
