use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::auth::TokenSource;
use crate::errors::{ChatError, ChatResult};
use crate::types::*;

/// Anything that can answer a `generateContent` request
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> ChatResult<GenerateContentResponse>;
}

/// Where requests go
#[derive(Debug, Clone, PartialEq)]
pub struct VertexConfig {
    pub project: String,
    pub location: String,
    pub model: String,
    /// Overrides the `https://{location}-aiplatform.googleapis.com` host
    pub api_endpoint: Option<String>,
}

impl VertexConfig {
    /// Get the base API host for the configured location
    pub fn base_url(&self) -> String {
        if let Some(endpoint) = &self.api_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }

        if self.location == "global" {
            "https://aiplatform.googleapis.com".to_string()
        } else {
            format!("https://{}-aiplatform.googleapis.com", self.location)
        }
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url(),
            self.project,
            self.location,
            self.model
        )
    }
}

/// Client for the Vertex AI Gemini endpoint
#[derive(Debug, Clone)]
pub struct VertexClient {
    client: Client,
    config: VertexConfig,
    tokens: Arc<dyn TokenSource>,
}

impl VertexClient {
    /// Credentials are handed in directly; nothing is read from the environment
    pub fn new(config: VertexConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            config,
            tokens,
        }
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }
}

#[async_trait]
impl ContentGenerator for VertexClient {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> ChatResult<GenerateContentResponse> {
        let url = self.config.generate_content_url();
        let token = self.tokens.access_token().await?;

        debug!(model = %self.config.model, "Sending generateContent request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                ChatError::RequestError(format!("Failed to read error response: {}", e))
            })?;

            error!(status = status.as_u16(), "generateContent failed");
            return Err(ChatError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ChatError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }
}
