use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::OpenRouterConfig;

use super::inference::{build_request, parse_response, OPENROUTER_API_URL};

/// Single opaque failure type for proposal generation. Callers never branch
/// on the cause; any failure routes to the fallback template.
#[derive(Debug, Error)]
#[error("proposal generation failed: {0}")]
pub struct GenerationFailure(#[from] anyhow::Error);

#[async_trait]
pub trait ProposalGenerator: Send + Sync {
    async fn generate(
        &self,
        title: &str,
        description: &str,
        budget: u32,
    ) -> Result<String, GenerationFailure>;
}

#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(http: Client, config: OpenRouterConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ProposalGenerator for OpenRouterClient {
    async fn generate(
        &self,
        title: &str,
        description: &str,
        budget: u32,
    ) -> Result<String, GenerationFailure> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .context("OPENROUTER_API_KEY is not configured")?;

        let request = build_request(self.config.model.clone(), title, description, budget);
        let response = self
            .http
            .post(OPENROUTER_API_URL)
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .json(&request)
            .send()
            .await
            .context("request to OpenRouter failed")?
            .error_for_status()
            .context("OpenRouter returned an error status")?;

        let text = parse_response(response).await?;
        Ok(text)
    }
}
