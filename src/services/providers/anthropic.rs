//! Anthropic messages API adapter

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::DEFAULT_SYSTEM_INSTRUCTIONS;
use crate::error::ApiFailure;
use crate::traits::ProviderAdapter;
use crate::types::{GenerationRequest, ProviderId, ProviderResponse};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic messages API
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderResponse, ApiFailure> {
        let body = serde_json::json!({
            "model": request.version,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request
                .system_instructions
                .as_deref()
                .unwrap_or(DEFAULT_SYSTEM_INSTRUCTIONS),
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ]
        });

        debug!(model = %request.version, "sending anthropic request");
        let request_start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response_time = request_start.elapsed();

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiFailure::from_status(status, &body));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiFailure::MalformedResponse(format!("failed to parse response: {e}")))?;

        parse_response(response_json, response_time)
    }
}

fn parse_response(
    response_json: serde_json::Value,
    response_time: Duration,
) -> Result<ProviderResponse, ApiFailure> {
    let text = response_json
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|item| item.get("text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| ApiFailure::MalformedResponse("no content in response".to_string()))?
        .to_string();

    let usage = response_json.get("usage");
    let prompt_tokens = usage
        .and_then(|u| u.get("input_tokens"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);
    let completion_tokens = usage
        .and_then(|u| u.get("output_tokens"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);

    Ok(ProviderResponse {
        text,
        raw_response: response_json,
        response_time,
        prompt_tokens,
        completion_tokens,
        // Anthropic reports parts only; the total is derived downstream
        total_tokens: None,
    })
}
