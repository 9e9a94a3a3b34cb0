//! OpenAI chat completions adapter

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::DEFAULT_SYSTEM_INSTRUCTIONS;
use crate::error::ApiFailure;
use crate::traits::ProviderAdapter;
use crate::types::{GenerationRequest, ProviderId, ProviderResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Adapter for the OpenAI chat completions API
pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAdapter {
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
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::ChatGpt
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderResponse, ApiFailure> {
        let body = serde_json::json!({
            "model": request.version,
            "messages": [
                {
                    "role": "system",
                    "content": request
                        .system_instructions
                        .as_deref()
                        .unwrap_or(DEFAULT_SYSTEM_INSTRUCTIONS)
                },
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature
        });

        debug!(model = %request.version, "sending openai request");
        let request_start = Instant::now();

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
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
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| ApiFailure::MalformedResponse("no content in response".to_string()))?
        .to_string();

    let usage = response_json.get("usage");
    let prompt_tokens = usage
        .and_then(|u| u.get("prompt_tokens"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);
    let completion_tokens = usage
        .and_then(|u| u.get("completion_tokens"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);
    let total_tokens = usage
        .and_then(|u| u.get("total_tokens"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);

    Ok(ProviderResponse {
        text,
        raw_response: response_json,
        response_time,
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}
