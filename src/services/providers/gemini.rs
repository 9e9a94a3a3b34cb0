//! Google Gemini generateContent adapter

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ApiFailure;
use crate::traits::ProviderAdapter;
use crate::types::{GenerationRequest, ProviderId, ProviderResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Adapter for the Gemini generateContent API
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiAdapter {
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
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderResponse, ApiFailure> {
        let mut body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": request.prompt}]
                }
            ],
            "generationConfig": {
                "maxOutputTokens": request.max_tokens,
                "temperature": request.temperature
            }
        });

        if let Some(instructions) = &request.system_instructions {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": instructions}]
            });
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, request.version, self.api_key
        );

        debug!(model = %request.version, "sending gemini request");
        let request_start = Instant::now();

        let response = self
            .client
            .post(&url)
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
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| ApiFailure::MalformedResponse("no content in response".to_string()))?
        .to_string();

    // Gemini does not always report token counts
    let usage = response_json.get("usageMetadata");
    let prompt_tokens = usage
        .and_then(|u| u.get("promptTokenCount"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);
    let completion_tokens = usage
        .and_then(|u| u.get("candidatesTokenCount"))
        .and_then(|t| t.as_u64())
        .map(|t| t as u32);
    let total_tokens = usage
        .and_then(|u| u.get("totalTokenCount"))
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
