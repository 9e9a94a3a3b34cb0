//! Core data model for the comparison pipeline

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiFailure;

/// Identifier for downstream LLM providers (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    Gemini,
    ChatGpt,
}

impl ProviderId {
    /// All supported providers, in presentation order.
    pub const ALL: [ProviderId; 3] = [ProviderId::Claude, ProviderId::Gemini, ProviderId::ChatGpt];

    /// Human-readable provider label used in reports and analysis prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Claude => "Claude Sonnet",
            ProviderId::Gemini => "Gemini",
            ProviderId::ChatGpt => "ChatGPT",
        }
    }

    /// Model version used when the caller does not specify one.
    pub fn default_version(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude-3-7-sonnet-20250219",
            ProviderId::Gemini => "gemini-2.0-flash-001",
            ProviderId::ChatGpt => "gpt-4o",
        }
    }

    /// Parse an identifier or display name, case-insensitively.
    pub fn parse(identifier: &str) -> Option<ProviderId> {
        match identifier.to_lowercase().as_str() {
            "claude" | "claude sonnet" => Some(ProviderId::Claude),
            "gemini" => Some(ProviderId::Gemini),
            "chatgpt" => Some(ProviderId::ChatGpt),
            _ => None,
        }
    }

    /// Known model versions for this provider as (version id, human name).
    ///
    /// Informational only; callers may request versions outside this list.
    pub fn known_versions(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            ProviderId::Claude => &[
                ("claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet"),
                ("claude-3-5-sonnet-20240620", "Claude 3.5 Sonnet"),
                ("claude-3-opus-20240229", "Claude 3 Opus"),
                ("claude-3-haiku-20240307", "Claude 3 Haiku"),
            ],
            ProviderId::Gemini => &[
                ("gemini-2.0-flash-001", "Gemini 2.0 Flash"),
                ("gemini-2.0-pro-001", "Gemini 2.0 Pro"),
                ("gemini-1.5-flash-001", "Gemini 1.5 Flash"),
                ("gemini-1.5-pro-001", "Gemini 1.5 Pro"),
            ],
            ProviderId::ChatGpt => &[
                ("gpt-4o", "GPT-4o"),
                ("gpt-4-turbo", "GPT-4 Turbo"),
                ("gpt-4", "GPT-4"),
                ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
            ],
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Claude => write!(f, "claude"),
            ProviderId::Gemini => write!(f, "gemini"),
            ProviderId::ChatGpt => write!(f, "chatgpt"),
        }
    }
}

/// A provider chosen for a comparison, with an optional version override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSelection {
    pub id: ProviderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ProviderSelection {
    pub fn new(id: ProviderId) -> Self {
        Self { id, version: None }
    }

    pub fn with_version(id: ProviderId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: Some(version.into()),
        }
    }

    /// Version to dispatch with: the override, or the provider default.
    pub fn resolved_version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| self.id.default_version().to_string())
    }
}

/// Normalized request handed to a provider adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instructions: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub provider: ProviderId,
    pub version: String,
}

/// Normalized response from a provider adapter (pre-aggregation)
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    /// Vendor response body, kept for debugging only
    pub raw_response: serde_json::Value,
    pub response_time: Duration,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl ProviderResponse {
    /// Normalized total token count: reported total, else the sum when both
    /// parts are present, else 0.
    pub fn normalized_total_tokens(&self) -> u32 {
        match (self.total_tokens, self.prompt_tokens, self.completion_tokens) {
            (Some(total), _, _) => total,
            (None, Some(prompt), Some(completion)) => prompt + completion,
            _ => 0,
        }
    }
}

/// A successful generation, matched back to its originating provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub provider: ProviderId,
    pub display_name: String,
    pub version: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
    pub response_time_ms: u64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A provider that could not produce a result for a batch item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub display_name: String,
    pub reason: String,
    #[serde(skip)]
    pub failure: Option<ApiFailure>,
}

impl ProviderFailure {
    pub fn new(provider: ProviderId, failure: ApiFailure) -> Self {
        Self {
            provider,
            display_name: provider.display_name().to_string(),
            reason: failure.to_string(),
            failure: Some(failure),
        }
    }

    /// Whether this failure stems from missing configuration rather than the
    /// upstream service.
    pub fn is_configuration(&self) -> bool {
        self.failure
            .as_ref()
            .map(ApiFailure::is_configuration)
            .unwrap_or(false)
    }
}

/// One prompt within a multi-prompt submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptItem {
    pub id: Uuid,
    pub prompt: String,
    /// Per-item override; falls back to the batch default when None
    pub system_instructions: Option<String>,
}

impl PromptItem {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            system_instructions: None,
        }
    }

    pub fn with_instructions(prompt: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            system_instructions: Some(instructions.into()),
        }
    }
}

/// Ordered prompt batch, created per submission and consumed once
#[derive(Debug, Clone)]
pub struct PromptBatch {
    items: Vec<PromptItem>,
    default_instructions: Option<String>,
}

impl PromptBatch {
    pub fn new(items: Vec<PromptItem>, default_instructions: Option<String>) -> Self {
        Self {
            items,
            default_instructions,
        }
    }

    /// Build a single-item batch from one prompt.
    pub fn single(prompt: impl Into<String>, instructions: Option<String>) -> Self {
        Self {
            items: vec![PromptItem::new(prompt)],
            default_instructions: instructions,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[PromptItem] {
        &self.items
    }

    /// Effective system instructions for one item.
    pub fn instructions_for(&self, item: &PromptItem) -> Option<String> {
        item.system_instructions
            .clone()
            .or_else(|| self.default_instructions.clone())
    }

    /// Consume the batch into its items.
    pub fn into_items(self) -> Vec<PromptItem> {
        self.items
    }
}

/// Per-item partition of the requested providers into successes and failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub item_id: Uuid,
    pub prompt: String,
    pub successes: Vec<GenerationResult>,
    pub failures: Vec<ProviderFailure>,
}

impl ComparisonResult {
    /// Every provider accounted for, success or failure.
    pub fn provider_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// Token usage passed through from the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Sentiment for one response, with provenance
///
/// Remote and fallback scores are not numerically comparable; `used_remote`
/// records which scale produced the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentScore {
    pub score: f64,
    pub magnitude: f64,
    pub used_remote: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentences: Vec<SentenceSentiment>,
}

impl SentimentScore {
    /// Neutral default used when sentiment cannot be computed at all.
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            magnitude: 0.0,
            used_remote: false,
            sentences: Vec::new(),
        }
    }
}

/// Per-sentence sentiment from the remote backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentenceSentiment {
    pub text: String,
    pub score: f64,
    pub magnitude: f64,
}

/// Derived analytics for one successful response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub response_length: usize,
    pub word_count: usize,
    pub avg_word_length: f64,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    pub complexity_score: f64,
    pub sentiment: SentimentScore,
    pub token_usage: TokenUsage,
    pub response_time_ms: u64,
}

/// Per-provider analytics for one batch item
///
/// Every successful provider has a complete entry; keys are never missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsReport {
    pub entries: HashMap<ProviderId, ProviderMetrics>,
}

/// Scope an analysis document covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    /// One batch item's responses
    Item { item_id: Uuid },
    /// Every successful response across the batch
    Batch,
}

/// Synthesized comparison document from the analysis pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDocument {
    pub text: String,
    pub provider: ProviderId,
    pub version: String,
    pub scope: AnalysisScope,
    pub error: bool,
}

/// Per-provider secrets, resolved once by the caller
///
/// The core never reads ambient state; absence of a secret surfaces as
/// `ApiFailure::MissingCredentials` for that provider.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

/// Inbound comparison request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_instructions: Option<String>,
    pub providers: Vec<ProviderSelection>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub metrics: bool,
    #[serde(default)]
    pub analyze: bool,
    #[serde(default)]
    pub analyzer_provider: Option<ProviderId>,
    #[serde(default)]
    pub analyzer_version: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

/// Inbound multi-prompt request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCompareRequest {
    pub prompts: Vec<PromptItem>,
    #[serde(default)]
    pub system_instructions: Option<String>,
    pub providers: Vec<ProviderSelection>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub metrics: bool,
    #[serde(default)]
    pub analyze: bool,
    #[serde(default)]
    pub analyzer_provider: Option<ProviderId>,
    #[serde(default)]
    pub analyzer_version: Option<String>,
}

/// Outbound comparison response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
    pub providers_requested: Vec<ProviderId>,
    pub results: Vec<GenerationResult>,
    pub failures: Vec<ProviderFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDocument>,
}

impl CompareResponse {
    /// True when no provider produced a result; distinct from partial failure.
    pub fn is_total_failure(&self) -> bool {
        self.results.is_empty()
    }
}

/// Outbound multi-prompt response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCompareResponse {
    pub timestamp: DateTime<Utc>,
    pub providers_requested: Vec<ProviderId>,
    pub items: Vec<BatchItemResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisDocument>,
}

impl BatchCompareResponse {
    pub fn is_total_failure(&self) -> bool {
        self.items.iter().all(|item| item.comparison.successes.is_empty())
    }
}

/// One batch item's comparison plus optional analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResponse {
    pub comparison: ComparisonResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsReport>,
}
