//! Sentiment analysis with a remote backend and a deterministic local fallback

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::core::retry::{with_retry, RetryPolicy};
use crate::error::ApiFailure;
use crate::traits::{RemoteSentiment, SentimentBackend};
use crate::types::{SentenceSentiment, SentimentScore};

/// Sentiment input is truncated to this many characters before analysis
const MAX_SENTIMENT_CHARS: usize = 100_000;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "best", "positive", "effective",
    "helpful", "beneficial", "success", "wonderful", "amazing",
    "impressive", "outstanding", "fantastic", "splendid", "superb",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "worst", "poor", "negative", "ineffective", "harmful",
    "failure", "issue", "problem", "terrible", "horrible",
    "awful", "disappointing", "frustrating", "inadequate", "useless",
];

/// Remote NLP backend for Google Cloud Natural Language sentiment
pub struct GoogleLanguageBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleLanguageBackend {
    const DEFAULT_BASE_URL: &'static str = "https://language.googleapis.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the backend at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SentimentBackend for GoogleLanguageBackend {
    async fn analyze(&self, text: &str) -> Result<RemoteSentiment, ApiFailure> {
        let body = serde_json::json!({
            "document": {
                "type": "PLAIN_TEXT",
                "content": text
            }
        });

        let url = format!(
            "{}/v1/documents:analyzeSentiment?key={}",
            self.base_url, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiFailure::from_status(status, &body));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiFailure::MalformedResponse(format!("failed to parse response: {e}")))?;

        parse_sentiment_response(&response_json)
    }
}

fn parse_sentiment_response(response_json: &serde_json::Value) -> Result<RemoteSentiment, ApiFailure> {
    let document = response_json
        .get("documentSentiment")
        .ok_or_else(|| ApiFailure::MalformedResponse("no documentSentiment in response".to_string()))?;

    let score = document
        .get("score")
        .and_then(|s| s.as_f64())
        .ok_or_else(|| ApiFailure::MalformedResponse("no sentiment score".to_string()))?;
    let magnitude = document
        .get("magnitude")
        .and_then(|m| m.as_f64())
        .unwrap_or(0.0);

    let sentences = response_json
        .get("sentences")
        .and_then(|s| s.as_array())
        .map(|sentences| {
            sentences
                .iter()
                .filter_map(|sentence| {
                    let text = sentence.get("text")?.get("content")?.as_str()?.to_string();
                    let sentiment = sentence.get("sentiment")?;
                    Some(SentenceSentiment {
                        text,
                        score: sentiment.get("score")?.as_f64()?,
                        magnitude: sentiment.get("magnitude").and_then(|m| m.as_f64()).unwrap_or(0.0),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(RemoteSentiment {
        score,
        magnitude,
        sentences,
    })
}

/// Sentiment service: remote backend first, keyword fallback on any failure
pub struct SentimentService {
    backend: Option<Arc<dyn SentimentBackend>>,
    retry_policy: RetryPolicy,
}

impl SentimentService {
    /// Service with a remote backend; falls back locally when it fails.
    pub fn new(backend: Arc<dyn SentimentBackend>) -> Self {
        Self {
            backend: Some(backend),
            retry_policy: RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10)),
        }
    }

    /// Service without remote credentials; always uses the local fallback.
    pub fn local_only() -> Self {
        Self {
            backend: None,
            retry_policy: RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10)),
        }
    }

    #[cfg(test)]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Analyze one response's sentiment, never failing outright.
    pub async fn analyze(&self, text: &str, provider_label: &str) -> SentimentScore {
        let truncated = truncate_chars(text, MAX_SENTIMENT_CHARS);

        if let Some(backend) = &self.backend {
            let outcome = with_retry(
                || backend.analyze(truncated),
                &self.retry_policy,
                ApiFailure::is_retryable,
                |err, attempt| {
                    warn!(provider = provider_label, attempt, error = %err, "retrying sentiment request");
                },
            )
            .await;

            match outcome {
                Ok(remote) => {
                    return SentimentScore {
                        score: remote.score.clamp(-1.0, 1.0),
                        magnitude: remote.magnitude.max(0.0),
                        used_remote: true,
                        sentences: remote.sentences,
                    };
                }
                Err(err) => {
                    warn!(provider = provider_label, error = %err, "remote sentiment failed, using fallback");
                }
            }
        } else {
            debug!(provider = provider_label, "no sentiment backend configured, using fallback");
        }

        SentimentScore {
            score: keyword_sentiment(truncated),
            magnitude: 0.0,
            used_remote: false,
            sentences: Vec::new(),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn positive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&keyword_pattern(POSITIVE_WORDS)).unwrap())
}

fn negative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&keyword_pattern(NEGATIVE_WORDS)).unwrap())
}

fn keyword_pattern(words: &[&str]) -> String {
    format!(r"(?i)\b(?:{})\b", words.join("|"))
}

/// Deterministic keyword-based sentiment score in [-1, 1].
///
/// Counts case-insensitive word-boundary matches against the fixed keyword
/// lists; (positives - negatives) / (2 * total matches), neutral when nothing
/// matches.
pub fn keyword_sentiment(text: &str) -> f64 {
    let positives = positive_regex().find_iter(text).count() as i64;
    let negatives = negative_regex().find_iter(text).count() as i64;
    let total = positives + negatives;

    if total > 0 {
        (positives - negatives) as f64 / (total * 2) as f64
    } else {
        0.0
    }
}
