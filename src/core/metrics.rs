//! Per-response text statistics and the metrics report builder

use tracing::debug;

use crate::services::SentimentService;
use crate::types::{GenerationResult, MetricsReport, ProviderMetrics, TokenUsage};

/// Pure text statistics for one response
#[derive(Debug, Clone, PartialEq)]
pub struct TextStats {
    pub response_length: usize,
    pub word_count: usize,
    pub avg_word_length: f64,
    pub sentence_count: usize,
    pub avg_sentence_length: f64,
    pub complexity_score: f64,
}

/// Compute text statistics for one response.
///
/// Words are whitespace-delimited tokens after trimming, punctuation kept;
/// sentences are the non-empty segments after splitting on `.!?` runs;
/// complexity is the fixed linear heuristic
/// `0.6 * avg_word_length + 0.4 * avg_sentence_length`.
pub fn text_stats(text: &str) -> TextStats {
    let response_length = text.chars().count();

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();
    let avg_word_length = if word_count > 0 {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
    } else {
        0.0
    };

    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|segment| !segment.trim().is_empty())
        .count();
    let avg_sentence_length = word_count as f64 / sentence_count.max(1) as f64;

    TextStats {
        response_length,
        word_count,
        avg_word_length,
        sentence_count,
        avg_sentence_length,
        complexity_score: 0.6 * avg_word_length + 0.4 * avg_sentence_length,
    }
}

/// Normalize reported token counts into a complete usage record.
pub fn token_usage(result: &GenerationResult) -> TokenUsage {
    TokenUsage {
        prompt_tokens: result.prompt_tokens.unwrap_or(0),
        completion_tokens: result.completion_tokens.unwrap_or(0),
        total_tokens: result.total_tokens,
    }
}

/// Builds per-provider metrics for the successful results of one comparison
pub struct MetricsEngine {
    sentiment: SentimentService,
}

impl MetricsEngine {
    pub fn new(sentiment: SentimentService) -> Self {
        Self { sentiment }
    }

    /// Build a complete report: every successful provider gets an entry.
    ///
    /// Sentiment calls run sequentially, one response at a time, bounding load
    /// on the sentiment backend and keeping failure attribution per response.
    /// A total sentiment failure degrades to the neutral default rather than
    /// dropping the key.
    pub async fn build_report(&self, results: &[GenerationResult]) -> MetricsReport {
        let mut report = MetricsReport::default();

        for result in results {
            let stats = text_stats(&result.text);
            let sentiment = self
                .sentiment
                .analyze(&result.text, &result.display_name)
                .await;

            debug!(
                provider = %result.provider,
                words = stats.word_count,
                used_remote = sentiment.used_remote,
                "computed response metrics"
            );

            report.entries.insert(
                result.provider,
                ProviderMetrics {
                    response_length: stats.response_length,
                    word_count: stats.word_count,
                    avg_word_length: stats.avg_word_length,
                    sentence_count: stats.sentence_count,
                    avg_sentence_length: stats.avg_sentence_length,
                    complexity_score: stats.complexity_score,
                    sentiment,
                    token_usage: token_usage(result),
                    response_time_ms: result.response_time_ms,
                },
            );
        }

        report
    }
}
