//! Sentiment service tests against a mocked remote NLP endpoint

mod fixtures;

use std::sync::Arc;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llm_comparator::services::{GoogleLanguageBackend, SentimentService};

#[tokio::test]
async fn test_remote_sentiment_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/documents:analyzeSentiment"))
        .and(body_partial_json(serde_json::json!({
            "document": {"type": "PLAIN_TEXT", "content": "A fine day."}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixtures::google_sentiment_json(0.8, 1.9)),
        )
        .mount(&server)
        .await;

    let backend = GoogleLanguageBackend::new("test-key").with_base_url(server.uri());
    let service = SentimentService::new(Arc::new(backend));

    let score = service.analyze("A fine day.", "ChatGPT").await;
    assert!(score.used_remote);
    assert_eq!(score.score, 0.8);
    assert_eq!(score.magnitude, 1.9);
    assert_eq!(score.sentences.len(), 1);
    assert_eq!(score.sentences[0].text, "A fine day.");
}

#[tokio::test]
async fn test_remote_fatal_error_falls_back_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/documents:analyzeSentiment"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1) // fatal status: exactly one call, then local fallback
        .mount(&server)
        .await;

    let backend = GoogleLanguageBackend::new("test-key").with_base_url(server.uri());
    let service = SentimentService::new(Arc::new(backend));

    let score = service.analyze("good good bad", "Gemini").await;
    assert!(!score.used_remote);
    assert_eq!(score.magnitude, 0.0);
    assert!((score.score - 1.0 / 6.0).abs() < 1e-9);
}
