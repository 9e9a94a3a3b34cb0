//! Canned vendor response bodies for integration tests

#![allow(dead_code)] // Not every fixture is used by every test binary

use serde_json::json;

/// OpenAI chat-completions style response
pub fn openai_response_json(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test123",
        "object": "chat.completion",
        "created": 1234567890,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 50,
            "completion_tokens": 100,
            "total_tokens": 150
        }
    })
}

/// Anthropic messages style response
pub fn anthropic_response_json(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_test456",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-3-7-sonnet-20250219",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 30, "output_tokens": 120}
    })
}

/// Gemini generateContent style response
pub fn gemini_response_json(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "parts": [{"text": text}],
                "role": "model"
            },
            "finishReason": "STOP",
            "index": 0,
            "safetyRatings": []
        }],
        "usageMetadata": {
            "promptTokenCount": 12,
            "candidatesTokenCount": 34,
            "totalTokenCount": 46
        }
    })
}

/// Google Cloud Natural Language sentiment response
pub fn google_sentiment_json(score: f64, magnitude: f64) -> serde_json::Value {
    json!({
        "documentSentiment": {"score": score, "magnitude": magnitude},
        "language": "en",
        "sentences": [{
            "text": {"content": "A fine day.", "beginOffset": 0},
            "sentiment": {"score": score, "magnitude": magnitude}
        }]
    })
}

/// Vendor error body used for rate-limit responses
pub fn rate_limit_error_json() -> serde_json::Value {
    json!({
        "error": {
            "type": "rate_limit_error",
            "message": "Too many requests"
        }
    })
}
