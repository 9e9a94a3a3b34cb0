//! Concrete backends: provider adapters and the sentiment service

pub mod providers;
pub mod sentiment;

pub use providers::{
    AdapterRegistry, AnthropicAdapter, GeminiAdapter, OpenAiAdapter, DEFAULT_SYSTEM_INSTRUCTIONS,
};
pub use sentiment::{keyword_sentiment, GoogleLanguageBackend, SentimentService};
