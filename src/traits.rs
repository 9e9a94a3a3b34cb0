//! Trait seams for provider and sentiment backends

use async_trait::async_trait;

use crate::error::ApiFailure;
use crate::types::{GenerationRequest, ProviderId, ProviderResponse, SentenceSentiment};

/// Uniform adapter contract over one generative-text backend
///
/// Adapters translate a normalized request into a vendor call and normalize
/// the response. They never retry internally; classification of each failure
/// is the adapter's job, retry scheduling is the engine's.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter fronts
    fn id(&self) -> ProviderId;

    /// Issue one generation call and normalize the result
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderResponse, ApiFailure>;
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter").field("id", &self.id()).finish()
    }
}

/// Raw sentiment as reported by the remote NLP backend
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSentiment {
    pub score: f64,
    pub magnitude: f64,
    pub sentences: Vec<SentenceSentiment>,
}

/// Remote sentiment backend contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    /// Analyze one document's sentiment
    async fn analyze(&self, text: &str) -> Result<RemoteSentiment, ApiFailure>;
}
