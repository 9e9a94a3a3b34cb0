//! Concrete provider adapters and the closed adapter registry

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

use std::sync::Arc;

use crate::error::ApiFailure;
use crate::traits::ProviderAdapter;
use crate::types::{CredentialSet, ProviderId};

/// System instruction used when the caller supplies none
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Closed registry of provider adapters, one slot per `ProviderId` variant.
///
/// Selection is by explicit enumeration; a provider without a registered
/// adapter resolves to `ApiFailure::MissingCredentials`.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    claude: Option<Arc<dyn ProviderAdapter>>,
    gemini: Option<Arc<dyn ProviderAdapter>>,
    chatgpt: Option<Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Build adapters for every provider that has a secret in the set.
    pub fn from_credentials(credentials: &CredentialSet) -> Self {
        let mut registry = Self::default();
        if let Some(key) = &credentials.anthropic_api_key {
            registry.register(Arc::new(AnthropicAdapter::new(key.clone())));
        }
        if let Some(key) = &credentials.google_api_key {
            registry.register(Arc::new(GeminiAdapter::new(key.clone())));
        }
        if let Some(key) = &credentials.openai_api_key {
            registry.register(Arc::new(OpenAiAdapter::new(key.clone())));
        }
        registry
    }

    /// Register an adapter in the slot named by its own id.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        match adapter.id() {
            ProviderId::Claude => self.claude = Some(adapter),
            ProviderId::Gemini => self.gemini = Some(adapter),
            ProviderId::ChatGpt => self.chatgpt = Some(adapter),
        }
    }

    /// Resolve the adapter for a provider.
    pub fn adapter(&self, id: ProviderId) -> Result<Arc<dyn ProviderAdapter>, ApiFailure> {
        let slot = match id {
            ProviderId::Claude => &self.claude,
            ProviderId::Gemini => &self.gemini,
            ProviderId::ChatGpt => &self.chatgpt,
        };
        slot.clone().ok_or(ApiFailure::MissingCredentials)
    }

    /// Providers that currently have an adapter registered.
    pub fn available(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.adapter(*id).is_ok())
            .collect()
    }
}
