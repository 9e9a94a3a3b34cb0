//! Fan-out orchestration core for comparing generative-text providers
//!
//! One logical request fans out to multiple LLM providers concurrently, with
//! per-provider failure isolation, bounded retry with exponential backoff,
//! derived analytics (text statistics plus sentiment with a remote/local
//! fallback split), and an optional meta-analysis pass that feeds aggregated
//! outputs back into one provider.

pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use crate::core::{AnalysisPass, CompareService, MetricsEngine, Orchestrator, RetryPolicy};
pub use error::{ApiFailure, CompareError, CompareResult};
pub use services::{AdapterRegistry, SentimentService};
pub use traits::{ProviderAdapter, SentimentBackend};
pub use types::*;
