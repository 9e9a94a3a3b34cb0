//! Core pipeline: retry engine, fan-out dispatch, analytics, analysis pass

pub mod analysis;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod service;

pub use analysis::AnalysisPass;
pub use metrics::MetricsEngine;
pub use orchestrator::Orchestrator;
pub use retry::{with_retry, RetryPolicy};
pub use service::CompareService;
