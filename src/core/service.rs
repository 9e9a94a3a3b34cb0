//! Inbound comparison service: validation, fan-out, analytics, analysis

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::core::analysis::{context_line, AnalysisPass};
use crate::core::metrics::MetricsEngine;
use crate::core::orchestrator::Orchestrator;
use crate::core::retry::RetryPolicy;
use crate::error::CompareResult;
use crate::services::{AdapterRegistry, GoogleLanguageBackend, SentimentService};
use crate::types::{
    AnalysisScope, BatchCompareRequest, BatchCompareResponse, BatchItemResponse, CompareRequest,
    CompareResponse, CredentialSet, PromptBatch, ProviderId,
};

/// Analyzer used when a request asks for analysis without naming a provider
const DEFAULT_ANALYZER: ProviderId = ProviderId::ChatGpt;

/// Front door for comparison submissions
pub struct CompareService {
    orchestrator: Orchestrator,
    metrics: MetricsEngine,
    analysis: AnalysisPass,
}

impl CompareService {
    /// Wire the service from an explicit credential set.
    ///
    /// The sentiment backend is enabled only when a Google key is present;
    /// otherwise sentiment degrades to the local fallback.
    pub fn new(credentials: &CredentialSet) -> Self {
        let registry = Arc::new(AdapterRegistry::from_credentials(credentials));
        let sentiment = match &credentials.google_api_key {
            Some(key) => SentimentService::new(Arc::new(GoogleLanguageBackend::new(key.clone()))),
            None => SentimentService::local_only(),
        };
        Self::with_parts(registry, sentiment)
    }

    /// Wire the service from pre-built parts (tests inject adapters here).
    pub fn with_parts(registry: Arc<AdapterRegistry>, sentiment: SentimentService) -> Self {
        Self {
            orchestrator: Orchestrator::new(Arc::clone(&registry)),
            metrics: MetricsEngine::new(sentiment),
            analysis: AnalysisPass::new(registry),
        }
    }

    /// Apply one retry policy to provider dispatch and the analysis pass.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_default_retry_policy(policy.clone());
        self.analysis = self.analysis.with_retry_policy(policy);
        self
    }

    /// Handle a single-prompt comparison request.
    pub async fn handle(&self, request: CompareRequest) -> CompareResult<CompareResponse> {
        let providers_requested: Vec<ProviderId> =
            request.providers.iter().map(|sel| sel.id).collect();

        let batch = PromptBatch::single(
            request.prompt.clone(),
            request.system_instructions.clone(),
        );
        let mut comparisons = self
            .orchestrator
            .run_batch(batch, &request.providers, request.temperature, request.max_tokens)
            .await?;
        // Single-item batch yields exactly one comparison
        let comparison = comparisons.remove(0);

        info!(
            successes = comparison.successes.len(),
            failures = comparison.failures.len(),
            "comparison settled"
        );

        let metrics = if request.metrics && !comparison.successes.is_empty() {
            Some(self.metrics.build_report(&comparison.successes).await)
        } else {
            None
        };

        let analysis = if request.analyze && !comparison.successes.is_empty() {
            let analyzer = request.analyzer_provider.unwrap_or(DEFAULT_ANALYZER);
            let context = context_line(comparison.successes.len(), &request.prompt);
            Some(
                self.analysis
                    .analyze(
                        &comparison.successes,
                        analyzer,
                        request.analyzer_version.clone(),
                        None,
                        Some(&context),
                        AnalysisScope::Item {
                            item_id: comparison.item_id,
                        },
                    )
                    .await?,
            )
        } else {
            None
        };

        Ok(CompareResponse {
            timestamp: Utc::now(),
            prompt: request.prompt,
            system_instructions: request.system_instructions,
            providers_requested,
            results: comparison.successes,
            failures: comparison.failures,
            metrics,
            analysis,
        })
    }

    /// Handle a multi-prompt submission; items run strictly sequentially.
    pub async fn handle_batch(
        &self,
        request: BatchCompareRequest,
    ) -> CompareResult<BatchCompareResponse> {
        let providers_requested: Vec<ProviderId> =
            request.providers.iter().map(|sel| sel.id).collect();

        let batch = PromptBatch::new(request.prompts, request.system_instructions);
        let comparisons = self
            .orchestrator
            .run_batch(batch, &request.providers, request.temperature, request.max_tokens)
            .await?;

        let mut items = Vec::with_capacity(comparisons.len());
        let mut all_successes = Vec::new();
        for comparison in comparisons {
            let metrics = if request.metrics && !comparison.successes.is_empty() {
                Some(self.metrics.build_report(&comparison.successes).await)
            } else {
                None
            };
            all_successes.extend(comparison.successes.iter().cloned());
            items.push(BatchItemResponse { comparison, metrics });
        }

        let analysis = if request.analyze && !all_successes.is_empty() {
            let analyzer = request.analyzer_provider.unwrap_or(DEFAULT_ANALYZER);
            let context = format!(
                "Analysis of {} model responses across {} prompts",
                all_successes.len(),
                items.len()
            );
            Some(
                self.analysis
                    .analyze(
                        &all_successes,
                        analyzer,
                        request.analyzer_version.clone(),
                        None,
                        Some(&context),
                        AnalysisScope::Batch,
                    )
                    .await?,
            )
        } else {
            None
        };

        Ok(BatchCompareResponse {
            timestamp: Utc::now(),
            providers_requested,
            items,
            analysis,
        })
    }
}
