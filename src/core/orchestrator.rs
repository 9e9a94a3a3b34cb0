//! Fan-out dispatcher: concurrent per-provider calls, sequential batch items

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::retry::{with_retry, RetryPolicy};
use crate::error::{ApiFailure, CompareError, CompareResult};
use crate::services::AdapterRegistry;
use crate::types::{
    ComparisonResult, GenerationRequest, GenerationResult, PromptBatch, ProviderFailure,
    ProviderId, ProviderSelection,
};

/// Issues one adapter call per selected provider for each batch item.
///
/// Calls within an item run concurrently and settle independently; items are
/// processed strictly sequentially, so worst-case concurrency is bounded by
/// the selected-provider count. Abandoning the returned future lets in-flight
/// calls run to completion while no later item starts.
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    default_policy: RetryPolicy,
    policy_overrides: HashMap<ProviderId, RetryPolicy>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            default_policy: RetryPolicy::default(),
            policy_overrides: HashMap::new(),
        }
    }

    pub fn with_default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Override the retry policy for one provider.
    pub fn set_provider_policy(&mut self, provider: ProviderId, policy: RetryPolicy) {
        self.policy_overrides.insert(provider, policy);
    }

    fn policy_for(&self, provider: ProviderId) -> RetryPolicy {
        self.policy_overrides
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| self.default_policy.clone())
    }

    /// Validate a submission before any dispatch.
    fn validate(batch: &PromptBatch, selection: &[ProviderSelection]) -> CompareResult<()> {
        if selection.is_empty() {
            return Err(CompareError::Validation {
                message: "at least one provider must be selected".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for sel in selection {
            if !seen.insert(sel.id) {
                return Err(CompareError::Validation {
                    message: format!("provider selected more than once: {}", sel.id),
                });
            }
        }

        if batch.is_empty() {
            return Err(CompareError::Validation {
                message: "prompt batch is empty".to_string(),
            });
        }

        for item in batch.items() {
            if item.prompt.trim().is_empty() {
                return Err(CompareError::Validation {
                    message: format!("empty prompt in batch item {}", item.id),
                });
            }
        }

        Ok(())
    }

    /// Run a batch against the selected providers.
    ///
    /// Emits one `ComparisonResult` per item, in batch order; per item the
    /// success and failure sets partition the selection exactly.
    pub async fn run_batch(
        &self,
        batch: PromptBatch,
        selection: &[ProviderSelection],
        temperature: f32,
        max_tokens: u32,
    ) -> CompareResult<Vec<ComparisonResult>> {
        Self::validate(&batch, selection)?;

        let items: Vec<_> = batch
            .items()
            .iter()
            .map(|item| (item.clone(), batch.instructions_for(item)))
            .collect();

        let mut comparisons = Vec::with_capacity(items.len());
        for (item, instructions) in items {
            info!(item_id = %item.id, providers = selection.len(), "dispatching batch item");

            // One spawned task per provider; each owns its request and result
            // slot, so a failing sibling cannot cancel or delay the rest.
            let mut handles = Vec::with_capacity(selection.len());
            for sel in selection {
                let request = GenerationRequest {
                    prompt: item.prompt.clone(),
                    system_instructions: instructions.clone(),
                    temperature,
                    max_tokens,
                    provider: sel.id,
                    version: sel.resolved_version(),
                };
                let registry = Arc::clone(&self.registry);
                let policy = self.policy_for(sel.id);
                handles.push((sel.id, tokio::spawn(dispatch_request(registry, request, policy))));
            }

            let mut successes = Vec::new();
            let mut failures = Vec::new();
            for (provider, handle) in handles {
                // Results are matched by the provider id carried alongside
                // each handle, never by completion order.
                match handle.await {
                    Ok(Ok(result)) => successes.push(result),
                    Ok(Err(failure)) => {
                        warn!(provider = %provider, error = %failure, "provider failed for batch item");
                        failures.push(ProviderFailure::new(provider, failure));
                    }
                    Err(join_err) => {
                        failures.push(ProviderFailure::new(
                            provider,
                            ApiFailure::Unknown(format!("task aborted: {join_err}")),
                        ));
                    }
                }
            }

            comparisons.push(ComparisonResult {
                item_id: item.id,
                prompt: item.prompt,
                successes,
                failures,
            });
        }

        Ok(comparisons)
    }
}

/// Resolve the adapter, wrap the call in the retry engine, and normalize the
/// outcome into a `GenerationResult`.
pub(crate) async fn dispatch_request(
    registry: Arc<AdapterRegistry>,
    request: GenerationRequest,
    policy: RetryPolicy,
) -> Result<GenerationResult, ApiFailure> {
    let provider = request.provider;
    // Missing credentials fail before the retry loop; nothing to retry.
    let adapter = registry.adapter(provider)?;

    let response = with_retry(
        || adapter.generate(&request),
        &policy,
        ApiFailure::is_retryable,
        |err, attempt| {
            warn!(provider = %provider, attempt, error = %err, "retrying provider request");
        },
    )
    .await?;

    let total_tokens = response.normalized_total_tokens();
    Ok(GenerationResult {
        provider,
        display_name: provider.display_name().to_string(),
        version: request.version,
        text: response.text,
        raw_response: Some(response.raw_response),
        response_time_ms: response.response_time.as_millis() as u64,
        prompt_tokens: response.prompt_tokens,
        completion_tokens: response.completion_tokens,
        total_tokens,
        error: false,
        error_message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::traits::{MockProviderAdapter, ProviderAdapter};
    use crate::types::{PromptItem, ProviderResponse};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5))
    }

    fn success_adapter(id: ProviderId, text: &str) -> Arc<dyn ProviderAdapter> {
        let text = text.to_string();
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(id);
        adapter.expect_generate().returning(move |_| {
            Ok(ProviderResponse {
                text: text.clone(),
                raw_response: serde_json::Value::Null,
                response_time: Duration::from_millis(5),
                prompt_tokens: Some(10),
                completion_tokens: Some(20),
                total_tokens: None,
            })
        });
        Arc::new(adapter)
    }

    fn failing_adapter(id: ProviderId, failure: ApiFailure) -> Arc<dyn ProviderAdapter> {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(id);
        adapter
            .expect_generate()
            .returning(move |_| Err(failure.clone()));
        Arc::new(adapter)
    }

    fn orchestrator_with(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Orchestrator {
        let mut registry = AdapterRegistry::default();
        for adapter in adapters {
            registry.register(adapter);
        }
        Orchestrator::new(Arc::new(registry)).with_default_retry_policy(fast_policy())
    }

    fn all_selection() -> Vec<ProviderSelection> {
        ProviderId::ALL.into_iter().map(ProviderSelection::new).collect()
    }

    #[tokio::test]
    async fn test_success_and_failure_sets_partition_selection() {
        let orchestrator = orchestrator_with(vec![
            success_adapter(ProviderId::Claude, "claude says hi"),
            failing_adapter(ProviderId::Gemini, ApiFailure::AuthenticationFailed),
            success_adapter(ProviderId::ChatGpt, "gpt says hi"),
        ]);

        let batch = PromptBatch::single("compare yourselves", None);
        let results = orchestrator
            .run_batch(batch, &all_selection(), 0.7, 256)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let comparison = &results[0];
        assert_eq!(comparison.provider_count(), 3);

        let succeeded: HashSet<_> = comparison.successes.iter().map(|r| r.provider).collect();
        let failed: HashSet<_> = comparison.failures.iter().map(|f| f.provider).collect();
        assert!(succeeded.is_disjoint(&failed));
        let mut all: Vec<_> = succeeded.union(&failed).copied().collect();
        all.sort_by_key(|p| p.to_string());
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_credentials_isolated_to_one_provider() {
        // Registry only knows about two providers; the third has no secret
        let orchestrator = orchestrator_with(vec![
            success_adapter(ProviderId::Claude, "ok"),
            success_adapter(ProviderId::ChatGpt, "ok"),
        ]);

        let batch = PromptBatch::single("hello", None);
        let results = orchestrator
            .run_batch(batch, &all_selection(), 0.7, 256)
            .await
            .unwrap();

        let comparison = &results[0];
        assert_eq!(comparison.successes.len(), 2);
        assert_eq!(comparison.failures.len(), 1);
        let failure = &comparison.failures[0];
        assert_eq!(failure.provider, ProviderId::Gemini);
        assert!(failure.is_configuration());
    }

    #[tokio::test]
    async fn test_transient_failure_retried_to_success() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::ChatGpt);
        adapter.expect_generate().returning(move |_| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n < 2 {
                Err(ApiFailure::RateLimitExceeded)
            } else {
                Ok(ProviderResponse {
                    text: "recovered".to_string(),
                    raw_response: serde_json::Value::Null,
                    response_time: Duration::from_millis(5),
                    prompt_tokens: None,
                    completion_tokens: None,
                    total_tokens: Some(7),
                })
            }
        });

        let orchestrator = orchestrator_with(vec![Arc::new(adapter)]);
        let batch = PromptBatch::single("hello", None);
        let selection = vec![ProviderSelection::new(ProviderId::ChatGpt)];
        let results = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap();

        assert_eq!(results[0].successes.len(), 1);
        assert_eq!(results[0].successes[0].text, "recovered");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_not_retried() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::Claude);
        adapter.expect_generate().returning(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(ApiFailure::InvalidRequest("bad params".to_string()))
        });

        let orchestrator = orchestrator_with(vec![Arc::new(adapter)]);
        let batch = PromptBatch::single("hello", None);
        let selection = vec![ProviderSelection::new(ProviderId::Claude)];
        let results = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap();

        assert_eq!(results[0].failures.len(), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_rejected_before_dispatch() {
        let orchestrator = orchestrator_with(vec![]);
        let batch = PromptBatch::single("hello", None);
        let err = orchestrator.run_batch(batch, &[], 0.7, 256).await.unwrap_err();
        assert!(matches!(err, CompareError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_blank_prompt_rejected_before_dispatch() {
        let orchestrator = orchestrator_with(vec![success_adapter(ProviderId::Claude, "ok")]);
        let batch = PromptBatch::single("   ", None);
        let selection = vec![ProviderSelection::new(ProviderId::Claude)];
        let err = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap_err();
        assert!(matches!(err, CompareError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_provider_rejected() {
        let orchestrator = orchestrator_with(vec![success_adapter(ProviderId::Claude, "ok")]);
        let batch = PromptBatch::single("hello", None);
        let selection = vec![
            ProviderSelection::new(ProviderId::Claude),
            ProviderSelection::new(ProviderId::Claude),
        ];
        let err = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap_err();
        assert!(matches!(err, CompareError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_batch_items_emit_in_order() {
        let orchestrator = orchestrator_with(vec![success_adapter(ProviderId::Gemini, "ok")]);
        let batch = PromptBatch::new(
            vec![PromptItem::new("first"), PromptItem::new("second")],
            None,
        );
        let expected: Vec<_> = batch.items().iter().map(|i| i.id).collect();
        let selection = vec![ProviderSelection::new(ProviderId::Gemini)];

        let results = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap();
        let got: Vec<_> = results.iter().map(|c| c.item_id).collect();
        assert_eq!(got, expected);
        assert_eq!(results[0].prompt, "first");
        assert_eq!(results[1].prompt, "second");
    }

    #[tokio::test]
    async fn test_provider_policy_override_takes_precedence() {
        // Default policy would retry; the per-provider override allows none
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::Gemini);
        adapter.expect_generate().returning(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(ApiFailure::RateLimitExceeded)
        });

        let mut orchestrator = orchestrator_with(vec![Arc::new(adapter)]);
        orchestrator.set_provider_policy(
            ProviderId::Gemini,
            RetryPolicy::new(0, Duration::from_millis(1), Duration::from_millis(5)),
        );

        let batch = PromptBatch::single("hello", None);
        let selection = vec![ProviderSelection::new(ProviderId::Gemini)];
        let results = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap();

        assert_eq!(results[0].failures.len(), 1);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_version_override_reaches_adapter() {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::Claude);
        adapter
            .expect_generate()
            .withf(|request| request.version == "claude-3-opus-20240229")
            .returning(|_| {
                Ok(ProviderResponse {
                    text: "opus".to_string(),
                    raw_response: serde_json::Value::Null,
                    response_time: Duration::from_millis(1),
                    prompt_tokens: None,
                    completion_tokens: None,
                    total_tokens: None,
                })
            });

        let orchestrator = orchestrator_with(vec![Arc::new(adapter)]);
        let batch = PromptBatch::single("hello", None);
        let selection = vec![ProviderSelection::with_version(
            ProviderId::Claude,
            "claude-3-opus-20240229",
        )];
        let results = orchestrator.run_batch(batch, &selection, 0.7, 256).await.unwrap();
        assert_eq!(results[0].successes[0].version, "claude-3-opus-20240229");
    }
}
