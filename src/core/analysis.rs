//! Meta-analysis pass: feed aggregated outputs back into one provider

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::orchestrator::dispatch_request;
use crate::core::retry::RetryPolicy;
use crate::error::{CompareError, CompareResult};
use crate::services::AdapterRegistry;
use crate::types::{AnalysisDocument, AnalysisScope, GenerationRequest, GenerationResult, ProviderId};

/// Analysis calls are issued with a low temperature and a large token budget
const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 8000;

/// Built-in instructions when comparing multiple model outputs
pub const DEFAULT_ANALYSIS_INSTRUCTIONS: &str = "\
System Instructions:
- You are an expert at analyzing differences between different LLMs
- Your job is to analyze the outputs of the models and provide a detailed comparison
- Different models are fed the same prompt, and their outputs are captured, and passed to you for analysis
- Process the following outputs and distinguish the differences between the models.
- If the outputs contain code, look for security vulnerabilities or bad practices, and highlight them
- If the outputs contain text, look for grammar issues, and highlight them
- If the outputs contain any other content, look for any issues and highlight them
- Provide a detailed analysis of the differences between the models
- Provide a summary of the strengths and weaknesses of each model
- Provide a summary of the overall performance of each model
- At the bottom provide which model you think is the best overall pick
- Break each section into markdown sections with headers, use lists, and formatting";

/// Built-in instructions when reviewing a single model output
pub const SINGLE_ANALYSIS_INSTRUCTIONS: &str = "\
System Instructions:
- You are an expert at reviewing LLM output
- A single model was fed a prompt and its output is passed to you for review
- If the output contains code, look for security vulnerabilities or bad practices, and highlight them
- If the output contains text, look for grammar issues, and highlight them
- Provide a detailed review of the response quality, accuracy, and completeness
- Break each section into markdown sections with headers, use lists, and formatting";

/// Re-invokes one provider over the aggregated successful outputs
pub struct AnalysisPass {
    registry: Arc<AdapterRegistry>,
    retry_policy: RetryPolicy,
}

impl AnalysisPass {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Synthesize a comparison document from successful results.
    ///
    /// Requires at least one successful result; that precondition is checked
    /// before any dispatch. An analyzer failure yields a uniform error-shaped
    /// document carrying the requested provider and version.
    pub async fn analyze(
        &self,
        results: &[GenerationResult],
        provider: ProviderId,
        version: Option<String>,
        instructions: Option<&str>,
        context: Option<&str>,
        scope: AnalysisScope,
    ) -> CompareResult<AnalysisDocument> {
        if results.is_empty() {
            return Err(CompareError::Validation {
                message: "analysis requires at least one successful result".to_string(),
            });
        }

        let version = version.unwrap_or_else(|| provider.default_version().to_string());
        let prompt = build_analysis_prompt(results, instructions, context);

        info!(analyzer = %provider, results = results.len(), "running analysis pass");

        let request = GenerationRequest {
            prompt,
            system_instructions: None,
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
            provider,
            version: version.clone(),
        };

        match dispatch_request(Arc::clone(&self.registry), request, self.retry_policy.clone()).await
        {
            Ok(result) => Ok(AnalysisDocument {
                text: result.text,
                provider,
                version,
                scope,
                error: false,
            }),
            Err(failure) => {
                warn!(analyzer = %provider, error = %failure, "analysis pass failed");
                Ok(AnalysisDocument {
                    text: format!("Error analyzing responses: {failure}"),
                    provider,
                    version,
                    scope,
                    error: true,
                })
            }
        }
    }
}

/// Assemble the analysis prompt: instructions, optional context, then one
/// labeled block per result.
pub(crate) fn build_analysis_prompt(
    results: &[GenerationResult],
    instructions: Option<&str>,
    context: Option<&str>,
) -> String {
    let instructions = instructions.unwrap_or(if results.len() == 1 {
        SINGLE_ANALYSIS_INSTRUCTIONS
    } else {
        DEFAULT_ANALYSIS_INSTRUCTIONS
    });

    let blocks: Vec<String> = results
        .iter()
        .map(|r| format!("{}: {}", r.display_name, r.text))
        .collect();

    match context {
        Some(context) => format!("{instructions}\n\n{context}\n\n{}", blocks.join("\n\n")),
        None => format!("{instructions}\n\n{}", blocks.join("\n\n")),
    }
}

/// Context line for service-level analysis requests, with the originating
/// prompt truncated to 100 characters.
pub fn context_line(result_count: usize, prompt: &str) -> String {
    let truncated: String = prompt.chars().take(100).collect();
    let ellipsis = if prompt.chars().count() > 100 { "..." } else { "" };
    format!("Analysis of {result_count} model responses to prompt: \"{truncated}{ellipsis}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::ApiFailure;
    use crate::traits::{MockProviderAdapter, ProviderAdapter};
    use crate::types::ProviderResponse;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(5))
    }

    fn success_result(provider: ProviderId, text: &str) -> GenerationResult {
        GenerationResult {
            provider,
            display_name: provider.display_name().to_string(),
            version: provider.default_version().to_string(),
            text: text.to_string(),
            raw_response: None,
            response_time_ms: 50,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: 0,
            error: false,
            error_message: None,
        }
    }

    fn registry_with(adapter: MockProviderAdapter) -> Arc<AdapterRegistry> {
        let mut registry = AdapterRegistry::default();
        registry.register(Arc::new(adapter) as Arc<dyn ProviderAdapter>);
        Arc::new(registry)
    }

    #[test]
    fn test_prompt_contains_every_result_block() {
        let results = vec![
            success_result(ProviderId::Claude, "claude output"),
            success_result(ProviderId::ChatGpt, "gpt output"),
        ];
        let prompt = build_analysis_prompt(&results, None, None);

        assert!(prompt.starts_with(DEFAULT_ANALYSIS_INSTRUCTIONS));
        assert!(prompt.contains("Claude Sonnet: claude output"));
        assert!(prompt.contains("ChatGPT: gpt output"));
    }

    #[test]
    fn test_single_result_uses_single_wording() {
        let results = vec![success_result(ProviderId::Gemini, "only output")];
        let prompt = build_analysis_prompt(&results, None, None);
        assert!(prompt.starts_with(SINGLE_ANALYSIS_INSTRUCTIONS));
        assert!(prompt.contains("Gemini: only output"));
    }

    #[test]
    fn test_custom_instructions_and_context() {
        let results = vec![success_result(ProviderId::Claude, "out")];
        let prompt =
            build_analysis_prompt(&results, Some("Judge strictly."), Some("Context: batch run"));
        assert!(prompt.starts_with("Judge strictly."));
        assert!(prompt.contains("Context: batch run"));
    }

    #[test]
    fn test_context_line_truncates_long_prompts() {
        let long_prompt = "p".repeat(150);
        let line = context_line(3, &long_prompt);
        assert!(line.contains(&"p".repeat(100)));
        assert!(line.ends_with("...\""));
        assert!(!line.contains(&"p".repeat(101)));

        let short = context_line(1, "hi");
        assert!(short.ends_with("\"hi\""));
    }

    #[tokio::test]
    async fn test_zero_results_rejected_before_dispatch() {
        let pass = AnalysisPass::new(Arc::new(AdapterRegistry::default()));
        let err = pass
            .analyze(&[], ProviderId::ChatGpt, None, None, None, AnalysisScope::Batch)
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_successful_analysis_document() {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::ChatGpt);
        adapter
            .expect_generate()
            .withf(|request| {
                request.temperature == 0.3
                    && request.max_tokens == 8000
                    && request.prompt.contains("Claude Sonnet: claude output")
            })
            .returning(|_| {
                Ok(ProviderResponse {
                    text: "# Comparison\nBoth are fine.".to_string(),
                    raw_response: serde_json::Value::Null,
                    response_time: Duration::from_millis(5),
                    prompt_tokens: None,
                    completion_tokens: None,
                    total_tokens: None,
                })
            });

        let pass = AnalysisPass::new(registry_with(adapter)).with_retry_policy(fast_policy());
        let results = vec![
            success_result(ProviderId::Claude, "claude output"),
            success_result(ProviderId::Gemini, "gemini output"),
        ];
        let document = pass
            .analyze(&results, ProviderId::ChatGpt, None, None, None, AnalysisScope::Batch)
            .await
            .unwrap();

        assert!(!document.error);
        assert_eq!(document.provider, ProviderId::ChatGpt);
        assert_eq!(document.version, "gpt-4o");
        assert!(document.text.contains("Comparison"));
    }

    #[tokio::test]
    async fn test_analyzer_failure_yields_error_document() {
        let mut adapter = MockProviderAdapter::new();
        adapter.expect_id().return_const(ProviderId::Claude);
        adapter
            .expect_generate()
            .returning(|_| Err(ApiFailure::InvalidRequest("too long".to_string())));

        let pass = AnalysisPass::new(registry_with(adapter)).with_retry_policy(fast_policy());
        let results = vec![success_result(ProviderId::Gemini, "out")];
        let document = pass
            .analyze(
                &results,
                ProviderId::Claude,
                Some("claude-3-haiku-20240307".to_string()),
                None,
                None,
                AnalysisScope::Batch,
            )
            .await
            .unwrap();

        assert!(document.error);
        assert_eq!(document.provider, ProviderId::Claude);
        assert_eq!(document.version, "claude-3-haiku-20240307");
        assert!(document.text.starts_with("Error analyzing responses:"));
    }

    #[tokio::test]
    async fn test_missing_analyzer_credentials_yield_error_document() {
        let pass = AnalysisPass::new(Arc::new(AdapterRegistry::default()))
            .with_retry_policy(fast_policy());
        let results = vec![success_result(ProviderId::Gemini, "out")];
        let document = pass
            .analyze(&results, ProviderId::ChatGpt, None, None, None, AnalysisScope::Batch)
            .await
            .unwrap();

        assert!(document.error);
        assert!(document.text.contains("missing credentials"));
    }
}
