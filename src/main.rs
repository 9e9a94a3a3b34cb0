//! Comparison CLI entry point
//!
//! The binary is the credential resolver: it reads provider secrets from the
//! environment exactly once and hands the core an explicit `CredentialSet`.

use std::env;

use anyhow::{anyhow, bail};
use clap::Parser;

use llm_comparator::{CompareRequest, CompareService, CredentialSet, ProviderId, ProviderSelection};

#[derive(Parser)]
#[command(name = "llm-comparator")]
#[command(about = "Compare responses from multiple LLM providers for one prompt")]
struct Args {
    /// Prompt sent to every selected provider
    prompt: String,

    /// Provider to query (claude, gemini, chatgpt); repeat for several
    #[arg(long = "provider", value_name = "ID")]
    providers: Vec<String>,

    /// Shared system instructions
    #[arg(long)]
    system_instructions: Option<String>,

    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    #[arg(long, default_value_t = 2048)]
    max_tokens: u32,

    /// Compute per-response metrics (text statistics and sentiment)
    #[arg(long)]
    metrics: bool,

    /// Run the meta-analysis pass over the successful responses
    #[arg(long)]
    analyze: bool,

    /// Provider used for the analysis pass (defaults to chatgpt)
    #[arg(long, value_name = "ID")]
    analyzer: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let credentials = CredentialSet {
        anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
        openai_api_key: env::var("OPENAI_API_KEY").ok(),
        google_api_key: env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GOOGLE_AI_API_KEY"))
            .ok(),
    };

    if credentials.anthropic_api_key.is_none()
        && credentials.openai_api_key.is_none()
        && credentials.google_api_key.is_none()
    {
        bail!("at least one API key must be set (ANTHROPIC_API_KEY, OPENAI_API_KEY, or GOOGLE_API_KEY)");
    }

    let providers = parse_providers(&args.providers)?;
    let analyzer_provider = args
        .analyzer
        .as_deref()
        .map(|id| {
            ProviderId::parse(id)
                .ok_or_else(|| anyhow!("unsupported analyzer provider: {id}"))
        })
        .transpose()?;

    let service = CompareService::new(&credentials);
    let request = CompareRequest {
        prompt: args.prompt,
        system_instructions: args.system_instructions,
        providers,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        metrics: args.metrics,
        analyze: args.analyze,
        analyzer_provider,
        analyzer_version: None,
    };

    let response = service.handle(request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn parse_providers(names: &[String]) -> anyhow::Result<Vec<ProviderSelection>> {
    if names.is_empty() {
        // No explicit selection: query every supported provider
        return Ok(ProviderId::ALL.into_iter().map(ProviderSelection::new).collect());
    }

    names
        .iter()
        .map(|name| {
            ProviderId::parse(name)
                .map(ProviderSelection::new)
                .ok_or_else(|| {
                    anyhow!("unsupported provider: {name} (supported: claude, gemini, chatgpt)")
                })
        })
        .collect()
}
