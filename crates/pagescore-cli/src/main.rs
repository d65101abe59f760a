//! `pagescore` - assess a content file against a rule catalog.
//!
//! ```text
//! pagescore --rules catalog.json --content page.md --page-type landing --industry legal
//! ```
//!
//! Prints the assessment result as JSON and exits non-zero when the content
//! does not pass. Tier 3 runs only when `ANTHROPIC_API_KEY` is set.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pagescore_core::{AssessmentOptions, HeuristicAnalyzer};
use pagescore_runtime::{
    AnthropicProvider, AssessmentEngine, EngineConfig, InMemoryRepository, LlmProvider,
};

#[derive(Parser, Debug)]
#[command(name = "pagescore", version, about = "Score content against a quality rule catalog")]
struct Cli {
    /// Rule catalog file (.json or .yaml).
    #[arg(long)]
    rules: PathBuf,

    /// Content file to assess.
    #[arg(long)]
    content: PathBuf,

    /// Page type filter, e.g. "landing".
    #[arg(long)]
    page_type: Option<String>,

    /// Industry filter, e.g. "legal".
    #[arg(long)]
    industry: Option<String>,

    /// Engine configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable tier-3 model evaluation.
    #[arg(long)]
    no_tier3: bool,

    /// Disable short-circuiting between tiers.
    #[arg(long)]
    no_short_circuit: bool,

    /// Cap on rules sent to the model service.
    #[arg(long, default_value_t = 10)]
    max_tier3_rules: usize,

    /// Pretty-print the result JSON.
    #[arg(long)]
    pretty: bool,
}

fn load_repository(path: &Path) -> anyhow::Result<InMemoryRepository> {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let repository = if is_yaml {
        InMemoryRepository::from_yaml_file(path)
    } else {
        InMemoryRepository::from_json_file(path)
    };
    repository.with_context(|| format!("loading rule catalog {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let repository = load_repository(&cli.rules)?;
    tracing::info!(rules = repository.len(), "catalog loaded");

    let content = std::fs::read_to_string(&cli.content)
        .with_context(|| format!("reading content file {}", cli.content.display()))?;

    let config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let mut builder = AssessmentEngine::builder()
        .repository(Arc::new(repository))
        .analyzer(Arc::new(HeuristicAnalyzer::new()))
        .config(config);

    match AnthropicProvider::from_env() {
        Ok(provider) => {
            builder = builder.provider(Arc::new(provider) as Arc<dyn LlmProvider>);
        }
        Err(e) => {
            tracing::warn!(error = %e, "no model provider; tier 3 will be skipped");
        }
    }

    let engine = builder.build()?;

    let options = AssessmentOptions {
        run_tier3: !cli.no_tier3,
        short_circuit: !cli.no_short_circuit,
        max_tier3_rules: cli.max_tier3_rules,
    };

    let result = engine
        .assess(
            &content,
            cli.page_type.as_deref(),
            cli.industry.as_deref(),
            &options,
        )
        .await?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");

    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}
