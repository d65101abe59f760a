//! # pagescore-runtime
//!
//! Async half of the content assessment engine: the rule repository
//! boundary, the tier-3 model evaluator, and the orchestrator that
//! sequences all three tiers with short-circuit economics.
//!
//! The deterministic evaluators live in `pagescore-core`; this crate adds
//! the parts that talk to the outside world and degrades them gracefully:
//! a missing NLP analyzer or model credential turns into a skipped tier,
//! never an error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pagescore_core::{AssessmentOptions, HeuristicAnalyzer};
//! use pagescore_runtime::{AssessmentEngine, InMemoryRepository};
//!
//! let repository = Arc::new(InMemoryRepository::from_json_file("rules.json")?);
//! let engine = AssessmentEngine::builder()
//!     .repository(repository)
//!     .analyzer(Arc::new(HeuristicAnalyzer::new()))
//!     .build()?;
//!
//! let result = engine
//!     .assess(content, Some("landing"), Some("legal"), &AssessmentOptions::default())
//!     .await?;
//! println!("score {} passed {}", result.overall_score, result.passed);
//! ```

pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod repository;
pub mod tier3;
pub mod usage;

// Re-export main types at crate root
pub use cache::AssessmentCache;
pub use config::{CacheConfig, EngineConfig};
pub use orchestrator::{AssessmentEngine, AssessmentEngineBuilder, EngineError};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
pub use repository::{InMemoryRepository, RepositoryError, RuleRepository};
pub use tier3::{Tier3Evaluator, Tier3Outcome};
pub use usage::{estimate_cost, LlmUsage, UsageLedger};

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, ANTHROPIC_API_KEY_ENV};
