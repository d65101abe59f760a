//! The assessment orchestrator.
//!
//! Sequences the three evaluators with short-circuit policy between stages:
//!
//! ```text
//! INIT -> TIER1 -> (SHORT_CIRCUIT | TIER2) -> (SHORT_CIRCUIT | TIER3) -> AGGREGATE -> DONE
//! ```
//!
//! Tiers run strictly in order with no internal parallelism; the only
//! suspension points are rule retrieval and the tier-3 model round-trip.
//! Misconfigured predicates, a missing NLP analyzer, and a missing model
//! credential all degrade to a skipped tier; only rule retrieval can fail
//! the call.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use pagescore_core::{
    AggregationInput, Aggregator, AssessmentOptions, AssessmentResult, NlpAnalyzer,
    PredicateRegistry, Severity, Tier1Evaluator, Tier2Evaluator, TierResult,
};

use crate::cache::{AssessmentCache, CacheKey};
use crate::config::EngineConfig;
use crate::providers::LlmProvider;
use crate::repository::{RepositoryError, RuleRepository};
use crate::tier3::Tier3Evaluator;
use crate::usage::LlmUsage;

const TIER1_SHORT_CIRCUIT_REASON: &str = "critical tier-1 failures - fix before proceeding";
const TIER2_SHORT_CIRCUIT_REASON: &str = "high tier-2 failure rate";

/// Errors from the assessment engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("rule retrieval failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("engine not configured: {0}")]
    NotConfigured(String),
}

/// The assessment engine. Safe to share across concurrent callers; each
/// `assess` call works on its own snapshot of rules and results.
pub struct AssessmentEngine {
    repository: Arc<dyn RuleRepository>,
    tier1: Tier1Evaluator,
    tier2: Tier2Evaluator,
    tier3: Tier3Evaluator,
    aggregator: Aggregator,
    config: EngineConfig,
    cache: Option<AssessmentCache>,
}

impl AssessmentEngine {
    pub fn builder() -> AssessmentEngineBuilder {
        AssessmentEngineBuilder::new()
    }

    /// Score `content` against the rule catalog.
    ///
    /// Always returns a complete, well-formed result unless rule retrieval
    /// itself fails.
    pub async fn assess(
        &self,
        content: &str,
        page_type: Option<&str>,
        industry: Option<&str>,
        options: &AssessmentOptions,
    ) -> Result<AssessmentResult, EngineError> {
        let cache_key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(content, page_type, industry, options));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(hit) = cache.get(key).await {
                tracing::debug!(page_type, "assessment cache hit");
                return Ok(hit);
            }
        }

        let mut tier_results: BTreeMap<u8, TierResult> = BTreeMap::new();
        let mut short_circuited = false;
        let mut tier3_usage = LlmUsage::default();

        // TIER1: always runs.
        let tier1_rules = self.repository.rules_for(1, page_type, industry).await?;
        let tier1_result = self.tier1.evaluate(content, &tier1_rules);
        let critical_count = tier1_result
            .violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count();
        tier_results.insert(1, tier1_result);

        if options.short_circuit && critical_count >= self.config.critical_short_circuit {
            tracing::info!(critical_count, "short-circuiting after tier 1");
            short_circuited = true;
            tier_results.insert(2, TierResult::skipped(2, TIER1_SHORT_CIRCUIT_REASON));
            tier_results.insert(3, TierResult::skipped(3, TIER1_SHORT_CIRCUIT_REASON));
        } else {
            // TIER2: runs when rules exist; skips itself without an analyzer.
            let tier2_rules = self.repository.rules_for(2, page_type, industry).await?;
            let tier2_result = if tier2_rules.is_empty() {
                TierResult::skipped(2, "no tier-2 rules for this request")
            } else {
                self.tier2.evaluate(content, &tier2_rules)
            };

            let tier2_failed_fraction = if tier2_result.rules_checked > 0 {
                tier2_result.violations.len() as f64 / tier2_result.rules_checked as f64
            } else {
                0.0
            };
            let tier2_ran = !tier2_result.skipped;
            tier_results.insert(2, tier2_result);

            // TIER3 decision.
            if options.short_circuit
                && tier2_ran
                && tier2_failed_fraction > self.config.tier2_failure_cutoff
            {
                tracing::info!(
                    failed_fraction = tier2_failed_fraction,
                    "short-circuiting after tier 2"
                );
                short_circuited = true;
                tier_results.insert(3, TierResult::skipped(3, TIER2_SHORT_CIRCUIT_REASON));
            } else if !options.run_tier3 {
                tier_results.insert(3, TierResult::skipped(3, "tier 3 disabled by caller"));
            } else {
                let tier3_rules = self.repository.rules_for(3, page_type, industry).await?;
                if tier3_rules.is_empty() {
                    tier_results.insert(3, TierResult::skipped(3, "no tier-3 rules for this request"));
                } else {
                    let outcome = self
                        .tier3
                        .evaluate(content, &tier3_rules, options.max_tier3_rules)
                        .await;
                    tier3_usage = outcome.usage;
                    tier_results.insert(3, outcome.result);
                }
            }
        }

        // AGGREGATE.
        let result = self.aggregator.aggregate(AggregationInput {
            tier_results,
            short_circuited,
            api_cost: tier3_usage.estimated_cost,
            tokens_used: tier3_usage.total_tokens,
            content_length: content.len(),
            page_type: page_type.map(str::to_string),
            industry: industry.map(str::to_string),
        });

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.insert(key, result.clone()).await;
        }

        Ok(result)
    }

    /// Lifetime model usage across every assessment served by this engine.
    pub fn lifetime_usage(&self) -> LlmUsage {
        self.tier3.lifetime_usage()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Builder for [`AssessmentEngine`].
pub struct AssessmentEngineBuilder {
    repository: Option<Arc<dyn RuleRepository>>,
    registry: Option<PredicateRegistry>,
    analyzer: Option<Arc<dyn NlpAnalyzer>>,
    provider: Option<Arc<dyn LlmProvider>>,
    config: EngineConfig,
}

impl AssessmentEngineBuilder {
    pub fn new() -> Self {
        Self {
            repository: None,
            registry: None,
            analyzer: None,
            provider: None,
            config: EngineConfig::default(),
        }
    }

    /// Rule repository (required).
    pub fn repository(mut self, repository: Arc<dyn RuleRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Tier-1 predicate registry. Defaults to the builtin set.
    pub fn registry(mut self, registry: PredicateRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// NLP analyzer for tier 2. Without one, tier 2 reports skipped.
    pub fn analyzer(mut self, analyzer: Arc<dyn NlpAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Model provider for tier 3. Without one, tier 3 reports skipped.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<AssessmentEngine, EngineError> {
        let repository = self
            .repository
            .ok_or_else(|| EngineError::NotConfigured("no rule repository set".to_string()))?;

        let registry = self.registry.unwrap_or_else(PredicateRegistry::with_builtins);
        let config = self.config;

        let tier1 = Tier1Evaluator::new(registry);
        let tier2 = Tier2Evaluator::new(self.analyzer).with_content_cap(config.tier2_content_cap);
        let tier3 = Tier3Evaluator::new(self.provider)
            .with_completion(config.completion.clone())
            .with_content_cap(config.tier3_content_cap);
        let aggregator = Aggregator::new(config.pass_threshold);

        let cache = config
            .cache
            .enabled
            .then(|| AssessmentCache::new(config.cache.max_entries, config.cache.ttl));

        Ok(AssessmentEngine {
            repository,
            tier1,
            tier2,
            tier3,
            aggregator,
            config,
            cache,
        })
    }
}

impl Default for AssessmentEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
