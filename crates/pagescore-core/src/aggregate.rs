//! Aggregation: folds tier results into the final assessment.
//!
//! Aggregation applies fixed policy rules; it is deliberately not
//! configurable beyond the pass threshold:
//! 1. Score is the rounded share of passed rules across tiers that ran.
//! 2. Violations keep tier order, then insertion order within a tier.
//! 3. Recommendations are ordered: short-circuit, critical, major.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::types::{AssessmentResult, Severity, TierResult, Violation};

/// Default passing score.
pub const DEFAULT_PASS_THRESHOLD: u32 = 70;

/// Inputs gathered by the orchestrator for one assessment.
#[derive(Debug)]
pub struct AggregationInput {
    /// One entry per tier, skipped tiers included.
    pub tier_results: BTreeMap<u8, TierResult>,
    /// Whether the pipeline stopped early on policy.
    pub short_circuited: bool,
    /// Monetary cost of tier-3 model calls, USD.
    pub api_cost: f64,
    /// Token count of tier-3 model calls.
    pub tokens_used: u64,
    pub content_length: usize,
    pub page_type: Option<String>,
    pub industry: Option<String>,
}

/// Folds tier results into an [`AssessmentResult`].
pub struct Aggregator {
    pass_threshold: u32,
}

impl Aggregator {
    pub fn new(pass_threshold: u32) -> Self {
        Self { pass_threshold }
    }

    pub fn aggregate(&self, input: AggregationInput) -> AssessmentResult {
        let AggregationInput {
            tier_results,
            short_circuited,
            api_cost,
            tokens_used,
            content_length,
            page_type,
            industry,
        } = input;

        let tiers_run: Vec<u8> = tier_results
            .values()
            .filter(|r| !r.skipped)
            .map(|r| r.tier)
            .collect();

        let total_checked: usize = tier_results.values().map(|r| r.rules_checked).sum();
        let total_passed: usize = tier_results.values().map(|r| r.rules_passed).sum();

        let overall_score = if total_checked == 0 {
            0
        } else {
            ((total_passed as f64 / total_checked as f64) * 100.0).round() as u32
        };

        // BTreeMap iteration gives ascending tier order, which is the
        // documented violation ordering.
        let violations: Vec<Violation> = tier_results
            .values()
            .flat_map(|r| r.violations.iter().cloned())
            .collect();

        let auto_fixes: Vec<String> = violations
            .iter()
            .filter(|v| v.auto_fixable)
            .filter_map(|v| v.fix_suggestion.clone())
            .collect();

        let recommendations =
            build_recommendations(&violations, short_circuited);

        let total_processing_time_ms: u64 =
            tier_results.values().map(|r| r.processing_time_ms).sum();

        AssessmentResult {
            overall_score,
            passed: overall_score >= self.pass_threshold,
            tiers_run,
            tier_results,
            violations,
            passed_rules_count: total_passed,
            auto_fixes,
            recommendations,
            api_cost,
            tokens_used,
            total_processing_time_ms,
            content_length,
            page_type,
            industry,
            assessed_at: Utc::now(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_THRESHOLD)
    }
}

fn build_recommendations(violations: &[Violation], short_circuited: bool) -> Vec<String> {
    let mut recommendations = Vec::new();

    if short_circuited {
        recommendations.push(
            "Fix the critical tier-1 failures first; later checks were skipped until they are resolved"
                .to_string(),
        );
    }

    let critical = violations
        .iter()
        .filter(|v| v.severity == Severity::Critical)
        .count();
    if critical > 0 {
        recommendations.push(format!("Address {critical} critical violation(s) immediately"));
    }

    let major = violations
        .iter()
        .filter(|v| v.severity == Severity::Major)
        .count();
    if major > 0 {
        recommendations.push(format!("Review {major} major violation(s) before publishing"));
    }

    recommendations
}
