//! Shared result types for the assessment pipeline.
//!
//! The serialized shape of [`AssessmentResult`], [`TierResult`], and
//! [`Violation`] is a compatibility contract: downstream consumers parse the
//! JSON by field name, so renames here are breaking changes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How strongly a rule is enforced. Drives violation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Mandatory: failing this rule produces a critical or major violation.
    Required,
    /// Advisory: failing this rule produces a minor violation.
    Recommended,
}

/// Severity of a violation, derived from enforcement level and the tier
/// that detected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    /// Derive severity for a failed rule.
    ///
    /// Tier 1 failures of required rules are critical: they are cheap,
    /// unambiguous checks the content author can always fix. Later tiers cap
    /// out at major because their signals carry more interpretation.
    pub fn derive(tier: u8, enforcement: Enforcement) -> Self {
        match (tier, enforcement) {
            (1, Enforcement::Required) => Severity::Critical,
            (_, Enforcement::Required) => Severity::Major,
            (_, Enforcement::Recommended) => Severity::Minor,
        }
    }
}

/// A single failed rule.
///
/// Violations are immutable once created; the aggregate result collects them
/// without merging or deduplicating across tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Id of the offending rule.
    pub rule_id: String,
    /// Display name of the offending rule.
    pub rule_name: String,
    /// Tier that detected the failure.
    pub tier: u8,
    pub severity: Severity,
    /// Human-readable description of what failed.
    pub message: String,
    /// Mechanical remediation, when one exists.
    #[serde(default)]
    pub fix_suggestion: Option<String>,
    /// Copied from the rule record.
    pub auto_fixable: bool,
}

/// Outcome of running (or skipping) one evaluator.
///
/// Invariant for a tier that ran: `rules_passed + violations.len() ==
/// rules_checked`. Skipped tiers report zero checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: u8,
    pub rules_checked: usize,
    pub rules_passed: usize,
    pub violations: Vec<Violation>,
    pub processing_time_ms: u64,
    pub skipped: bool,
    pub skip_reason: Option<String>,
}

impl TierResult {
    /// A result for a tier that actually evaluated rules.
    pub fn ran(
        tier: u8,
        rules_checked: usize,
        rules_passed: usize,
        violations: Vec<Violation>,
        processing_time_ms: u64,
    ) -> Self {
        debug_assert_eq!(rules_passed + violations.len(), rules_checked);
        Self {
            tier,
            rules_checked,
            rules_passed,
            violations,
            processing_time_ms,
            skipped: false,
            skip_reason: None,
        }
    }

    /// A result for a tier that did not run.
    pub fn skipped(tier: u8, reason: impl Into<String>) -> Self {
        Self {
            tier,
            rules_checked: 0,
            rules_passed: 0,
            violations: Vec::new(),
            processing_time_ms: 0,
            skipped: true,
            skip_reason: Some(reason.into()),
        }
    }
}

/// Per-call options recognized by `assess`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentOptions {
    /// Run tier 3 even when rules and credentials are present.
    #[serde(default = "default_true")]
    pub run_tier3: bool,
    /// Stop early on sufficiently bad tier-1/tier-2 outcomes.
    #[serde(default = "default_true")]
    pub short_circuit: bool,
    /// Cap on the number of rules sent to the model service per assessment.
    #[serde(default = "default_max_tier3_rules")]
    pub max_tier3_rules: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_tier3_rules() -> usize {
    10
}

impl Default for AssessmentOptions {
    fn default() -> Self {
        Self {
            run_tier3: true,
            short_circuit: true,
            max_tier3_rules: 10,
        }
    }
}

/// The final artifact returned to the caller. Never mutated after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// 0-100, rounded share of passed rules across the tiers that ran.
    pub overall_score: u32,
    /// `overall_score >= pass threshold` (70 by default).
    pub passed: bool,
    /// Tiers that actually evaluated rules, ascending.
    pub tiers_run: Vec<u8>,
    /// Every tier appears here; skipped tiers carry a reason.
    pub tier_results: BTreeMap<u8, TierResult>,
    /// Flattened violations, grouped by tier in ascending tier order.
    pub violations: Vec<Violation>,
    pub passed_rules_count: usize,
    /// Fix suggestions from auto-fixable violations.
    pub auto_fixes: Vec<String>,
    pub recommendations: Vec<String>,
    /// Monetary cost attributable to tier 3, USD.
    pub api_cost: f64,
    /// Token count attributable to tier 3.
    pub tokens_used: u64,
    /// Sum of tier processing times.
    pub total_processing_time_ms: u64,
    pub content_length: usize,
    pub page_type: Option<String>,
    pub industry: Option<String>,
    pub assessed_at: DateTime<Utc>,
}
