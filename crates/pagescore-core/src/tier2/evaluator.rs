//! The tier-2 rule loop.

use std::sync::Arc;
use std::time::Instant;

use crate::nlp::NlpAnalyzer;
use crate::rule::Rule;
use crate::tier2::truncate_to_chars;
use crate::types::{Severity, TierResult, Violation};

/// Content cap before parsing; anything longer adds latency without
/// changing the verdicts these checks produce.
pub const DEFAULT_CONTENT_CAP: usize = 100_000;

/// Applies linguistic heuristics via an optional NLP capability.
pub struct Tier2Evaluator {
    analyzer: Option<Arc<dyn NlpAnalyzer>>,
    content_cap: usize,
}

impl Tier2Evaluator {
    pub fn new(analyzer: Option<Arc<dyn NlpAnalyzer>>) -> Self {
        Self {
            analyzer,
            content_cap: DEFAULT_CONTENT_CAP,
        }
    }

    pub fn with_content_cap(mut self, cap: usize) -> Self {
        self.content_cap = cap;
        self
    }

    /// Evaluate `rules` against `content`.
    ///
    /// Returns a skipped result when no analyzer is available. Rules whose
    /// description resolves to no known check pass by default: a rule the
    /// engine cannot interpret must not block content.
    pub fn evaluate(&self, content: &str, rules: &[Rule]) -> TierResult {
        let Some(analyzer) = &self.analyzer else {
            return TierResult::skipped(2, "NLP analyzer unavailable");
        };

        let started = Instant::now();
        let document = analyzer.analyze(truncate_to_chars(content, self.content_cap));

        let mut passed = 0usize;
        let mut violations = Vec::new();

        for rule in rules {
            let Some(check) = rule.linguistic_check() else {
                tracing::debug!(rule_id = %rule.id, "no linguistic check resolved, passing by default");
                passed += 1;
                continue;
            };

            let outcome = check.run(&document);
            if outcome.passed {
                passed += 1;
            } else {
                violations.push(Violation {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    tier: 2,
                    severity: Severity::derive(2, rule.enforcement),
                    message: format!("{}: {}", rule.name, outcome.detail),
                    fix_suggestion: outcome.fix,
                    auto_fixable: rule.auto_fixable,
                });
            }
        }

        TierResult::ran(
            2,
            rules.len(),
            passed,
            violations,
            started.elapsed().as_millis() as u64,
        )
    }
}
