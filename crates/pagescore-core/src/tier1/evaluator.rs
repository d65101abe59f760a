//! The tier-1 rule loop.

use std::time::Instant;

use crate::rule::{Directive, Rule};
use crate::tier1::PredicateRegistry;
use crate::types::{Severity, TierResult, Violation};

/// Applies deterministic predicates to content. Synchronous, no I/O.
pub struct Tier1Evaluator {
    registry: PredicateRegistry,
}

impl Tier1Evaluator {
    pub fn new(registry: PredicateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    /// Evaluate `rules` against `content`.
    ///
    /// Rules with malformed directives, unknown predicates, or predicate
    /// errors are skipped: excluded from checked, passed, and violation
    /// counts. The batch never aborts.
    pub fn evaluate(&self, content: &str, rules: &[Rule]) -> TierResult {
        let started = Instant::now();
        let mut checked = 0usize;
        let mut passed = 0usize;
        let mut violations = Vec::new();

        for rule in rules {
            let directive = match rule.directive() {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "malformed directive, skipping rule");
                    continue;
                }
            };

            let Some(predicate) = self.registry.get(&directive.predicate) else {
                tracing::warn!(
                    rule_id = %rule.id,
                    predicate = %directive.predicate,
                    "unregistered predicate, skipping rule"
                );
                continue;
            };

            match predicate(content, &directive.args) {
                Ok(true) => {
                    checked += 1;
                    passed += 1;
                }
                Ok(false) => {
                    checked += 1;
                    violations.push(self.violation(rule, &directive));
                }
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "predicate error, skipping rule");
                }
            }
        }

        TierResult::ran(
            1,
            checked,
            passed,
            violations,
            started.elapsed().as_millis() as u64,
        )
    }

    fn violation(&self, rule: &Rule, directive: &Directive) -> Violation {
        let (detail, fix) = failure_detail(directive);
        Violation {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            tier: 1,
            severity: Severity::derive(1, rule.enforcement),
            message: format!("{}: {}", rule.name, detail),
            fix_suggestion: fix,
            auto_fixable: rule.auto_fixable,
        }
    }
}

/// Human-readable failure message and remediation per predicate.
fn failure_detail(directive: &Directive) -> (String, Option<String>) {
    let arg = |i: usize| directive.args.get(i).cloned().unwrap_or_default();
    let phrase = directive.args.join(":");

    match directive.predicate.as_str() {
        "min-words" => (
            format!("content has fewer than {} words", arg(0)),
            Some(format!("Expand the content to at least {} words", arg(0))),
        ),
        "max-words" => (
            format!("content exceeds {} words", arg(0)),
            Some(format!("Tighten the content to {} words or fewer", arg(0))),
        ),
        "word-range" => (
            format!("word count is outside the {}-{} range", arg(0), arg(1)),
            None,
        ),
        "has-phone" => (
            "no contact phone number found".to_string(),
            Some("Add a contact phone number".to_string()),
        ),
        "has-price" => (
            "no pricing information found".to_string(),
            Some("Add at least one price or fee".to_string()),
        ),
        "has-license" => (
            "no license or registration number found".to_string(),
            Some("Add the business license or registration number".to_string()),
        ),
        "has-cities" => (
            format!("fewer than {} recognized place names mentioned", arg(0)),
            Some(format!("Name at least {} of the cities you serve", arg(0))),
        ),
        "min-headings" => (
            format!("fewer than {} section headings", arg(0)),
            Some(format!(
                "Break the content into at least {} sections with level-2 headings",
                arg(0)
            )),
        ),
        "min-bullets" => (
            format!("fewer than {} bullet list items", arg(0)),
            Some("Summarize key points in a bulleted list".to_string()),
        ),
        "contains" => (
            format!("required phrase '{phrase}' not found"),
            Some(format!("Include the phrase '{phrase}'")),
        ),
        "not-contains" => (
            format!("forbidden phrase '{phrase}' is present"),
            Some(format!("Remove the phrase '{phrase}'")),
        ),
        "min-numbers" => (
            format!("fewer than {} numeric details", arg(0)),
            None,
        ),
        other => (format!("failed check '{other}'"), None),
    }
}
