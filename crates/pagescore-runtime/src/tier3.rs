//! Tier-3 evaluation: batched model-assisted judgment.
//!
//! Paid and slow. Every assessment sends at most one request: the rule batch
//! is capped, the content is truncated to a bounded prefix, and the model
//! returns one structured verdict per rule id. A transport or parse failure
//! degrades the tier to skipped; it never surfaces an error to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use pagescore_core::{truncate_to_chars, Rule, Severity, TierResult, Violation};

use crate::prompts::{build_batch_prompt, JUDGE_SYSTEM_PROMPT};
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::{LlmUsage, UsageLedger};

/// Content prefix sent to the model. Bounds prompt cost.
pub const DEFAULT_CONTENT_CAP: usize = 5_000;

const NOT_CONFIGURED_REASON: &str = "model service not configured";

/// A tier-3 run: the tier result plus the request-scoped usage that paid
/// for it.
#[derive(Debug)]
pub struct Tier3Outcome {
    pub result: TierResult,
    pub usage: LlmUsage,
}

impl Tier3Outcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            result: TierResult::skipped(3, reason),
            usage: LlmUsage::default(),
        }
    }
}

/// Judges rules through a model service.
pub struct Tier3Evaluator {
    provider: Option<Arc<dyn LlmProvider>>,
    completion: CompletionConfig,
    content_cap: usize,
    ledger: UsageLedger,
}

impl Tier3Evaluator {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            provider,
            completion: CompletionConfig::default(),
            content_cap: DEFAULT_CONTENT_CAP,
            ledger: UsageLedger::new(),
        }
    }

    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_content_cap(mut self, cap: usize) -> Self {
        self.content_cap = cap;
        self
    }

    /// Lifetime usage across every assessment served by this instance.
    pub fn lifetime_usage(&self) -> LlmUsage {
        self.ledger.snapshot()
    }

    /// Judge up to `batch_cap` rules against `content`.
    ///
    /// Rules beyond the cap are dropped from this run, not deferred. On
    /// transport or parse failure the tier reports itself skipped with the
    /// failure as the reason; any tokens the service reported are still
    /// accounted for.
    pub async fn evaluate(&self, content: &str, rules: &[Rule], batch_cap: usize) -> Tier3Outcome {
        let Some(provider) = &self.provider else {
            return Tier3Outcome::skipped(NOT_CONFIGURED_REASON);
        };
        if !provider.health_check().await {
            return Tier3Outcome::skipped(NOT_CONFIGURED_REASON);
        }

        let started = Instant::now();

        let batch = &rules[..rules.len().min(batch_cap)];
        if batch.len() < rules.len() {
            tracing::warn!(
                dropped = rules.len() - batch.len(),
                cap = batch_cap,
                "tier-3 batch cap dropped rules from this run"
            );
        }
        if batch.is_empty() {
            return Tier3Outcome {
                result: TierResult::ran(3, 0, 0, Vec::new(), 0),
                usage: LlmUsage::default(),
            };
        }

        let messages = vec![
            ChatMessage::system(JUDGE_SYSTEM_PROMPT),
            ChatMessage::user(build_batch_prompt(
                batch,
                truncate_to_chars(content, self.content_cap),
            )),
        ];

        let response = match provider.complete(messages, &self.completion).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    attempted = batch.len(),
                    error = %e,
                    "tier-3 model request failed"
                );
                return Tier3Outcome::skipped(format!("model request failed: {e}"));
            }
        };

        let mut usage = LlmUsage::default();
        usage.add_response(&response.usage, &response.model);
        self.ledger.fold(&usage);

        let verdicts = match parse_verdicts(&response.content) {
            Ok(verdicts) => verdicts,
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    attempted = batch.len(),
                    error = %e,
                    "tier-3 response unparseable"
                );
                return Tier3Outcome {
                    result: TierResult::skipped(3, format!("model response unparseable: {e}")),
                    usage,
                };
            }
        };

        let by_id: HashMap<&str, &Rule> = batch.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut checked = 0usize;
        let mut passed = 0usize;
        let mut violations = Vec::new();

        for verdict in verdicts {
            let Some(rule) = by_id.get(verdict.rule_id.as_str()) else {
                tracing::debug!(rule_id = %verdict.rule_id, "verdict for unknown rule id ignored");
                continue;
            };

            checked += 1;
            if verdict.passed {
                passed += 1;
            } else {
                violations.push(Violation {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    tier: 3,
                    severity: Severity::derive(3, rule.enforcement),
                    message: if verdict.reason.trim().is_empty() {
                        format!("{} failed model review", rule.name)
                    } else {
                        verdict.reason
                    },
                    fix_suggestion: None,
                    auto_fixable: rule.auto_fixable,
                });
            }
        }

        Tier3Outcome {
            result: TierResult::ran(
                3,
                checked,
                passed,
                violations,
                started.elapsed().as_millis() as u64,
            ),
            usage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerdictPayload {
    verdicts: Vec<Verdict>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    rule_id: String,
    passed: bool,
    #[serde(default)]
    reason: String,
}

/// Extract and parse the structured portion of the model response.
/// Tolerates code fences and surrounding prose.
fn parse_verdicts(content: &str) -> Result<Vec<Verdict>, serde_json::Error> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };
    serde_json::from_str::<VerdictPayload>(json).map(|payload| payload.verdicts)
}
