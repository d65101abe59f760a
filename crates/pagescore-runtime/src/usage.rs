//! Token and cost accounting for tier-3 model calls.
//!
//! Usage is accumulated twice: a request-scoped [`LlmUsage`] returned with
//! every tier-3 outcome (this is what lands in `api_cost`/`tokens_used` on
//! the assessment result), and a lifetime [`UsageLedger`] guarded by a lock
//! so one evaluator instance can serve concurrent assessments safely.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated model usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Number of model calls made.
    pub calls: u32,
    /// Estimated cost in USD.
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Fold one provider response into this accumulator.
    pub fn add_response(&mut self, usage: &TokenUsage, model: &str) {
        self.input_tokens += u64::from(usage.input_tokens);
        self.output_tokens += u64::from(usage.output_tokens);
        self.total_tokens += u64::from(usage.total());
        self.calls += 1;
        self.estimated_cost += estimate_cost(usage, model);
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &LlmUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.calls += other.calls;
        self.estimated_cost += other.estimated_cost;
    }
}

/// Estimate the cost of one call from the response's reported token counts.
///
/// Rates are USD per million tokens (input, output).
pub fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
    let (input_rate, output_rate) = match model {
        m if m.contains("opus-4-5") => (5.0, 25.0),
        m if m.contains("sonnet-4-5") => (3.0, 15.0),
        m if m.contains("haiku-4-5") => (1.0, 5.0),
        _ => (3.0, 15.0), // Default to Sonnet pricing
    };

    let input_cost = (f64::from(usage.input_tokens) / 1_000_000.0) * input_rate;
    let output_cost = (f64::from(usage.output_tokens) / 1_000_000.0) * output_rate;
    input_cost + output_cost
}

/// Lifetime usage totals for a long-lived evaluator instance.
#[derive(Debug, Default)]
pub struct UsageLedger {
    totals: RwLock<LlmUsage>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a request's usage into the lifetime totals.
    pub fn fold(&self, usage: &LlmUsage) {
        self.totals.write().merge(usage);
    }

    /// Snapshot of the lifetime totals.
    pub fn snapshot(&self) -> LlmUsage {
        self.totals.read().clone()
    }

    pub fn reset(&self) {
        *self.totals.write() = LlmUsage::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_estimation_sonnet() {
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        // 1000 * $3/MTok + 500 * $15/MTok = 0.003 + 0.0075
        let cost = estimate_cost(&usage, "claude-sonnet-4-5-20250514");
        assert!((cost - 0.0105).abs() < 1e-9);
    }

    #[test]
    fn cost_estimation_haiku_is_cheaper() {
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 500,
        };
        assert!(estimate_cost(&usage, "claude-haiku-4-5") < estimate_cost(&usage, "claude-opus-4-5"));
    }

    #[test]
    fn add_response_accumulates() {
        let mut usage = LlmUsage::default();
        let response_usage = TokenUsage {
            input_tokens: 200,
            output_tokens: 100,
        };

        usage.add_response(&response_usage, "claude-sonnet-4-5");
        usage.add_response(&response_usage, "claude-sonnet-4-5");

        assert_eq!(usage.calls, 2);
        assert_eq!(usage.total_tokens, 600);
        assert_eq!(usage.input_tokens, 400);
        assert!(usage.estimated_cost > 0.0);
    }

    #[test]
    fn ledger_folds_request_usage() {
        let ledger = UsageLedger::new();

        let mut request_usage = LlmUsage::default();
        request_usage.add_response(
            &TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            "claude-sonnet-4-5",
        );

        ledger.fold(&request_usage);
        ledger.fold(&request_usage);

        let totals = ledger.snapshot();
        assert_eq!(totals.calls, 2);
        assert_eq!(totals.total_tokens, 300);

        ledger.reset();
        assert_eq!(ledger.snapshot().total_tokens, 0);
    }

    #[test]
    fn ledger_is_safe_under_concurrent_folds() {
        use std::sync::Arc;

        let ledger = Arc::new(UsageLedger::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let mut usage = LlmUsage::default();
                    usage.add_response(
                        &TokenUsage {
                            input_tokens: 10,
                            output_tokens: 5,
                        },
                        "claude-sonnet-4-5",
                    );
                    ledger.fold(&usage);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let totals = ledger.snapshot();
        assert_eq!(totals.calls, 800);
        assert_eq!(totals.total_tokens, 800 * 15);
    }
}
