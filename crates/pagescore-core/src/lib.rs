//! # pagescore-core
//!
//! Deterministic half of the content assessment engine.
//!
//! This crate scores a piece of text against a catalog of quality rules.
//! It owns the shared data model, the tier-1 predicate evaluator, the
//! tier-2 linguistic evaluator, and the aggregation policy. Everything here
//! is synchronous and free of I/O; model-assisted (tier-3) evaluation and
//! orchestration live in `pagescore-runtime`.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same content and rules always produce the same
//!    tier results.
//! 2. **Never aborts a batch**: a malformed directive or predicate error
//!    skips that rule and the loop continues.
//! 3. **Closed wire shape**: the serialized result field names are a
//!    compatibility contract with downstream consumers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagescore_core::{PredicateRegistry, Tier1Evaluator};
//!
//! let evaluator = Tier1Evaluator::new(PredicateRegistry::with_builtins());
//! let result = evaluator.evaluate(content, &rules);
//! assert_eq!(result.rules_passed + result.violations.len(), result.rules_checked);
//! ```

pub mod aggregate;
pub mod gazetteer;
pub mod nlp;
pub mod rule;
pub mod tier1;
pub mod tier2;
pub mod types;

// Re-export main types at crate root
pub use aggregate::{AggregationInput, Aggregator, DEFAULT_PASS_THRESHOLD};
pub use nlp::{Document, HeuristicAnalyzer, NlpAnalyzer, PosTag, Sentence, Token};
pub use rule::{CheckKind, Directive, DirectiveError, LinguisticCheck, Rule};
pub use tier1::{PredicateError, PredicateRegistry, Tier1Evaluator};
pub use tier2::{truncate_to_chars, Tier2Evaluator};
pub use types::{
    AssessmentOptions, AssessmentResult, Enforcement, Severity, TierResult, Violation,
};
