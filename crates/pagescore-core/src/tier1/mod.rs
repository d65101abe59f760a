//! Tier-1 evaluation: deterministic, pattern-based predicates.
//!
//! Free and fast. No I/O, no allocation beyond the match scan, and a
//! predicate failure never aborts the batch.

mod evaluator;
mod predicates;

pub use evaluator::Tier1Evaluator;
pub use predicates::{PredicateError, PredicateFn, PredicateRegistry};
