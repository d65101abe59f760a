//! The predicate registry and the canonical tier-1 predicates.
//!
//! The registry is constructor-injected into [`Tier1Evaluator`] rather than
//! living in module-global state, so tests and embedders can substitute
//! predicates without touching anything shared.
//!
//! [`Tier1Evaluator`]: super::Tier1Evaluator

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::gazetteer;
use crate::rule::Directive;

lazy_static! {
    /// US phone number, optional country code.
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+?1[-.\s]?)?(?:\([0-9]{3}\)|[0-9]{3})[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}"
    ).unwrap();

    /// Currency amount: symbol-prefixed or code-suffixed.
    static ref PRICE_PATTERN: Regex = Regex::new(
        r"(?:[$€£]\s?\d[\d,]*(?:\.\d{1,2})?)|(?:\b\d[\d,]*(?:\.\d{1,2})?\s?(?:USD|EUR|GBP|dollars|euros)\b)"
    ).unwrap();

    /// License/registration-number-shaped token, e.g. "License #TX-482910"
    /// or "Reg. No. 993401". The trailing token must carry digits so prose
    /// like "registration requirements" does not match.
    static ref LICENSE_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:lic(?:ense|ence)?|reg(?:istration)?)\b\.?\s*(?:#|no\.?|number)?\s*:?\s*#?[A-Z0-9-]*\d{3}[A-Z0-9-]*"
    ).unwrap();

    /// Level-2 section heading: Markdown `## ` line or HTML `<h2`.
    static ref HEADING_PATTERN: Regex = Regex::new(
        r"(?mi)^##[ \t]|<h2\b"
    ).unwrap();

    /// Bullet list item: Markdown `- `/`* ` line or HTML `<li`.
    static ref BULLET_PATTERN: Regex = Regex::new(
        r"(?mi)^[ \t]*[-*][ \t]+\S|<li\b"
    ).unwrap();

    /// Bare numeric token, with optional separators and decimals.
    static ref NUMBER_PATTERN: Regex = Regex::new(
        r"\b\d[\d,]*(?:\.\d+)?\b"
    ).unwrap();
}

/// Errors from predicate evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    #[error("predicate '{predicate}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        predicate: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid numeric argument '{0}'")]
    InvalidNumber(String),
}

/// A pure tier-1 predicate: content and string arguments in, verdict out.
pub type PredicateFn = dyn Fn(&str, &[String]) -> Result<bool, PredicateError> + Send + Sync;

/// Named predicate lookup for the tier-1 evaluator.
///
/// BTreeMap keeps iteration deterministic for diagnostics.
pub struct PredicateRegistry {
    predicates: BTreeMap<String, Box<PredicateFn>>,
}

impl PredicateRegistry {
    /// An empty registry. Mostly useful in tests.
    pub fn new() -> Self {
        Self {
            predicates: BTreeMap::new(),
        }
    }

    /// The canonical predicate set.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register("min-words", |content, args| {
            Ok(word_count(content) >= count_arg("min-words", args, 0)?)
        });
        registry.register("max-words", |content, args| {
            Ok(word_count(content) <= count_arg("max-words", args, 0)?)
        });
        registry.register("word-range", |content, args| {
            let min = count_arg("word-range", args, 0)?;
            let max = count_arg("word-range", args, 1)?;
            let words = word_count(content);
            Ok(words >= min && words <= max)
        });

        registry.register("has-phone", |content, _| Ok(PHONE_PATTERN.is_match(content)));
        registry.register("has-price", |content, _| Ok(PRICE_PATTERN.is_match(content)));
        registry.register("has-license", |content, _| {
            Ok(LICENSE_PATTERN.is_match(content))
        });

        registry.register("has-cities", |content, args| {
            Ok(gazetteer::count_cities(content) >= count_arg("has-cities", args, 0)?)
        });

        registry.register("min-headings", |content, args| {
            let wanted = count_arg("min-headings", args, 0)?;
            Ok(HEADING_PATTERN.find_iter(content).count() >= wanted)
        });
        registry.register("min-bullets", |content, args| {
            let wanted = count_arg("min-bullets", args, 0)?;
            Ok(BULLET_PATTERN.find_iter(content).count() >= wanted)
        });

        registry.register("contains", |content, args| {
            Ok(contains_phrase(content, &phrase("contains", args)?))
        });
        registry.register("not-contains", |content, args| {
            Ok(!contains_phrase(content, &phrase("not-contains", args)?))
        });

        registry.register("min-numbers", |content, args| {
            let wanted = count_arg("min-numbers", args, 0)?;
            Ok(NUMBER_PATTERN.find_iter(content).count() >= wanted)
        });

        registry
    }

    /// Register (or replace) a predicate under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&str, &[String]) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Box::new(predicate));
    }

    /// Look up a predicate by name.
    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(name).map(|p| p.as_ref())
    }

    /// Whether a directive's predicate exists and its arguments parse.
    /// Used by catalog loaders to reject malformed rules once, at load.
    pub fn validates(&self, directive: &Directive) -> bool {
        if self.get(&directive.predicate).is_none() {
            return false;
        }
        match directive.predicate.as_str() {
            "min-words" | "max-words" | "has-cities" | "min-headings" | "min-bullets"
            | "min-numbers" => directive.numeric_arg(0).is_ok(),
            "word-range" => directive.numeric_arg(0).is_ok() && directive.numeric_arg(1).is_ok(),
            "contains" | "not-contains" => directive.phrase_arg().is_ok(),
            _ => true,
        }
    }

    /// Registered predicate names, for diagnostics.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

fn contains_phrase(content: &str, phrase: &str) -> bool {
    content.to_lowercase().contains(&phrase.to_lowercase())
}

fn count_arg(
    predicate: &'static str,
    args: &[String],
    index: usize,
) -> Result<usize, PredicateError> {
    let raw = args.get(index).ok_or(PredicateError::ArityMismatch {
        predicate,
        expected: index + 1,
        got: args.len(),
    })?;
    raw.trim()
        .parse::<usize>()
        .map_err(|_| PredicateError::InvalidNumber(raw.clone()))
}

fn phrase(predicate: &'static str, args: &[String]) -> Result<String, PredicateError> {
    if args.is_empty() {
        return Err(PredicateError::ArityMismatch {
            predicate,
            expected: 1,
            got: 0,
        });
    }
    Ok(args.join(":"))
}
