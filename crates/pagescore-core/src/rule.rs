//! Rule records and directive parsing.
//!
//! Rules are authored externally and fetched fresh per assessment; the engine
//! never mutates them. A rule's `validation` field keeps the external
//! `name:arg1:arg2` directive format, but tier-1 directives should be parsed
//! into a [`Directive`] once at catalog-load time so malformed ones are
//! caught there instead of on every assessment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Enforcement;

/// Errors from directive parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("empty validation directive")]
    Empty,

    #[error("predicate '{predicate}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        predicate: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid numeric argument '{0}'")]
    InvalidNumber(String),
}

/// The unit of policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// 1, 2, or 3 - determines which evaluator owns this rule.
    pub tier: u8,
    /// Validation directive. Tier 1: `predicate:arg1:arg2`. Tier 2: free-text
    /// description (see [`LinguisticCheck`]). Tier 3: the natural-language
    /// description the model judges.
    pub validation: String,
    /// Explicit tier-2 check tag. Preferred over keyword-scanning the
    /// description, which silently disables a check on any rewording.
    #[serde(default)]
    pub check: Option<CheckKind>,
    pub enforcement: Enforcement,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub auto_fixable: bool,
    /// Page types this rule applies to; empty means unrestricted.
    #[serde(default)]
    pub page_types: Vec<String>,
    /// Industries this rule applies to; empty means unrestricted.
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Rule {
    /// Whether this rule applies to the given page type and industry.
    pub fn applies_to(&self, page_type: Option<&str>, industry: Option<&str>) -> bool {
        let page_ok = self.page_types.is_empty()
            || page_type.is_some_and(|p| self.page_types.iter().any(|t| t == p));
        let industry_ok = self.industries.is_empty()
            || industry.is_some_and(|i| self.industries.iter().any(|t| t == i));
        page_ok && industry_ok
    }

    /// Parse this rule's validation directive. Only meaningful for tier 1.
    pub fn directive(&self) -> Result<Directive, DirectiveError> {
        Directive::parse(&self.validation)
    }

    /// Resolve the tier-2 check for this rule, if any.
    pub fn linguistic_check(&self) -> Option<LinguisticCheck> {
        LinguisticCheck::resolve(self)
    }
}

/// A tier-1 validation directive, parsed from `name:arg1:arg2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub predicate: String,
    pub args: Vec<String>,
}

impl Directive {
    /// Parse the external directive format. The predicate name is
    /// case-normalized; arguments are kept verbatim.
    pub fn parse(raw: &str) -> Result<Self, DirectiveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DirectiveError::Empty);
        }

        let mut parts = raw.split(':');
        let predicate = parts
            .next()
            .expect("split yields at least one part")
            .trim()
            .to_ascii_lowercase();
        if predicate.is_empty() {
            return Err(DirectiveError::Empty);
        }

        // Arguments are kept verbatim so phrase predicates can reassemble
        // text containing colons.
        let args: Vec<String> = parts.map(str::to_string).collect();
        Ok(Self { predicate, args })
    }

    /// Parse argument `index` as a count.
    pub fn numeric_arg(&self, index: usize) -> Result<usize, DirectiveError> {
        let raw = self
            .args
            .get(index)
            .ok_or_else(|| DirectiveError::ArityMismatch {
                predicate: self.predicate.clone(),
                expected: index + 1,
                got: self.args.len(),
            })?;
        raw.trim()
            .parse::<usize>()
            .map_err(|_| DirectiveError::InvalidNumber(raw.clone()))
    }

    /// Remaining arguments joined back together. Lets phrase arguments for
    /// `contains:`-style predicates carry literal colons.
    pub fn phrase_arg(&self) -> Result<String, DirectiveError> {
        if self.args.is_empty() {
            return Err(DirectiveError::ArityMismatch {
                predicate: self.predicate.clone(),
                expected: 1,
                got: 0,
            });
        }
        Ok(self.args.join(":"))
    }
}

/// Explicit tag for a tier-2 linguistic check, authored on the rule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    PassiveVoice,
    Readability,
    FirstSentence,
}

/// A resolved tier-2 check with its thresholds.
#[derive(Debug, Clone, PartialEq)]
pub enum LinguisticCheck {
    /// Fail when the opening paragraph contains a passive construction.
    PassiveVoiceOpening,
    /// Fail when the readability grade level exceeds the ceiling.
    ReadabilityCeiling { max_grade: f64 },
    /// Fail when the first sentence runs longer than the word cap.
    FirstSentenceLength { max_words: usize },
}

impl LinguisticCheck {
    pub const DEFAULT_MAX_GRADE: f64 = 12.0;
    pub const DEFAULT_FIRST_SENTENCE_WORDS: usize = 20;

    /// Resolve the check for a rule: explicit tag first, then a keyword scan
    /// of the description for catalogs that predate the tag. Returns `None`
    /// for rules that match neither; those pass by default.
    pub fn resolve(rule: &Rule) -> Option<Self> {
        if let Some(kind) = rule.check {
            return Some(Self::from_kind(kind));
        }

        let description = rule.validation.to_ascii_lowercase();
        if description.contains("passive voice") {
            Some(Self::PassiveVoiceOpening)
        } else if description.contains("readability") {
            Some(Self::ReadabilityCeiling {
                max_grade: Self::DEFAULT_MAX_GRADE,
            })
        } else if description.contains("first sentence") {
            Some(Self::FirstSentenceLength {
                max_words: Self::DEFAULT_FIRST_SENTENCE_WORDS,
            })
        } else {
            None
        }
    }

    fn from_kind(kind: CheckKind) -> Self {
        match kind {
            CheckKind::PassiveVoice => Self::PassiveVoiceOpening,
            CheckKind::Readability => Self::ReadabilityCeiling {
                max_grade: Self::DEFAULT_MAX_GRADE,
            },
            CheckKind::FirstSentence => Self::FirstSentenceLength {
                max_words: Self::DEFAULT_FIRST_SENTENCE_WORDS,
            },
        }
    }
}
