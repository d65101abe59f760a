//! Execution of the enumerated tier-2 checks against a parsed document.

use crate::nlp::Document;
use crate::rule::LinguisticCheck;

/// Result of running one linguistic check.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub passed: bool,
    pub detail: String,
    pub fix: Option<String>,
}

impl CheckOutcome {
    fn pass() -> Self {
        Self {
            passed: true,
            detail: String::new(),
            fix: None,
        }
    }

    fn fail(detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
            fix: Some(fix.into()),
        }
    }
}

impl LinguisticCheck {
    /// Run this check against the parsed document.
    pub fn run(&self, document: &Document) -> CheckOutcome {
        match self {
            LinguisticCheck::PassiveVoiceOpening => {
                let passive = document
                    .opening_paragraph()
                    .any(|s| s.has_passive_construction());
                if passive {
                    CheckOutcome::fail(
                        "passive voice in the opening paragraph",
                        "Rewrite the opening paragraph in active voice",
                    )
                } else {
                    CheckOutcome::pass()
                }
            }
            LinguisticCheck::ReadabilityCeiling { max_grade } => {
                if document.grade_level > *max_grade {
                    CheckOutcome::fail(
                        format!(
                            "readability grade {:.1} exceeds the ceiling of {:.0}",
                            document.grade_level, max_grade
                        ),
                        "Shorten sentences and prefer simpler words",
                    )
                } else {
                    CheckOutcome::pass()
                }
            }
            LinguisticCheck::FirstSentenceLength { max_words } => {
                match document.first_sentence() {
                    Some(first) if first.word_count() > *max_words => CheckOutcome::fail(
                        format!(
                            "first sentence runs {} words, cap is {}",
                            first.word_count(),
                            max_words
                        ),
                        format!("Open with a sentence of {max_words} words or fewer"),
                    ),
                    _ => CheckOutcome::pass(),
                }
            }
        }
    }
}
