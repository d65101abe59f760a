//! The NLP analysis capability consumed by tier 2.
//!
//! Tier 2 needs sentence boundaries, lightweight per-token tags, and a
//! readability grade. The capability sits behind the [`NlpAnalyzer`] trait so
//! an embedder can supply a heavier parser; when no analyzer is wired in,
//! tier 2 reports itself skipped. The bundled [`HeuristicAnalyzer`] is
//! deterministic and dependency-free.

use std::collections::HashSet;

use lazy_static::lazy_static;

/// Parsed view of a piece of content. Produced once per assessment and
/// reused across every tier-2 rule.
#[derive(Debug, Clone)]
pub struct Document {
    pub sentences: Vec<Sentence>,
    pub word_count: usize,
    /// Flesch-Kincaid grade level estimate.
    pub grade_level: f64,
}

impl Document {
    /// Sentences belonging to the opening paragraph.
    pub fn opening_paragraph(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences.iter().filter(|s| s.paragraph == 0)
    }

    pub fn first_sentence(&self) -> Option<&Sentence> {
        self.sentences.first()
    }
}

#[derive(Debug, Clone)]
pub struct Sentence {
    pub text: String,
    /// Zero-based paragraph index this sentence belongs to.
    pub paragraph: usize,
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    /// Whether this sentence contains a passive construction: an auxiliary
    /// followed by a past participle within the next two tokens.
    pub fn has_passive_construction(&self) -> bool {
        self.tokens.iter().enumerate().any(|(i, token)| {
            token.tag == PosTag::Aux
                && self.tokens[i + 1..]
                    .iter()
                    .take(2)
                    .any(|t| t.tag == PosTag::Participle)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub tag: PosTag,
}

/// Lightweight part-of-speech tag. Only the distinctions tier 2 needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    /// Auxiliary / copula ("was", "is", "been"...).
    Aux,
    /// Past-participle-shaped word ("written", "closed"...).
    Participle,
    Number,
    Word,
}

/// Produces a [`Document`] from raw text.
pub trait NlpAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Document;
}

lazy_static! {
    static ref AUXILIARIES: HashSet<&'static str> = [
        "am", "is", "are", "was", "were", "be", "been", "being", "get", "gets", "got",
    ]
    .into_iter()
    .collect();

    static ref IRREGULAR_PARTICIPLES: HashSet<&'static str> = [
        "done", "made", "given", "taken", "seen", "known", "found", "built", "sold",
        "bought", "sent", "kept", "held", "left", "lost", "paid", "told", "written",
        "chosen", "shown", "driven", "broken", "spoken", "worn", "drawn", "grown",
        "thrown", "caught", "taught", "brought", "thought", "felt", "meant", "put",
        "set", "run", "won", "led", "read", "said", "laid",
    ]
    .into_iter()
    .collect();
}

/// Bundled rule-based analyzer: punctuation sentence splitting, vowel-group
/// syllable counting, Flesch-Kincaid grade.
#[derive(Debug, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl NlpAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, text: &str) -> Document {
        let mut sentences = Vec::new();

        for (paragraph, block) in paragraphs(text).enumerate() {
            for raw in split_sentences(block) {
                let tokens = tokenize(&raw);
                if tokens.is_empty() {
                    continue;
                }
                sentences.push(Sentence {
                    text: raw,
                    paragraph,
                    tokens,
                });
            }
        }

        let word_count: usize = sentences.iter().map(Sentence::word_count).sum();
        let syllables: usize = sentences
            .iter()
            .flat_map(|s| s.tokens.iter())
            .map(|t| syllable_count(&t.text))
            .sum();

        let grade_level = if word_count == 0 || sentences.is_empty() {
            0.0
        } else {
            let words_per_sentence = word_count as f64 / sentences.len() as f64;
            let syllables_per_word = syllables as f64 / word_count as f64;
            (0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59).max(0.0)
        };

        Document {
            sentences,
            word_count,
            grade_level,
        }
    }
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
}

/// Split a paragraph into sentences on terminal punctuation, with a
/// look-ahead so decimals and tight abbreviations don't split.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    for i in 0..len {
        current.push(chars[i]);

        if !matches!(chars[i], '.' | '!' | '?') {
            continue;
        }

        let at_end = i + 1 >= len;
        let next_is_space = !at_end && chars[i + 1].is_whitespace();

        if at_end || next_is_space {
            let trimmed = current.trim().to_string();
            if trimmed.len() > 2 {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }

    let trimmed = current.trim().to_string();
    if trimmed.len() > 2 {
        sentences.push(trimmed);
    }

    sentences
}

fn tokenize(sentence: &str) -> Vec<Token> {
    sentence
        .split_whitespace()
        .filter_map(|raw| {
            let text: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if text.is_empty() {
                return None;
            }
            let tag = tag_token(&text);
            Some(Token { text, tag })
        })
        .collect()
}

fn tag_token(word: &str) -> PosTag {
    if word.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        PosTag::Number
    } else if AUXILIARIES.contains(word) {
        PosTag::Aux
    } else if is_participle_shaped(word) {
        PosTag::Participle
    } else {
        PosTag::Word
    }
}

fn is_participle_shaped(word: &str) -> bool {
    if IRREGULAR_PARTICIPLES.contains(word) {
        return true;
    }
    word.len() > 3 && (word.ends_with("ed") || word.ends_with("en"))
}

/// Vowel-group syllable estimate with a silent-e adjustment.
fn syllable_count(word: &str) -> usize {
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_was_vowel = false;

    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = vowel;
    }

    if word.ends_with('e') && !word.ends_with("le") && count > 1 {
        count -= 1;
    }

    count.max(1)
}
