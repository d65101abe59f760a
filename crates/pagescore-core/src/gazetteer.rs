//! Bundled place-name gazetteer.
//!
//! The city list ships with the crate so `has-cities` works without any
//! external data source. Matching is whole-word and case-insensitive;
//! multi-word names ("New York", "Salt Lake City") match as phrases.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// City list embedded at compile time, one name per line.
const CITIES_TXT: &str = include_str!("../data/cities.txt");

lazy_static! {
    static ref CITY_MATCHERS: Vec<(String, Regex)> = {
        // BTreeSet dedupes repeated entries and fixes iteration order.
        let names: BTreeSet<&str> = CITIES_TXT
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        names
            .into_iter()
            .map(|name| {
                let pattern = format!(r"\b{}\b", regex::escape(name));
                let re = RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("city name escapes to a valid pattern");
                (name.to_string(), re)
            })
            .collect()
    };
}

/// Count distinct gazetteer cities mentioned in `content`.
pub fn count_cities(content: &str) -> usize {
    CITY_MATCHERS
        .iter()
        .filter(|(_, re)| re.is_match(content))
        .count()
}

/// The distinct gazetteer cities mentioned in `content`.
pub fn find_cities(content: &str) -> Vec<&'static str> {
    CITY_MATCHERS
        .iter()
        .filter(|(_, re)| re.is_match(content))
        .map(|(name, _)| name.as_str())
        .collect()
}
