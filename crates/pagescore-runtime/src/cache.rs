//! Optional in-memory result cache.
//!
//! Identical content, options, and request scope within the TTL return the
//! original result, tier-3 cost included, without re-running the pipeline.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use pagescore_core::{AssessmentOptions, AssessmentResult};

/// Cache key over the full request identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    content_hash: u64,
    options_hash: u64,
    page_type: Option<String>,
    industry: Option<String>,
}

impl CacheKey {
    pub fn new(
        content: &str,
        page_type: Option<&str>,
        industry: Option<&str>,
        options: &AssessmentOptions,
    ) -> Self {
        Self {
            content_hash: hash_content(content),
            options_hash: hash_options(options),
            page_type: page_type.map(str::to_string),
            industry: industry.map(str::to_string),
        }
    }
}

/// Assessment result cache backed by moka.
pub struct AssessmentCache {
    cache: Cache<CacheKey, AssessmentResult>,
}

impl AssessmentCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<AssessmentResult> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, result: AssessmentResult) {
        self.cache.insert(key, result).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

fn hash_options(options: &AssessmentOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    options.run_tier3.hash(&mut hasher);
    options.short_circuit.hash(&mut hasher);
    options.max_tier3_rules.hash(&mut hasher);
    hasher.finish()
}
