//! Engine configuration.
//!
//! Everything here is engine-wide policy with serde defaults; per-call
//! switches live on `AssessmentOptions`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::providers::CompletionConfig;

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Critical tier-1 violations at or above this count short-circuit the
    /// rest of the pipeline.
    #[serde(default = "default_critical_threshold")]
    pub critical_short_circuit: usize,

    /// Tier-2 failed fraction above this cutoff short-circuits tier 3.
    #[serde(default = "default_tier2_cutoff")]
    pub tier2_failure_cutoff: f64,

    /// Minimum overall score to pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u32,

    /// Character cap on content handed to the NLP analyzer.
    #[serde(default = "default_tier2_content_cap")]
    pub tier2_content_cap: usize,

    /// Character cap on the content prefix sent to the model service.
    #[serde(default = "default_tier3_content_cap")]
    pub tier3_content_cap: usize,

    /// Model completion settings for tier 3.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_critical_threshold() -> usize {
    3
}

fn default_tier2_cutoff() -> f64 {
    0.5
}

fn default_pass_threshold() -> u32 {
    70
}

fn default_tier2_content_cap() -> usize {
    100_000
}

fn default_tier3_content_cap() -> usize {
    5_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_short_circuit: default_critical_threshold(),
            tier2_failure_cutoff: default_tier2_cutoff(),
            pass_threshold: default_pass_threshold(),
            tier2_content_cap: default_tier2_content_cap(),
            tier3_content_cap: default_tier3_content_cap(),
            completion: CompletionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Assessment result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disabled by default; assessments are cheap enough until tier 3 is in
    /// play.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,

    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub ttl: Duration,
}

fn default_cache_entries() -> u64 {
    1024
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(600)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_cache_entries(),
            ttl: default_cache_ttl(),
        }
    }
}
