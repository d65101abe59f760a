//! Model-service provider abstraction for tier 3.
//!
//! The [`LlmProvider`] trait is the only place model calls are made; the
//! rest of the engine never touches the network. Credential absence must be
//! detectable (via [`LlmProvider::health_check`]) so tier 3 can report
//! itself skipped instead of failing the assessment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod credential;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use credential::ApiCredential;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, ANTHROPIC_API_KEY_ENV};

/// Errors from model-service providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature; 0.0 keeps the judge as deterministic as the service
    /// allows.
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout. The transport owns timeout behavior; the engine
    /// performs no retries.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout: default_timeout(),
        }
    }
}

/// A chat message for completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system" or "user".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text.
    pub content: String,
    /// Token usage as reported by the service.
    pub usage: TokenUsage,
    /// Model that served the request.
    pub model: String,
}

/// Token counts reported by the model service for one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Provider abstraction allows swapping model backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion. Blocking from the engine's perspective:
    /// one round-trip, no internal retry.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Whether the provider is usable (credential present).
    async fn health_check(&self) -> bool;

    /// Provider name for telemetry.
    fn name(&self) -> &str;
}
