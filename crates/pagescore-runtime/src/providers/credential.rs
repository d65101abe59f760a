//! Secure API credential handling.
//!
//! The key is wrapped so it cannot leak through `Debug` output or error
//! messages; it is exposed only at the point of use.

use secrecy::{ExposeSecret, SecretString};

use super::ProviderError;

/// A model-service API key.
pub struct ApiCredential {
    secret: SecretString,
}

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(key.into()),
        }
    }

    /// Read the credential from an environment variable. Missing or empty
    /// values are a configuration error the caller turns into a skipped
    /// tier, not a panic.
    pub fn from_env(var: &str) -> Result<Self, ProviderError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::new(value)),
            _ => Err(ProviderError::NotConfigured(format!(
                "environment variable {var} is not set"
            ))),
        }
    }

    /// Expose the raw key. Call only at the request site.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiCredential([REDACTED])")
    }
}
