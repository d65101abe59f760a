//! The rule repository boundary and its in-memory implementation.
//!
//! The engine fetches rules fresh per assessment, filtered by tier and
//! applicability and ordered by descending priority. Repository failure is
//! the only error an assessment may surface.

use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use thiserror::Error;

use pagescore_core::{PredicateRegistry, Rule};

/// Catalog schema embedded at compile time.
const RULES_SCHEMA_JSON: &str = include_str!("../schema/rules.schema.json");

/// Compiled schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from rule retrieval and catalog loading.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid catalog YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("catalog failed schema validation: {0}")]
    Schema(String),

    #[error("rule lookup failed: {0}")]
    Backend(String),
}

/// Read contract the engine needs from rule storage.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules for `tier` whose applicability matches the given page
    /// type and industry, ordered by descending priority.
    async fn rules_for(
        &self,
        tier: u8,
        page_type: Option<&str>,
        industry: Option<&str>,
    ) -> Result<Vec<Rule>, RepositoryError>;
}

/// In-memory repository backed by a loaded catalog.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    rules: Vec<Rule>,
}

impl InMemoryRepository {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Load a catalog from a JSON string, validating against the embedded
    /// schema first. Tier-1 rules with malformed directives are dropped
    /// here, with a warning, so the per-assessment path never re-parses a
    /// known-bad directive.
    pub fn from_json_str(json: &str) -> Result<Self, RepositoryError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        validate_catalog_schema(&value)?;
        let rules: Vec<Rule> = serde_json::from_value(value)?;
        Ok(Self::new(validate_directives(rules)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Load a catalog from YAML. YAML catalogs skip JSON Schema validation;
    /// directive validation still applies.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RepositoryError> {
        let rules: Vec<Rule> = serde_yaml::from_str(yaml)?;
        Ok(Self::new(validate_directives(rules)))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Self::from_yaml_str(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRepository {
    async fn rules_for(
        &self,
        tier: u8,
        page_type: Option<&str>,
        industry: Option<&str>,
    ) -> Result<Vec<Rule>, RepositoryError> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.tier == tier && r.active && r.applies_to(page_type, industry))
            .cloned()
            .collect();

        // Stable sort keeps catalog order among equal priorities.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(rules)
    }
}

fn get_validator() -> Result<&'static jsonschema::Validator, RepositoryError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema: serde_json::Value = match serde_json::from_str(RULES_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("invalid embedded schema JSON: {e}")),
        };
        match jsonschema::options().build(&schema) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("failed to compile schema: {e}")),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(RepositoryError::Schema(e.clone())),
    }
}

/// Validate a catalog JSON value against the embedded schema.
pub fn validate_catalog_schema(catalog: &serde_json::Value) -> Result<(), RepositoryError> {
    let validator = get_validator()?;
    let errors: Vec<String> = validator
        .iter_errors(catalog)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RepositoryError::Schema(errors.join("; ")))
    }
}

/// Drop tier-1 rules whose directive does not parse or names no builtin
/// predicate. Malformed directives are caught once, here, not per call.
fn validate_directives(rules: Vec<Rule>) -> Vec<Rule> {
    let registry = PredicateRegistry::with_builtins();

    rules
        .into_iter()
        .filter(|rule| {
            if rule.tier != 1 {
                return true;
            }
            match rule.directive() {
                Ok(directive) if registry.validates(&directive) => true,
                Ok(directive) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        predicate = %directive.predicate,
                        "dropping rule with unknown or malformed predicate"
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "dropping rule with malformed directive");
                    false
                }
            }
        })
        .collect()
}
