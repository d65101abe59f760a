//! End-to-end pipeline tests: in-memory catalog, heuristic analyzer, and a
//! scripted model provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use pagescore_core::{
    AssessmentOptions, Enforcement, HeuristicAnalyzer, Rule, Severity,
};
use pagescore_runtime::{
    AssessmentEngine, ChatMessage, CompletionConfig, CompletionResponse, EngineConfig,
    InMemoryRepository, LlmProvider, ProviderError, TokenUsage,
};

fn rule(id: &str, tier: u8, validation: &str, enforcement: Enforcement) -> Rule {
    Rule {
        id: id.into(),
        name: format!("Rule {id}"),
        category: "content".into(),
        tier,
        validation: validation.into(),
        check: None,
        enforcement,
        priority: 0,
        auto_fixable: false,
        page_types: vec![],
        industries: vec![],
        active: true,
    }
}

/// Provider that judges every rule it is sent: pass unless the id is in
/// `fail_ids`. Rule ids are read back out of the batch prompt.
struct EchoProvider {
    fail_ids: Vec<String>,
    calls: AtomicUsize,
}

impl EchoProvider {
    fn passing() -> Self {
        Self {
            fail_ids: vec![],
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_ids(ids: &[&str]) -> Self {
        Self {
            fail_ids: ids.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn ids_in_prompt(prompt: &str) -> Vec<String> {
        let mut ids = Vec::new();
        for line in prompt.lines() {
            if line.starts_with("## Content") {
                break;
            }
            if let (Some(open), Some(close)) = (line.find('['), line.find(']')) {
                if open < close {
                    ids.push(line[open + 1..close].to_string());
                }
            }
        }
        ids
    }
}

#[async_trait]
impl LlmProvider for EchoProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let verdicts: Vec<serde_json::Value> = Self::ids_in_prompt(&prompt)
            .into_iter()
            .map(|id| {
                let passed = !self.fail_ids.contains(&id);
                serde_json::json!({
                    "rule_id": id,
                    "passed": passed,
                    "reason": if passed { "covered" } else { "not addressed" },
                })
            })
            .collect();

        Ok(CompletionResponse {
            content: serde_json::json!({ "verdicts": verdicts }).to_string(),
            usage: TokenUsage {
                input_tokens: 500,
                output_tokens: 120,
            },
            model: "claude-sonnet-4-5-20250514".to_string(),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Provider whose every call fails at the transport.
struct BrokenProvider;

#[async_trait]
impl LlmProvider for BrokenProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::HttpError("connection refused".to_string()))
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn rich_content() -> String {
    let mut content = String::from(
        "## Services\n\nCall (555) 123-4567 for a quote from $99. \
         We cover Austin, Dallas, and Houston.\n\n## Coverage\n\n",
    );
    for i in 0..220 {
        content.push_str(&format!("word{i} "));
    }
    content
}

fn tier1_presence_rules() -> Vec<Rule> {
    vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t1-price", 1, "has-price", Enforcement::Required),
    ]
}

#[tokio::test]
async fn bare_content_fails_with_critical_violations() {
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(tier1_presence_rules())))
        .build()
        .unwrap();

    let content = "A".repeat(1000);
    let result = engine
        .assess(&content, None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    let criticals = result
        .violations
        .iter()
        .filter(|v| v.severity == Severity::Critical)
        .count();
    assert!(criticals >= 2);
    assert!(result.overall_score < 70);
    assert!(!result.passed);
}

#[tokio::test]
async fn rich_content_passes_five_tier1_conditions() {
    let rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t1-price", 1, "has-price", Enforcement::Required),
        rule("t1-cities", 1, "has-cities:3", Enforcement::Required),
        rule("t1-headings", 1, "min-headings:2", Enforcement::Required),
        rule("t1-words", 1, "min-words:200", Enforcement::Required),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .build()
        .unwrap();

    let result = engine
        .assess(&rich_content(), None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    let tier1 = &result.tier_results[&1];
    assert_eq!(tier1.rules_passed, 5);
    assert!(tier1.violations.is_empty());
    assert!(!tier1.skipped);
    assert_eq!(result.overall_score, 100);
    assert!(result.passed);
}

#[tokio::test]
async fn three_criticals_short_circuit_the_pipeline() {
    let mut rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t1-price", 1, "has-price", Enforcement::Required),
        rule("t1-cities", 1, "has-cities:2", Enforcement::Required),
        rule("t2-read", 2, "Keep readability reasonable", Enforcement::Required),
    ];
    rules.push(rule("t3-tone", 3, "Tone is professional", Enforcement::Required));

    let provider = Arc::new(EchoProvider::passing());
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .analyzer(Arc::new(HeuristicAnalyzer::new()))
        .provider(Arc::clone(&provider) as Arc<dyn LlmProvider>)
        .build()
        .unwrap();

    let result = engine
        .assess("Nothing useful here.", None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    assert_eq!(result.tiers_run, vec![1]);
    assert!(result.tier_results[&2].skipped);
    assert!(result.tier_results[&3].skipped);
    assert!(result.tier_results[&2]
        .skip_reason
        .as_deref()
        .unwrap()
        .contains("critical"));
    // The model was never called.
    assert_eq!(provider.calls(), 0);
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("critical")));
}

#[tokio::test]
async fn short_circuit_disabled_runs_later_tiers() {
    let rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t1-price", 1, "has-price", Enforcement::Required),
        rule("t1-cities", 1, "has-cities:2", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];

    let provider = Arc::new(EchoProvider::passing());
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::clone(&provider) as Arc<dyn LlmProvider>)
        .build()
        .unwrap();

    let options = AssessmentOptions {
        short_circuit: false,
        ..AssessmentOptions::default()
    };
    let result = engine
        .assess("Nothing useful here.", None, None, &options)
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(!result.tier_results[&3].skipped);
}

#[tokio::test]
async fn missing_analyzer_skips_tier2_but_completes() {
    let rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t2-read", 2, "Keep readability reasonable", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::new(EchoProvider::passing()))
        .build()
        .unwrap();

    let result = engine
        .assess(
            "Call (555) 123-4567 today.",
            None,
            None,
            &AssessmentOptions::default(),
        )
        .await
        .unwrap();

    let tier2 = &result.tier_results[&2];
    assert_eq!(tier2.rules_checked, 0);
    assert_eq!(tier2.rules_passed, 0);
    assert!(tier2.skipped);

    // Tier 1 and tier 3 outcomes are still present and well-formed.
    assert_eq!(result.tier_results[&1].rules_passed, 1);
    assert_eq!(result.tier_results[&3].rules_passed, 1);
    assert_eq!(result.tiers_run, vec![1, 3]);
}

#[tokio::test]
async fn tier3_batch_cap_sends_exactly_ten_rules() {
    let mut rules = vec![rule("t1-words", 1, "min-words:1", Enforcement::Required)];
    for i in 1..=15 {
        rules.push(rule(
            &format!("t3-{i}"),
            3,
            "Judge this aspect",
            Enforcement::Required,
        ));
    }

    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::new(EchoProvider::passing()))
        .build()
        .unwrap();

    let result = engine
        .assess("Some content.", None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    let tier3 = &result.tier_results[&3];
    assert_eq!(tier3.rules_checked, 10);
    assert_eq!(tier3.rules_passed, 10);
}

#[tokio::test]
async fn model_transport_failure_does_not_propagate() {
    let rules = vec![
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::new(BrokenProvider))
        .build()
        .unwrap();

    let result = engine
        .assess("Some content.", None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    assert_eq!(result.tier_results[&3].rules_passed, 0);
    assert!(result.tier_results[&3].skipped);
    assert!(result.tier_results[&3]
        .skip_reason
        .as_deref()
        .unwrap()
        .contains("model request failed"));
}

#[tokio::test]
async fn no_provider_skips_tier3_with_reason() {
    let rules = vec![
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .build()
        .unwrap();

    let result = engine
        .assess("Some content.", None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    assert!(result.tier_results[&3].skipped);
    assert!(result.tier_results[&3]
        .skip_reason
        .as_deref()
        .unwrap()
        .contains("not configured"));
}

#[tokio::test]
async fn run_tier3_false_disables_the_model_stage() {
    let rules = vec![
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];
    let provider = Arc::new(EchoProvider::passing());
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::clone(&provider) as Arc<dyn LlmProvider>)
        .build()
        .unwrap();

    let options = AssessmentOptions {
        run_tier3: false,
        ..AssessmentOptions::default()
    };
    let result = engine
        .assess("Some content.", None, None, &options)
        .await
        .unwrap();

    assert!(result.tier_results[&3].skipped);
    assert_eq!(provider.calls(), 0);
    assert_eq!(result.api_cost, 0.0);
    assert_eq!(result.tokens_used, 0);
}

#[tokio::test]
async fn high_tier2_failure_rate_short_circuits_tier3() {
    let mut passive = rule(
        "t2-passive",
        2,
        "Avoid passive voice in the opening",
        Enforcement::Required,
    );
    passive.check = Some(pagescore_core::CheckKind::PassiveVoice);

    let rules = vec![
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
        passive,
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];

    let provider = Arc::new(EchoProvider::passing());
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .analyzer(Arc::new(HeuristicAnalyzer::new()))
        .provider(Arc::clone(&provider) as Arc<dyn LlmProvider>)
        .build()
        .unwrap();

    // Passive opening fails the only tier-2 rule: failure rate 1.0 > 0.5.
    let result = engine
        .assess(
            "The houses were built by local crews.\n\nWe serve the region.",
            None,
            None,
            &AssessmentOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.tier_results[&3].skipped);
    assert!(result.tier_results[&3]
        .skip_reason
        .as_deref()
        .unwrap()
        .contains("tier-2 failure rate"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn violations_are_grouped_by_tier_in_order() {
    let mut passive = rule(
        "t2-passive",
        2,
        "Avoid passive voice in the opening",
        Enforcement::Recommended,
    );
    passive.check = Some(pagescore_core::CheckKind::PassiveVoice);

    let rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Recommended),
        rule("t1-price", 1, "has-price", Enforcement::Recommended),
        passive,
    ];

    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .analyzer(Arc::new(HeuristicAnalyzer::new()))
        .build()
        .unwrap();

    let result = engine
        .assess(
            "The houses were built by local crews.\n\nWe serve the region.",
            None,
            None,
            &AssessmentOptions::default(),
        )
        .await
        .unwrap();

    let tiers: Vec<u8> = result.violations.iter().map(|v| v.tier).collect();
    assert_eq!(tiers, vec![1, 1, 2]);
    assert_eq!(result.violations[0].rule_id, "t1-phone");
    assert_eq!(result.violations[1].rule_id, "t1-price");
}

#[tokio::test]
async fn assessment_is_idempotent_without_tier3() {
    let rules = vec![
        rule("t1-phone", 1, "has-phone", Enforcement::Required),
        rule("t1-words", 1, "min-words:5", Enforcement::Recommended),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .build()
        .unwrap();

    let options = AssessmentOptions {
        run_tier3: false,
        ..AssessmentOptions::default()
    };
    let content = "Call (555) 123-4567 for a free estimate on any repair.";

    let first = engine.assess(content, None, None, &options).await.unwrap();
    let second = engine.assess(content, None, None, &options).await.unwrap();

    assert_eq!(first.overall_score, second.overall_score);
    assert_eq!(first.violations, second.violations);
    assert_eq!(first.tiers_run, second.tiers_run);
}

#[tokio::test]
async fn enabled_cache_returns_the_original_result() {
    let rules = vec![rule("t1-words", 1, "min-words:1", Enforcement::Required)];

    let mut config = EngineConfig::default();
    config.cache.enabled = true;

    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .config(config)
        .build()
        .unwrap();

    let options = AssessmentOptions::default();
    let first = engine
        .assess("Cached content.", None, None, &options)
        .await
        .unwrap();
    let second = engine
        .assess("Cached content.", None, None, &options)
        .await
        .unwrap();

    // The cached result is returned verbatim, timestamp included.
    assert_eq!(first.assessed_at, second.assessed_at);
}

#[tokio::test]
async fn tier3_usage_lands_in_the_result() {
    let rules = vec![
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
        rule("t3-tone", 3, "Tone is professional", Enforcement::Required),
    ];
    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .provider(Arc::new(EchoProvider::passing()))
        .build()
        .unwrap();

    let result = engine
        .assess("Some content.", None, None, &AssessmentOptions::default())
        .await
        .unwrap();

    assert_eq!(result.tokens_used, 620);
    assert!(result.api_cost > 0.0);
    assert_eq!(engine.lifetime_usage().calls, 1);
}

#[tokio::test]
async fn page_type_scoping_reaches_the_evaluators() {
    let mut landing_only = rule("t1-phone", 1, "has-phone", Enforcement::Required);
    landing_only.page_types = vec!["landing".into()];
    let rules = vec![
        landing_only,
        rule("t1-words", 1, "min-words:1", Enforcement::Required),
    ];

    let engine = AssessmentEngine::builder()
        .repository(Arc::new(InMemoryRepository::new(rules)))
        .build()
        .unwrap();

    let options = AssessmentOptions {
        run_tier3: false,
        ..AssessmentOptions::default()
    };

    // On a blog page the phone rule does not apply.
    let blog = engine
        .assess("No phone here.", Some("blog"), None, &options)
        .await
        .unwrap();
    assert_eq!(blog.tier_results[&1].rules_checked, 1);
    assert!(blog.violations.is_empty());

    // On a landing page it does, and fails.
    let landing = engine
        .assess("No phone here.", Some("landing"), None, &options)
        .await
        .unwrap();
    assert_eq!(landing.tier_results[&1].rules_checked, 2);
    assert_eq!(landing.violations.len(), 1);
    assert_eq!(landing.page_type.as_deref(), Some("landing"));
}
