//! Prompts for the tier-3 content judge.
//!
//! One batched request judges every rule in the batch; the structured JSON
//! output contract keeps reconciliation mechanical.

use pagescore_core::Rule;

/// System prompt for the batched judge.
///
/// The framing keeps the model on the rules it is given: it judges each rule
/// as pass/fail with a short reason and does not invent criteria of its own.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"
You are a content quality judge evaluating web page copy against editorial rules.

Your role:
1. Judge ONLY the rules you are given - do not invent criteria
2. Judge each rule independently against the content
3. Give a short, concrete reason for every verdict
4. When the content gives no evidence either way, the rule fails

## Output Format (JSON only, no surrounding prose)
{
  "verdicts": [
    {
      "rule_id": "string",
      "passed": true,
      "reason": "one short sentence"
    }
  ]
}

Return exactly one verdict per rule id you were given.
"#;

/// Build the user message enumerating the rule batch and the content.
pub fn build_batch_prompt(rules: &[Rule], content: &str) -> String {
    let mut prompt = String::from("## Rules to judge\n\n");

    for (index, rule) in rules.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. [{}] {}: {}\n",
            index + 1,
            rule.id,
            rule.name,
            rule.validation
        ));
    }

    prompt.push_str("\n## Content\n\n");
    prompt.push_str(content);
    prompt.push_str("\n\nJudge every rule above against this content.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescore_core::Enforcement;

    fn rule(id: &str, validation: &str) -> Rule {
        Rule {
            id: id.into(),
            name: format!("Rule {id}"),
            category: "content".into(),
            tier: 3,
            validation: validation.into(),
            check: None,
            enforcement: Enforcement::Required,
            priority: 0,
            auto_fixable: false,
            page_types: vec![],
            industries: vec![],
            active: true,
        }
    }

    #[test]
    fn batch_prompt_enumerates_rules_and_content() {
        let rules = vec![
            rule("t3-1", "Content demonstrates local expertise"),
            rule("t3-2", "Tone is professional and reassuring"),
        ];

        let prompt = build_batch_prompt(&rules, "We have served Austin since 1998.");

        assert!(prompt.contains("[t3-1]"));
        assert!(prompt.contains("[t3-2]"));
        assert!(prompt.contains("local expertise"));
        assert!(prompt.contains("Austin since 1998"));
    }

    #[test]
    fn system_prompt_pins_the_output_contract() {
        assert!(JUDGE_SYSTEM_PROMPT.contains("verdicts"));
        assert!(JUDGE_SYSTEM_PROMPT.contains("rule_id"));
        assert!(JUDGE_SYSTEM_PROMPT.contains("do not invent criteria"));
    }
}
