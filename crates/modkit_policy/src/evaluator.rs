//! Threshold derivation and action resolution. Pure functions:
//! no I/O, no knowledge of how the policy or trust score were fetched.

use modkit_domain::scores::CATEGORIES;
use modkit_domain::{Action, CategoryScores, Policy};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct EvalResult {
    pub action: Action,
    pub effective_thresholds: BTreeMap<String, f64>,
    pub triggered_rules: Vec<String>,
}

/// Threshold derivation, in this order:
/// 1. Start from policy thresholds.
/// 2. Apply matching `context_overrides`, clamped to `[0.05, 1.0]`.
/// 3. If `trust_score < 0.5`, subtract `(0.5 - trust) * 0.2`, floored at `0.1`.
pub fn derive_thresholds(
    policy: &Policy,
    context: &Value,
    trust_score: Option<f64>,
) -> BTreeMap<String, f64> {
    let mut thresholds = policy.thresholds_map();

    for rule in policy.scope_parsed().context_overrides {
        if context_matches(&rule.match_, context) {
            for (category, adjustment) in &rule.threshold_adjustments {
                let entry = thresholds.entry(category.clone()).or_insert(0.5);
                *entry = (*entry + adjustment).clamp(0.05, 1.0);
            }
        }
    }

    if let Some(trust) = trust_score {
        if trust < 0.5 {
            let penalty = (0.5 - trust) * 0.2;
            for value in thresholds.values_mut() {
                *value = (*value - penalty).max(0.1);
            }
        }
    }

    thresholds
}

fn context_matches(match_: &BTreeMap<String, Value>, context: &Value) -> bool {
    let Some(context_obj) = context.as_object() else {
        return match_.is_empty();
    };
    match_
        .iter()
        .all(|(k, v)| context_obj.get(k).map(|cv| cv == v).unwrap_or(false))
}

/// Action resolution: for each category whose score clears its
/// effective threshold, consider the policy's configured action for that
/// category; the final action is the strictest triggered one, default
/// `allow`.
pub fn resolve_action(
    scores: &CategoryScores,
    policy: &Policy,
    effective_thresholds: &BTreeMap<String, f64>,
) -> (Action, Vec<String>) {
    let actions = policy.actions_map();
    let mut final_action = Action::Allow;
    let mut triggered = Vec::new();

    for category in CATEGORIES {
        let threshold = match effective_thresholds.get(category) {
            Some(t) => *t,
            None => continue,
        };
        let score = scores.get(category);
        if score >= threshold {
            if let Some(action) = actions.get(category) {
                final_action = final_action.strictest(*action);
                triggered.push(format!("{category} \u{2265} {threshold:.2}"));
            }
        }
    }

    (final_action, triggered)
}

pub fn evaluate(
    policy: &Policy,
    scores: &CategoryScores,
    context: &Value,
    trust_score: Option<f64>,
) -> EvalResult {
    let effective_thresholds = derive_thresholds(policy, context, trust_score);
    let (action, triggered_rules) = resolve_action(scores, policy, &effective_thresholds);
    EvalResult { action, effective_thresholds, triggered_rules }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_domain::PolicyStatus;
    use uuid::Uuid;

    fn policy_with(thresholds: Value, actions: Value, scope: Value) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            name: "standard".into(),
            version: 1,
            thresholds,
            actions,
            scope,
            status: PolicyStatus::Published,
            effective_date: None,
            created_by: "system".into(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn scenario_1_friendly_message_allows() {
        let policy = policy_with(
            serde_json::json!({"toxicity": 0.8, "hate": 0.7, "harassment": 0.75}),
            serde_json::json!({"toxicity": "block", "hate": "block", "harassment": "warn"}),
            serde_json::json!({}),
        );
        let scores = CategoryScores::default();
        let result = evaluate(&policy, &scores, &serde_json::json!({}), None);
        assert_eq!(result.action, Action::Allow);
        assert!(result.triggered_rules.is_empty());
    }

    #[test]
    fn scenario_3_high_scores_block_with_triggered_rules() {
        let policy = policy_with(
            serde_json::json!({"toxicity": 0.8, "hate": 0.7}),
            serde_json::json!({"toxicity": "block", "hate": "block"}),
            serde_json::json!({}),
        );
        let mut scores = CategoryScores::default();
        scores.toxicity = 0.92;
        scores.hate = 0.95;
        let result = evaluate(&policy, &scores, &serde_json::json!({}), None);
        assert_eq!(result.action, Action::Block);
        assert!(result.triggered_rules.iter().any(|r| r.contains("toxicity")));
        assert!(result.triggered_rules.iter().any(|r| r.contains("hate")));
    }

    #[test]
    fn scenario_7_context_override_shifts_threshold() {
        let policy = policy_with(
            serde_json::json!({"hate": 0.7}),
            serde_json::json!({"hate": "block"}),
            serde_json::json!({
                "context_overrides": [{
                    "match": {"audience": "youth"},
                    "threshold_adjustments": {"hate": -0.2}
                }]
            }),
        );
        let thresholds = derive_thresholds(
            &policy,
            &serde_json::json!({"audience": "youth"}),
            None,
        );
        assert!((thresholds["hate"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn trust_score_half_leaves_thresholds_unchanged() {
        let policy = policy_with(
            serde_json::json!({"toxicity": 0.8}),
            serde_json::json!({"toxicity": "block"}),
            serde_json::json!({}),
        );
        let thresholds = derive_thresholds(&policy, &serde_json::json!({}), Some(0.5));
        assert!((thresholds["toxicity"] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn trust_score_zero_reduces_threshold_by_tenth_floored() {
        let policy = policy_with(
            serde_json::json!({"toxicity": 0.15}),
            serde_json::json!({"toxicity": "block"}),
            serde_json::json!({}),
        );
        let thresholds = derive_thresholds(&policy, &serde_json::json!({}), Some(0.0));
        // 0.15 - (0.5 * 0.2) = 0.05, floored at 0.1
        assert!((thresholds["toxicity"] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let policy = policy_with(
            serde_json::json!({"toxicity": 0.8}),
            serde_json::json!({"toxicity": "block"}),
            serde_json::json!({}),
        );
        let mut scores = CategoryScores::default();
        scores.toxicity = 0.8;
        let result = evaluate(&policy, &scores, &serde_json::json!({}), None);
        assert_eq!(result.action, Action::Block);
    }
}
