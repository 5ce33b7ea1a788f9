//! Policy. Versioned, threshold-based, with context-aware
//! overrides. Policies are immutable once published; edits always produce a
//! new version.

use crate::action::Action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyStatus {
    Draft,
    Published,
    Archived,
}

impl PolicyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Draft => "draft",
            PolicyStatus::Published => "published",
            PolicyStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PolicyStatus::Draft),
            "published" => Some(PolicyStatus::Published),
            "archived" => Some(PolicyStatus::Archived),
            _ => None,
        }
    }
}

// Stored as plain TEXT, not a native Postgres enum type, via the shared
// text-enum bridge so the schema stays a single `CREATE TABLE`.
modkit_common::sqlx_text_enum!(PolicyStatus);

/// One `scope.context_overrides` rule: if every key in `match_` is present
/// in the submission's context with an equal value, apply
/// `threshold_adjustments` to the corresponding category thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextOverrideRule {
    #[serde(rename = "match")]
    pub match_: BTreeMap<String, Value>,
    pub threshold_adjustments: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyScope {
    #[serde(default)]
    pub context_overrides: Vec<ContextOverrideRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub version: i32,
    /// Stored as JSON: category -> threshold in [0, 1].
    pub thresholds: Value,
    /// Stored as JSON: category -> action string.
    pub actions: Value,
    /// Stored as JSON: `PolicyScope`.
    pub scope: Value,
    pub status: PolicyStatus,
    pub effective_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn thresholds_map(&self) -> BTreeMap<String, f64> {
        serde_json::from_value(self.thresholds.clone()).unwrap_or_default()
    }

    pub fn actions_map(&self) -> BTreeMap<String, Action> {
        let raw: BTreeMap<String, String> =
            serde_json::from_value(self.actions.clone()).unwrap_or_default();
        raw.into_iter()
            .filter_map(|(k, v)| Action::parse(&v).map(|a| (k, a)))
            .collect()
    }

    pub fn scope_parsed(&self) -> PolicyScope {
        serde_json::from_value(self.scope.clone()).unwrap_or_default()
    }

    /// A synthetic, unpersisted policy used when no published policy exists
    /// for the caller to fall back to. All content is scored
    /// `allow` so the evaluator still has something deterministic to run.
    pub fn synthetic_allow_all(name: &str) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.to_string(),
            version: 0,
            thresholds: serde_json::json!({}),
            actions: serde_json::json!({}),
            scope: serde_json::json!({}),
            status: PolicyStatus::Published,
            effective_date: Some(Utc::now()),
            created_by: "system".into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.id.is_nil()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_policy_is_flagged() {
        let p = Policy::synthetic_allow_all("default");
        assert!(p.is_synthetic());
        assert_eq!(p.status, PolicyStatus::Published);
    }

    #[test]
    fn thresholds_map_parses_stored_json() {
        let mut p = Policy::synthetic_allow_all("default");
        p.thresholds = serde_json::json!({"toxicity": 0.8, "hate": 0.7});
        let map = p.thresholds_map();
        assert_eq!(map.get("toxicity"), Some(&0.8));
    }

    #[test]
    fn actions_map_drops_unparseable_values() {
        let mut p = Policy::synthetic_allow_all("default");
        p.actions = serde_json::json!({"toxicity": "block", "hate": "nonsense"});
        let map = p.actions_map();
        assert_eq!(map.get("toxicity"), Some(&Action::Block));
        assert_eq!(map.get("hate"), None);
    }
}
