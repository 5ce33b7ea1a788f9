//! Submission. Immutable after insert; plaintext is never
//! required for the pipeline and is never stored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    /// SHA-256 hex of the normalized text.
    pub content_hash: String,
    pub source: Option<String>,
    /// Serialized JSON object, at most 10 keys / 1 KiB (enforced by the
    /// pipeline coordinator at the boundary).
    pub context: Value,
    pub created_at: DateTime<Utc>,
    pub retention_expires_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new(content_hash: String, source: Option<String>, context: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content_hash,
            source,
            context,
            created_at: now,
            retention_expires_at: Some(now + chrono::Duration::days(90)),
        }
    }

    pub fn context_as_map(&self) -> Option<&serde_json::Map<String, Value>> {
        self.context.as_object()
    }

    pub fn user_id(&self) -> Option<String> {
        self.context_as_map()
            .and_then(|m| m.get("user_id"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retention_is_ninety_days() {
        let s = Submission::new("abc".into(), None, serde_json::json!({}));
        let delta = s.retention_expires_at.unwrap() - s.created_at;
        assert_eq!(delta.num_days(), 90);
    }

    #[test]
    fn user_id_extracted_from_context() {
        let s = Submission::new(
            "abc".into(),
            None,
            serde_json::json!({"user_id": "u1", "audience": "youth"}),
        );
        assert_eq!(s.user_id(), Some("u1".to_string()));
    }
}
