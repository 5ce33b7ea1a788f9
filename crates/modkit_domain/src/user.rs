//! User accounts for the review/policy-authoring surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "moderator" => Some(Role::Moderator),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Viewers may read but never submit a review action or author policy
    /// changes.
    pub fn can_act_on_reviews(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn can_author_policy(self) -> bool {
        matches!(self, Role::Admin)
    }
}

modkit_common::sqlx_text_enum!(Role);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// SHA-256 hex of the plaintext API key; never the
    /// plaintext itself.
    pub api_key_hash: String,
    /// First few characters of the plaintext key, retained for display in
    /// key-management UIs.
    pub api_key_prefix: String,
    pub api_key_name: Option<String>,
    pub rate_limit_rpm: i32,
    pub api_key_last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_can_author_policy() {
        assert!(Role::Admin.can_author_policy());
        assert!(!Role::Moderator.can_author_policy());
        assert!(!Role::Viewer.can_author_policy());
    }

    #[test]
    fn viewer_cannot_act_on_reviews() {
        assert!(!Role::Viewer.can_act_on_reviews());
        assert!(Role::Moderator.can_act_on_reviews());
    }

    #[test]
    fn parse_round_trips_as_str() {
        for r in [Role::Admin, Role::Moderator, Role::Viewer] {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
    }
}
