//! CalibrationData. Review outcomes feed the
//! classifier's runtime-mutable per-provider per-category offset/scale.

use crate::action::Action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Agree,
    Disagree,
    Uncertain,
}

impl ReviewOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewOutcome::Agree => "agree",
            ReviewOutcome::Disagree => "disagree",
            ReviewOutcome::Uncertain => "uncertain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agree" => Some(ReviewOutcome::Agree),
            "disagree" => Some(ReviewOutcome::Disagree),
            "uncertain" => Some(ReviewOutcome::Uncertain),
            _ => None,
        }
    }
}

modkit_common::sqlx_text_enum!(ReviewOutcome);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalibrationData {
    pub id: Uuid,
    pub provider_name: String,
    pub decision_id: Uuid,
    /// Stored as JSON: a serialized `CategoryScores`.
    pub category_scores: serde_json::Value,
    pub automated_action: Action,
    pub review_outcome: ReviewOutcome,
    pub created_at: DateTime<Utc>,
}
