//! Decision. Immutable apart from review-assignment and
//! retention fields; the only other writer is the review subsystem setting
//! `assigned_reviewer` / `assigned_at` / `sla_deadline`.

use crate::action::Action;
use crate::scores::CategoryScores;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The state machine driving whether a decision still needs a human
///. Not itself a column: derived from `automated_action` plus
/// whether a closing `ReviewAction` exists, but kept as a type so the
/// pipeline and review subsystem agree on the same states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionState {
    Automated,
    PendingReview,
    Assigned,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Decision {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub model_name: String,
    pub model_version: String,
    /// Stored as JSON: a serialized `CategoryScores`. See `scores()`.
    pub category_scores: serde_json::Value,
    pub policy_id: Option<Uuid>,
    pub policy_version: Option<i32>,
    pub automated_action: Action,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub correlation_id: Option<String>,
    pub assigned_reviewer: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub retention_expires_at: Option<DateTime<Utc>>,
}

impl Decision {
    pub fn new(
        submission_id: Uuid,
        model_name: String,
        model_version: String,
        category_scores: &CategoryScores,
        policy_id: Option<Uuid>,
        policy_version: Option<i32>,
        automated_action: Action,
        confidence: Option<f64>,
        explanation: Option<String>,
        correlation_id: Option<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            submission_id,
            model_name,
            model_version,
            category_scores: serde_json::to_value(category_scores).unwrap_or_default(),
            policy_id,
            policy_version,
            automated_action,
            confidence,
            explanation,
            correlation_id,
            assigned_reviewer: None,
            assigned_at: None,
            sla_deadline: None,
            created_at,
            retention_expires_at: Some(Self::default_retention(created_at)),
        }
    }

    pub fn scores(&self) -> CategoryScores {
        serde_json::from_value(self.category_scores.clone()).unwrap_or_default()
    }

    /// A decision needs a human the moment its automated action escalates
    /// and no reviewer has closed it yet.
    pub fn needs_review(&self) -> bool {
        self.automated_action == Action::Escalate
    }

    pub fn state(&self, has_closing_review: bool) -> DecisionState {
        if !self.needs_review() {
            return DecisionState::Automated;
        }
        if has_closing_review {
            DecisionState::Closed
        } else if self.assigned_reviewer.is_some() {
            DecisionState::Assigned
        } else {
            DecisionState::PendingReview
        }
    }

    pub fn default_retention(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + chrono::Duration::days(365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_decision(action: Action) -> Decision {
        let now = Utc::now();
        Decision {
            id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            model_name: "ensemble".into(),
            model_version: "1".into(),
            category_scores: serde_json::to_value(CategoryScores::default()).unwrap(),
            policy_id: None,
            policy_version: None,
            automated_action: action,
            confidence: None,
            explanation: None,
            correlation_id: None,
            assigned_reviewer: None,
            assigned_at: None,
            sla_deadline: None,
            created_at: now,
            retention_expires_at: Some(Decision::default_retention(now)),
        }
    }

    #[test]
    fn allow_action_never_needs_review() {
        let d = base_decision(Action::Allow);
        assert_eq!(d.state(false), DecisionState::Automated);
    }

    #[test]
    fn escalate_progresses_through_pending_assigned_closed() {
        let mut d = base_decision(Action::Escalate);
        assert_eq!(d.state(false), DecisionState::PendingReview);
        d.assigned_reviewer = Some(Uuid::new_v4());
        assert_eq!(d.state(false), DecisionState::Assigned);
        assert_eq!(d.state(true), DecisionState::Closed);
    }

    #[test]
    fn default_retention_is_365_days() {
        let now = Utc::now();
        let delta = Decision::default_retention(now) - now;
        assert_eq!(delta.num_days(), 365);
    }

    #[test]
    fn scores_round_trip_through_new() {
        let mut scores = CategoryScores::default();
        scores.toxicity = 0.9;
        let d = Decision::new(
            Uuid::new_v4(),
            "ensemble".into(),
            "1".into(),
            &scores,
            None,
            None,
            Action::Block,
            Some(0.9),
            Some("toxicity >= 0.8".into()),
            None,
        );
        assert_eq!(d.scores().toxicity, 0.9);
    }
}
