//! ReviewAction. Multiple actions may exist per decision;
//! the latest takes precedence, and closes the decision's state machine.

use crate::calibration::ReviewOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewActionKind {
    Approve,
    Reject,
    Edit,
    Escalate,
}

impl ReviewActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewActionKind::Approve => "approve",
            ReviewActionKind::Reject => "reject",
            ReviewActionKind::Edit => "edit",
            ReviewActionKind::Escalate => "escalate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(ReviewActionKind::Approve),
            "reject" => Some(ReviewActionKind::Reject),
            "edit" => Some(ReviewActionKind::Edit),
            "escalate" => Some(ReviewActionKind::Escalate),
            _ => None,
        }
    }

    /// Calibration feedback mapping: `{approve, edit} -> agree`,
    /// `reject -> disagree`, `escalate -> uncertain`.
    pub fn calibration_outcome(self) -> ReviewOutcome {
        match self {
            ReviewActionKind::Approve | ReviewActionKind::Edit => ReviewOutcome::Agree,
            ReviewActionKind::Reject => ReviewOutcome::Disagree,
            ReviewActionKind::Escalate => ReviewOutcome::Uncertain,
        }
    }

    /// Whether this action closes the decision's review: every
    /// kind except a further `escalate` does.
    pub fn closes_review(self) -> bool {
        !matches!(self, ReviewActionKind::Escalate)
    }
}

modkit_common::sqlx_text_enum!(ReviewActionKind);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewAction {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub reviewer_id: Uuid,
    pub action: ReviewActionKind,
    pub rationale: Option<String>,
    pub edited_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewAction {
    pub fn new(
        decision_id: Uuid,
        reviewer_id: Uuid,
        action: ReviewActionKind,
        rationale: Option<String>,
        edited_content: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            decision_id,
            reviewer_id,
            action,
            rationale,
            edited_content,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_action_maps_to_calibration_outcome() {
        assert_eq!(
            ReviewActionKind::Approve.calibration_outcome(),
            ReviewOutcome::Agree
        );
        assert_eq!(
            ReviewActionKind::Edit.calibration_outcome(),
            ReviewOutcome::Agree
        );
        assert_eq!(
            ReviewActionKind::Reject.calibration_outcome(),
            ReviewOutcome::Disagree
        );
        assert_eq!(
            ReviewActionKind::Escalate.calibration_outcome(),
            ReviewOutcome::Uncertain
        );
    }

    #[test]
    fn only_escalate_keeps_review_open() {
        assert!(ReviewActionKind::Approve.closes_review());
        assert!(ReviewActionKind::Reject.closes_review());
        assert!(ReviewActionKind::Edit.closes_review());
        assert!(!ReviewActionKind::Escalate.closes_review());
    }
}
