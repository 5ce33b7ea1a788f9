//! modkit_review
//!
//! Review subsystem: queue, assignment/SLA, human
//! actions, and the calibration feedback they produce.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use modkit_domain::{Decision, ReviewAction, ReviewActionKind};
use modkit_evidence::{append_evidence_row, EvidenceSpec};
use modkit_domain::evidence::ControlTag;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Evidence(#[from] modkit_evidence::EvidenceError),
    #[error("decision {0} not found")]
    DecisionNotFound(Uuid),
}

#[derive(Debug, Default)]
pub struct QueueFilter {
    pub action: Option<String>,
    pub status: Option<String>,
}

pub struct ReviewRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Queue order and SLA breaches are query-derived, not separate state
    ///: this lists escalated decisions, oldest first.
    pub async fn list_queue(&self, filter: &QueueFilter) -> Result<Vec<Decision>, ReviewError> {
        let rows = match &filter.action {
            Some(action) => {
                sqlx::query_as::<_, Decision>(
                    "SELECT * FROM decisions WHERE automated_action = $1 \
                     AND automated_action = 'escalate' ORDER BY created_at ASC",
                )
                .bind(action)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Decision>(
                    "SELECT * FROM decisions WHERE automated_action = 'escalate' \
                     ORDER BY created_at ASC",
                )
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn get_detail(
        &self,
        decision_id: Uuid,
    ) -> Result<Option<(Decision, Vec<ReviewAction>)>, ReviewError> {
        let decision =
            sqlx::query_as::<_, Decision>("SELECT * FROM decisions WHERE id = $1")
                .bind(decision_id)
                .fetch_optional(self.pool)
                .await?;
        let Some(decision) = decision else { return Ok(None) };

        let actions = sqlx::query_as::<_, ReviewAction>(
            "SELECT * FROM review_actions WHERE decision_id = $1 ORDER BY created_at ASC",
        )
        .bind(decision_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some((decision, actions)))
    }

    /// Sets `assigned_reviewer`/`assigned_at`/`sla_deadline` on an escalated
    /// decision.
    pub async fn assign(
        &self,
        decision_id: Uuid,
        reviewer_id: Uuid,
        sla: ChronoDuration,
    ) -> Result<(), ReviewError> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE decisions SET assigned_reviewer = $1, assigned_at = $2, sla_deadline = $3 \
             WHERE id = $4",
        )
        .bind(reviewer_id)
        .bind(now)
        .bind(now + sla)
        .bind(decision_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Submits a human action on a decision: persists the
    /// `ReviewAction`, writes a `GOV-002` evidence row, and records a
    /// calibration data point. All in one transaction.
    pub async fn submit_action(
        &self,
        decision_id: Uuid,
        reviewer_id: Uuid,
        kind: ReviewActionKind,
        rationale: Option<String>,
        edited_content: Option<String>,
    ) -> Result<ReviewAction, ReviewError> {
        let decision =
            sqlx::query_as::<_, Decision>("SELECT * FROM decisions WHERE id = $1")
                .bind(decision_id)
                .fetch_optional(self.pool)
                .await?
                .ok_or(ReviewError::DecisionNotFound(decision_id))?;

        let action = ReviewAction::new(decision_id, reviewer_id, kind, rationale, edited_content);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO review_actions (id, decision_id, reviewer_id, action, rationale, edited_content, created_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7)",
        )
        .bind(action.id)
        .bind(action.decision_id)
        .bind(action.reviewer_id)
        .bind(action.action)
        .bind(&action.rationale)
        .bind(&action.edited_content)
        .bind(action.created_at)
        .execute(&mut *tx)
        .await?;

        let evidence_created_at: DateTime<Utc> = Utc::now();
        append_evidence_row(
            &mut tx,
            EvidenceSpec {
                control_id: ControlTag::Gov002,
                decision_id: Some(decision_id),
                review_id: Some(action.id),
                automated_action: Some(decision.automated_action),
                human_override: Some(kind != ReviewActionKind::Approve),
                ..Default::default()
            },
            evidence_created_at,
        )
        .await?;

        sqlx::query(
            "INSERT INTO calibration_data \
                (id, provider_name, decision_id, category_scores, automated_action, review_outcome, created_at) \
             VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, now())",
        )
        .bind(&decision.model_name)
        .bind(decision_id)
        .bind(&decision.category_scores)
        .bind(decision.automated_action)
        .bind(kind.calibration_outcome())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(action)
    }
}
