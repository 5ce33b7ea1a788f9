//! modkit_trust
//!
//! Trust scorer: a 30-day rolling window of daily buckets
//! per user, summed and run through `modkit_domain::trust::trust_score`.

use chrono::Utc;
use modkit_domain::Action;
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrustError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct TrustScorer<'a> {
    pool: &'a PgPool,
}

impl<'a> TrustScorer<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// `trust = clamp01(allowed/total - 0.1*blocked - 0.05*escalated)`,
    /// default `0.5` with no history, summed over the trailing
    /// 30 days of daily buckets.
    pub async fn trust_score(&self, user_id: &str) -> Result<f64, TrustError> {
        let row: Option<(i64, i64, i64, i64)> = sqlx::query_as(
            "SELECT COALESCE(SUM(total_decisions), 0), COALESCE(SUM(allowed), 0), \
                    COALESCE(SUM(blocked), 0), COALESCE(SUM(escalated), 0) \
             FROM user_behavior_stats \
             WHERE user_id = $1 AND window_start >= (CURRENT_DATE - INTERVAL '30 days')",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        let (total, allowed, blocked, escalated) = row.unwrap_or((0, 0, 0, 0));
        Ok(modkit_domain::trust::trust_score(total, allowed, blocked, escalated))
    }

    /// Upserts today's bucket for `user_id`, incrementing the counter for
    /// `action`.
    pub async fn record_outcome(&self, user_id: &str, action: Action) -> Result<(), TrustError> {
        let today = Utc::now().date_naive();
        let (allowed, blocked, escalated, warned) = match action {
            Action::Allow => (1, 0, 0, 0),
            Action::Block => (0, 1, 0, 0),
            Action::Escalate => (0, 0, 1, 0),
            Action::Warn => (0, 0, 0, 1),
        };

        sqlx::query(
            "INSERT INTO user_behavior_stats \
                 (user_id, window_start, total_decisions, allowed, blocked, escalated, warned, updated_at) \
             VALUES ($1, $2, 1, $3, $4, $5, $6, now()) \
             ON CONFLICT (user_id, window_start) DO UPDATE SET \
                 total_decisions = user_behavior_stats.total_decisions + 1, \
                 allowed = user_behavior_stats.allowed + EXCLUDED.allowed, \
                 blocked = user_behavior_stats.blocked + EXCLUDED.blocked, \
                 escalated = user_behavior_stats.escalated + EXCLUDED.escalated, \
                 warned = user_behavior_stats.warned + EXCLUDED.warned, \
                 updated_at = now()",
        )
        .bind(user_id)
        .bind(today)
        .bind(allowed)
        .bind(blocked)
        .bind(escalated)
        .bind(warned)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
