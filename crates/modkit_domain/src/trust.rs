//! UserBehaviorStats. One row per `(user_id, window_start)`
//! daily bucket; the trust score is derived from the trailing 30 days of
//! these rows, never stored directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserBehaviorStats {
    pub user_id: String,
    pub window_start: NaiveDate,
    pub total_decisions: i64,
    pub allowed: i64,
    pub blocked: i64,
    pub escalated: i64,
    pub warned: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserBehaviorStats {
    pub fn empty(user_id: String, window_start: NaiveDate) -> Self {
        Self {
            user_id,
            window_start,
            total_decisions: 0,
            allowed: 0,
            blocked: 0,
            escalated: 0,
            warned: 0,
            updated_at: Utc::now(),
        }
    }
}

/// `trust = clamp01(allowed/total - 0.1*blocked - 0.05*escalated)`, default
/// `0.5` with no history. Operates over the already-summed
/// 30-day window; summing the daily buckets is the repository's job.
pub fn trust_score(total: i64, allowed: i64, blocked: i64, escalated: i64) -> f64 {
    if total == 0 {
        return 0.5;
    }
    let total = total as f64;
    let raw = allowed as f64 / total - 0.1 * blocked as f64 - 0.05 * escalated as f64;
    modkit_common::clamp01(raw)
}
