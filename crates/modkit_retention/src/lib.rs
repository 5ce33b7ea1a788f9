//! modkit_retention
//!
//! Scheduled retention purge and GDPR erasure. Decisions
//! are purged before submissions (FK); evidence is never purged.

use chrono::Utc;
use modkit_domain::evidence::ControlTag;
use modkit_evidence::{append_evidence_row, EvidenceSpec};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Evidence(#[from] modkit_evidence::EvidenceError),
    #[error("submission with content_hash {0:?} not found")]
    SubmissionNotFound(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeReport {
    pub decisions_deleted: u64,
    pub submissions_deleted: u64,
}

/// Deletes expired `Decision` rows, then expired `Submission` rows.
/// Idempotent: a second run against an unchanged database deletes
/// nothing further, since both deletes are scoped to `retention_expires_at
/// < now()`.
pub async fn purge_expired(pool: &PgPool) -> Result<PurgeReport, RetentionError> {
    let decisions = sqlx::query("DELETE FROM decisions WHERE retention_expires_at < now()")
        .execute(pool)
        .await?;
    let submissions = sqlx::query("DELETE FROM submissions WHERE retention_expires_at < now()")
        .execute(pool)
        .await?;
    Ok(PurgeReport {
        decisions_deleted: decisions.rows_affected(),
        submissions_deleted: submissions.rows_affected(),
    })
}

/// GDPR erasure by content hash: overwrites the submission's
/// `content_hash` with a unique `ERASED:<uuid>` marker, nulls `context` and
/// `source`, and records a `SEC-003` evidence row — all in one transaction.
pub async fn erase_by_content_hash(
    pool: &PgPool,
    content_hash: &str,
) -> Result<(), RetentionError> {
    let mut tx = pool.begin().await?;

    let submission_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM submissions WHERE content_hash = $1")
            .bind(content_hash)
            .fetch_optional(&mut *tx)
            .await?;
    let submission_id =
        submission_id.ok_or_else(|| RetentionError::SubmissionNotFound(content_hash.to_string()))?;

    let erased_marker = format!("ERASED:{}", Uuid::new_v4());
    sqlx::query(
        "UPDATE submissions SET content_hash = $1, context = '{}', source = NULL WHERE id = $2",
    )
    .bind(&erased_marker)
    .bind(submission_id)
    .execute(&mut *tx)
    .await?;

    append_evidence_row(
        &mut tx,
        EvidenceSpec {
            control_id: ControlTag::Sec003,
            submission_hash: Some(content_hash.to_string()),
            ..Default::default()
        },
        Utc::now(),
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purge_report_starts_at_zero() {
        let report = PurgeReport::default();
        assert_eq!(report.decisions_deleted, 0);
        assert_eq!(report.submissions_deleted, 0);
    }
}
