//! modkit_evidence
//!
//! Evidence writer: transactional decision + evidence
//! writes, with a per-partition tamper-evident hash chain.
//!
//! The chain's
//! `previous_hash` read is guarded by `pg_advisory_xact_lock` on the
//! target partition name rather than an unlocked `MAX(created_at)` read,
//! so two concurrent inserts into the same monthly partition can never
//! observe (and chain from) the same predecessor.

use chrono::{DateTime, Utc};
use modkit_domain::evidence::EvidenceChainInput;
use modkit_domain::{Action, CategoryScores, ControlTag, Decision, EvidenceRecord};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Canon(#[from] modkit_common::CanonError),
}

/// The fields needed to append one evidence row; everything not strictly
/// required by the control tag is left `None`.
#[derive(Debug, Clone, Default)]
pub struct EvidenceSpec {
    pub control_id: ControlTag,
    pub policy_id: Option<Uuid>,
    pub policy_version: Option<i32>,
    pub decision_id: Option<Uuid>,
    pub review_id: Option<Uuid>,
    pub model_name: Option<String>,
    pub model_version: Option<String>,
    pub category_scores: Option<CategoryScores>,
    pub automated_action: Option<Action>,
    pub human_override: Option<bool>,
    pub submission_hash: Option<String>,
}

/// Atomically inserts `decision` and one evidence row per `specs` entry
///: begins a transaction, inserts the decision,
/// appends each evidence row in order, commits. If any step fails, nothing
/// is persisted.
pub async fn write_decision_with_evidence(
    pool: &PgPool,
    decision: &Decision,
    specs: Vec<EvidenceSpec>,
) -> Result<Vec<EvidenceRecord>, EvidenceError> {
    let mut tx = pool.begin().await?;

    modkit_db::ensure_monthly_partition(pool, "decisions", decision.created_at).await?;
    insert_decision(&mut tx, decision).await?;

    let mut records = Vec::with_capacity(specs.len());
    for spec in specs {
        modkit_db::ensure_monthly_partition(pool, "evidence_records", decision.created_at).await?;
        let record = append_evidence_row(&mut tx, spec, decision.created_at).await?;
        records.push(record);
    }

    tx.commit().await?;
    Ok(records)
}

async fn insert_decision(tx: &mut Transaction<'_, Postgres>, d: &Decision) -> Result<(), EvidenceError> {
    sqlx::query(
        "INSERT INTO decisions \
            (id, submission_id, model_name, model_version, category_scores, policy_id, \
             policy_version, automated_action, confidence, explanation, correlation_id, \
             created_at, retention_expires_at) \
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
    )
    .bind(d.id)
    .bind(d.submission_id)
    .bind(&d.model_name)
    .bind(&d.model_version)
    .bind(&d.category_scores)
    .bind(d.policy_id)
    .bind(d.policy_version)
    .bind(d.automated_action)
    .bind(d.confidence)
    .bind(&d.explanation)
    .bind(&d.correlation_id)
    .bind(d.created_at)
    .bind(d.retention_expires_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Appends a single evidence row within an existing transaction, taking
/// `previous_hash` under an advisory lock on the target partition. Exposed
/// so the review subsystem (`GOV-002`) and retention purger (`SEC-003`) can
/// append evidence outside the decision-write path.
pub async fn append_evidence_row(
    tx: &mut Transaction<'_, Postgres>,
    spec: EvidenceSpec,
    created_at: DateTime<Utc>,
) -> Result<EvidenceRecord, EvidenceError> {
    let partition = modkit_db::partition_suffix(created_at);
    let lock_key = format!("evidence_records_y{partition}");
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&lock_key)
        .execute(&mut **tx)
        .await?;

    let partition_start = format!("{}-01", &partition.replace('_', "-"));
    let previous_hash: Option<String> = sqlx::query_scalar(
        "SELECT chain_hash FROM evidence_records \
         WHERE created_at >= $1::date AND created_at < ($1::date + INTERVAL '1 month') \
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(&partition_start)
    .fetch_optional(&mut **tx)
    .await?;

    let scores_value = spec
        .category_scores
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(modkit_common::CanonError::from)?;

    let chain_input = EvidenceChainInput {
        control_id: spec.control_id.as_str(),
        policy_id: spec.policy_id,
        policy_version: spec.policy_version,
        decision_id: spec.decision_id,
        review_id: spec.review_id,
        model_name: spec.model_name.as_deref(),
        model_version: spec.model_version.as_deref(),
        category_scores: spec.category_scores.as_ref(),
        automated_action: spec.automated_action,
        human_override: spec.human_override,
        submission_hash: spec.submission_hash.as_deref(),
        previous_hash: previous_hash.as_deref(),
        created_at,
    };
    let chain_hash = EvidenceRecord::compute_chain_hash(previous_hash.as_deref(), &chain_input)?;

    let record: EvidenceRecord = sqlx::query_as(
        "INSERT INTO evidence_records \
            (id, control_id, policy_id, policy_version, decision_id, review_id, model_name, \
             model_version, category_scores, automated_action, human_override, submission_hash, \
             chain_hash, previous_hash, created_at) \
         VALUES (gen_random_uuid(),$1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
         RETURNING *",
    )
    .bind(spec.control_id)
    .bind(spec.policy_id)
    .bind(spec.policy_version)
    .bind(spec.decision_id)
    .bind(spec.review_id)
    .bind(&spec.model_name)
    .bind(&spec.model_version)
    .bind(&scores_value)
    .bind(spec.automated_action)
    .bind(spec.human_override)
    .bind(&spec.submission_hash)
    .bind(&chain_hash)
    .bind(&previous_hash)
    .bind(created_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(record)
}

/// Filters for `GET /evidence`: control tag and/or a
/// `created_at` range. All optional; an empty filter lists everything.
#[derive(Debug, Default)]
pub struct EvidenceFilter {
    pub control_id: Option<ControlTag>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Lists evidence rows newest-first for the compliance/evidence endpoints.
/// Read-only; never touches the hash chain.
pub async fn list_evidence(pool: &PgPool, filter: &EvidenceFilter) -> Result<Vec<EvidenceRecord>, EvidenceError> {
    let rows = sqlx::query_as::<_, EvidenceRecord>(
        "SELECT * FROM evidence_records \
         WHERE ($1::text IS NULL OR control_id = $1) \
           AND ($2::timestamptz IS NULL OR created_at >= $2) \
           AND ($3::timestamptz IS NULL OR created_at <= $3) \
         ORDER BY created_at DESC",
    )
    .bind(filter.control_id.map(|c| c.as_str()))
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_spec_default_tag_is_mod_001() {
        let spec = EvidenceSpec::default();
        assert_eq!(spec.control_id.as_str(), "MOD-001");
    }
}
