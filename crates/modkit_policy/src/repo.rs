//! Policy store. `sqlx::query_as`
//! against the `policies` table; no compile-time `query!` macro since no
//! live database is available while writing this crate.

use chrono::Utc;
use modkit_domain::{Policy, PolicyStatus};
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PolicyRepoError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct PolicyRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PolicyRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Policy>, PolicyRepoError> {
        let policy = sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(policy)
    }

    /// Selection fallback: if `policy_id` is absent, not found,
    /// or not `published`, fall back to the most recent published policy
    /// (by any name, most recently created).
    pub async fn select_for_evaluation(
        &self,
        policy_id: Option<Uuid>,
    ) -> Result<Option<Policy>, PolicyRepoError> {
        if let Some(id) = policy_id {
            if let Some(policy) = self.get_by_id(id).await? {
                if policy.status == PolicyStatus::Published {
                    return Ok(Some(policy));
                }
            }
        }

        let fallback = sqlx::query_as::<_, Policy>(
            "SELECT * FROM policies WHERE status = 'published' ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;
        Ok(fallback)
    }

    pub async fn list(&self, status: Option<PolicyStatus>) -> Result<Vec<Policy>, PolicyRepoError> {
        let policies = match status {
            Some(s) => {
                sqlx::query_as::<_, Policy>(
                    "SELECT * FROM policies WHERE status = $1 ORDER BY name, version",
                )
                .bind(s)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Policy>("SELECT * FROM policies ORDER BY name, version")
                    .fetch_all(self.pool)
                    .await?
            }
        };
        Ok(policies)
    }

    /// Creates a new draft version of `name`: `version = max(version) + 1`,
    /// starting at 1 for a brand new name. Prior versions are
    /// never updated in place.
    pub async fn create_draft(
        &self,
        name: &str,
        thresholds: Value,
        actions: Value,
        scope: Value,
        created_by: &str,
    ) -> Result<Policy, PolicyRepoError> {
        let next_version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM policies WHERE name = $1",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;

        let policy = sqlx::query_as::<_, Policy>(
            "INSERT INTO policies (name, version, thresholds, actions, scope, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(name)
        .bind(next_version)
        .bind(thresholds)
        .bind(actions)
        .bind(scope)
        .bind(PolicyStatus::Draft)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;

        Ok(policy)
    }

    pub async fn publish(&self, id: Uuid) -> Result<Option<Policy>, PolicyRepoError> {
        let policy = sqlx::query_as::<_, Policy>(
            "UPDATE policies SET status = $1, effective_date = $2 \
             WHERE id = $3 AND status = 'draft' RETURNING *",
        )
        .bind(PolicyStatus::Published)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(policy)
    }

    pub async fn archive(&self, id: Uuid) -> Result<Option<Policy>, PolicyRepoError> {
        let policy = sqlx::query_as::<_, Policy>(
            "UPDATE policies SET status = $1 WHERE id = $2 AND status = 'published' RETURNING *",
        )
        .bind(PolicyStatus::Archived)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(policy)
    }
}
