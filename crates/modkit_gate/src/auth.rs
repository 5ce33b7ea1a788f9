//! API key authentication and role authorization.

use modkit_domain::{Role, User};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("missing or unknown API key")]
    Unauthenticated,
    #[error("role {actual:?} does not meet minimum {required:?}")]
    InsufficientRole { actual: Role, required: Role },
    #[error("internal service token not configured")]
    InternalAuthNotConfigured,
    #[error("internal service token mismatch")]
    InternalAuthRejected,
}

pub fn hash_api_key(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}

/// Resolves the `X-API-Key` header to a `User`, 401 on miss.
/// Updates `api_key_last_used_at` best-effort: a failure to record last-use
/// never turns a valid credential into a rejection.
pub async fn authenticate(pool: &PgPool, plaintext_key: &str) -> Result<User, AuthError> {
    let hash = hash_api_key(plaintext_key);
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_key_hash = $1")
        .bind(&hash)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    if let Err(err) = sqlx::query("UPDATE users SET api_key_last_used_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
    {
        tracing::warn!(user_id = %user.id, error = %err, "failed to record api key last-used timestamp");
    }

    Ok(user)
}

/// Minimum-role check: the caller's role must rank at or above
/// `required` on the `viewer < moderator < admin` ladder.
pub fn authorize(actual: Role, required: Role) -> Result<(), AuthError> {
    if role_rank(actual) >= role_rank(required) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole { actual, required })
    }
}

fn role_rank(role: Role) -> u8 {
    match role {
        Role::Viewer => 0,
        Role::Moderator => 1,
        Role::Admin => 2,
    }
}

/// Back-end-to-back-end calls require a shared bearer token.
/// Missing configuration must refuse all such calls rather than silently
/// allow them.
pub fn verify_internal_bearer(configured: Option<&str>, presented: Option<&str>) -> Result<(), AuthError> {
    let configured = configured.ok_or(AuthError::InternalAuthNotConfigured)?;
    match presented {
        Some(token) if constant_time_eq(configured.as_bytes(), token.as_bytes()) => Ok(()),
        _ => Err(AuthError::InternalAuthRejected),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_authorization_respects_ladder() {
        assert!(authorize(Role::Admin, Role::Moderator).is_ok());
        assert!(authorize(Role::Moderator, Role::Moderator).is_ok());
        assert!(authorize(Role::Viewer, Role::Moderator).is_err());
    }

    #[test]
    fn internal_auth_rejects_when_unconfigured() {
        assert!(matches!(
            verify_internal_bearer(None, Some("t")),
            Err(AuthError::InternalAuthNotConfigured)
        ));
    }

    #[test]
    fn internal_auth_rejects_mismatch() {
        assert!(verify_internal_bearer(Some("secret"), Some("wrong")).is_err());
        assert!(verify_internal_bearer(Some("secret"), Some("secret")).is_ok());
        assert!(verify_internal_bearer(Some("secret"), None).is_err());
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_api_key("abc"), hash_api_key("abc"));
        assert_ne!(hash_api_key("abc"), hash_api_key("abd"));
    }
}
