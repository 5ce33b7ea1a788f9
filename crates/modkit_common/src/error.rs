//! Shared error taxonomy. Every crate's own error enum converts
//! into `AppError` at its boundary so the HTTP layer has one place that maps
//! errors to status codes without re-deriving the policy per handler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("dependency transient failure: {0}")]
    DependencyTransient(String),
    #[error("dependency permanent failure: {0}")]
    DependencyPermanent(String),
    #[error("storage integrity violation: {0}")]
    StorageIntegrity(String),
    #[error("policy not applicable: {0}")]
    PolicyNotApplicable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code this error kind maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden => 403,
            AppError::RateLimited { .. } => 429,
            AppError::NotFound(_) => 404,
            AppError::DependencyTransient(_) => 503,
            AppError::DependencyPermanent(_) => 502,
            AppError::StorageIntegrity(_) => 500,
            AppError::PolicyNotApplicable(_) => 500,
            AppError::Internal(_) => 500,
        }
    }

    /// Message suitable for a production HTTP response (detail suppressed
    /// for internal-ish kinds).
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Unauthorized => "unauthorized".into(),
            AppError::Forbidden => "forbidden".into(),
            AppError::RateLimited { .. } => "rate limited".into(),
            AppError::NotFound(what) => format!("not found: {what}"),
            AppError::DependencyTransient(_) => "a dependency is temporarily unavailable".into(),
            AppError::DependencyPermanent(_) => "a dependency rejected the request".into(),
            AppError::StorageIntegrity(_) => "internal error".into(),
            AppError::PolicyNotApplicable(_) => "internal error".into(),
            AppError::Internal(_) => "internal error".into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(format!("db error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_for_each_error_kind() {
        assert_eq!(AppError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::Forbidden.status_code(), 403);
        assert_eq!(
            AppError::RateLimited { retry_after_secs: 60 }.status_code(),
            429
        );
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::DependencyTransient("x".into()).status_code(), 503);
        assert_eq!(AppError::StorageIntegrity("x".into()).status_code(), 500);
    }

    #[test]
    fn production_message_suppresses_detail() {
        let e = AppError::StorageIntegrity("chain hash mismatch at row 42".into());
        assert_eq!(e.public_message(), "internal error");
    }
}
