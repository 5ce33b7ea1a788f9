//! HTTP error mapping: every crate's own error type is mapped into
//! `modkit_common::AppError` at this boundary, since the orphan rule forbids
//! `impl From<TheirError> for AppError` inside this binary crate — these are
//! free functions instead of trait impls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use modkit_common::error::AppError;
use serde_json::json;

/// Wraps `AppError` so this crate can implement `IntoResponse` for it
/// (`AppError` itself lives in `modkit_common` and has no axum dependency).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "error": self.0.public_message() }));
        if let AppError::RateLimited { retry_after_secs } = &self.0 {
            return (status, [("Retry-After", retry_after_secs.to_string())], body).into_response();
        }
        if !matches!(self.0, AppError::Internal(_) | AppError::StorageIntegrity(_) | AppError::PolicyNotApplicable(_)) {
            tracing::debug!(error = %self.0, "request rejected");
        } else {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, body).into_response()
    }
}

pub fn pipeline_error(e: modkit_pipeline::PipelineError) -> ApiError {
    use modkit_pipeline::PipelineError;
    match e {
        PipelineError::Validation(v) => ApiError(AppError::InvalidInput(v.to_string())),
        PipelineError::Classifier(c) => ApiError(AppError::DependencyTransient(c.to_string())),
        PipelineError::Db(db) => ApiError(AppError::from(db)),
        PipelineError::Evidence(ev) => ApiError(AppError::StorageIntegrity(ev.to_string())),
        PipelineError::PolicyRepo(modkit_policy::PolicyRepoError::Db(db)) => ApiError(AppError::from(db)),
        PipelineError::Trust(modkit_trust::TrustError::Db(db)) => ApiError(AppError::from(db)),
    }
}

pub fn batch_error(e: modkit_pipeline::BatchError) -> ApiError {
    ApiError(AppError::InvalidInput(e.to_string()))
}

pub fn auth_error(e: modkit_gate::AuthError) -> ApiError {
    use modkit_gate::AuthError;
    match e {
        AuthError::Db(db) => ApiError(AppError::from(db)),
        AuthError::Unauthenticated => ApiError(AppError::Unauthorized),
        AuthError::InsufficientRole { .. } => ApiError(AppError::Forbidden),
        AuthError::InternalAuthNotConfigured | AuthError::InternalAuthRejected => ApiError(AppError::Unauthorized),
    }
}

pub fn policy_error(e: modkit_policy::PolicyRepoError) -> ApiError {
    let modkit_policy::PolicyRepoError::Db(db) = e;
    ApiError(AppError::from(db))
}

pub fn review_error(e: modkit_review::ReviewError) -> ApiError {
    use modkit_review::ReviewError;
    match e {
        ReviewError::Db(db) => ApiError(AppError::from(db)),
        ReviewError::Evidence(ev) => ApiError(AppError::StorageIntegrity(ev.to_string())),
        ReviewError::DecisionNotFound(id) => ApiError(AppError::NotFound(format!("decision {id}"))),
    }
}

pub fn evidence_error(e: modkit_evidence::EvidenceError) -> ApiError {
    ApiError(AppError::StorageIntegrity(e.to_string()))
}

pub fn retention_error(e: modkit_retention::RetentionError) -> ApiError {
    use modkit_retention::RetentionError;
    match e {
        RetentionError::SubmissionNotFound(hash) => ApiError(AppError::NotFound(format!("submission {hash}"))),
        other => ApiError(AppError::StorageIntegrity(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_gate::AuthError;

    #[test]
    fn rate_limited_response_carries_retry_after_header() {
        let response = ApiError(AppError::RateLimited { retry_after_secs: 60 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let response = ApiError(AppError::InvalidInput("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn insufficient_role_maps_to_403() {
        let response = auth_error(AuthError::InsufficientRole {
            actual: modkit_domain::Role::Viewer,
            required: modkit_domain::Role::Admin,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn unauthenticated_maps_to_401() {
        let response = auth_error(AuthError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
