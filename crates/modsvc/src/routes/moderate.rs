//! `POST /moderate`, `POST /moderate/batch`, `GET /health`.

use crate::error::{batch_error, pipeline_error, ApiError};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use modkit_gate::AuthenticatedUser;
use modkit_pipeline::ModerationRequest;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ModerateRequestBody {
    pub content: String,
    pub context_metadata: Option<Value>,
    pub source: Option<String>,
    pub policy_id: Option<Uuid>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModerateResponseBody {
    pub decision_id: Uuid,
    pub submission_id: Uuid,
    pub action: &'static str,
    pub category_scores: modkit_domain::CategoryScores,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub policy_applied: Option<String>,
    pub policy_version: Option<i32>,
    pub requires_review: bool,
    pub detected_language: String,
}

impl From<modkit_pipeline::ModerationResult> for ModerateResponseBody {
    fn from(r: modkit_pipeline::ModerationResult) -> Self {
        Self {
            decision_id: r.decision_id,
            submission_id: r.submission_id,
            action: r.action.as_str(),
            category_scores: r.category_scores,
            confidence: r.confidence,
            explanation: r.explanation,
            policy_applied: r.policy_applied,
            policy_version: r.policy_version,
            requires_review: r.requires_review,
            detected_language: r.detected_language,
        }
    }
}

pub async fn moderate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ModerateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    enforce_rate_limit(&state, &user)?;

    let request = ModerationRequest {
        content: body.content,
        context_metadata: body.context_metadata,
        source: body.source,
        policy_id: body.policy_id,
        correlation_id: body.correlation_id,
    };
    let result = state.coordinator.moderate(request).await.map_err(pipeline_error)?;
    Ok(Json(ModerateResponseBody::from(result)))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequestBody {
    pub items: Vec<ModerateRequestBody>,
}

pub async fn moderate_batch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<BatchRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    enforce_rate_limit(&state, &user)?;

    let requests: Vec<ModerationRequest> = body
        .items
        .into_iter()
        .map(|item| ModerationRequest {
            content: item.content,
            context_metadata: item.context_metadata,
            source: item.source,
            policy_id: item.policy_id,
            correlation_id: item.correlation_id,
        })
        .collect();

    let (results, summary) =
        modkit_pipeline::moderate_batch(state.coordinator.clone(), requests, modkit_pipeline::DEFAULT_CONCURRENCY)
            .await
            .map_err(batch_error)?;

    let results: Vec<Value> = results
        .into_iter()
        .map(|item| match item.result {
            Some(result) => serde_json::to_value(ModerateResponseBody::from(result)).unwrap_or(Value::Null),
            None => json!({ "error": item.error }),
        })
        .collect();

    Ok(Json(json!({
        "results": results,
        "summary": {
            "total": summary.total,
            "allowed": summary.allowed,
            "warned": summary.warned,
            "blocked": summary.blocked,
            "escalated": summary.escalated,
            "failed": summary.failed,
        }
    })))
}

/// Unauthenticated liveness check: a bare 200, no DB round trip —
/// a degraded DB should surface through request failures, not here.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn enforce_rate_limit(state: &AppState, user: &AuthenticatedUser) -> Result<(), ApiError> {
    let rpm = if user.0.rate_limit_rpm > 0 { user.0.rate_limit_rpm as u32 } else { state.rate_limit_rpm };
    modkit_gate::enforce_rate_limit(&state.gate, &user.0.id.to_string(), rpm)
        .map_err(|retry_after_secs| ApiError(modkit_common::error::AppError::RateLimited { retry_after_secs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_domain::{Role, User};
    use modkit_gate::{CorsPolicy, GateState};
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn test_user(rate_limit_rpm: i32) -> AuthenticatedUser {
        let now = chrono::Utc::now();
        AuthenticatedUser(User {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            role: Role::Moderator,
            api_key_hash: "hash".into(),
            api_key_prefix: "sk_live_".into(),
            api_key_name: None,
            rate_limit_rpm,
            api_key_last_used_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn test_state() -> AppState {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/modkit_test").unwrap();
        AppState {
            gate: GateState::new(pool.clone(), CorsPolicy::new(vec![]), None),
            coordinator: unreachable_coordinator(),
            pool,
            rate_limit_rpm: 2,
        }
    }

    /// Not actually called in these tests — only `AppState.gate` and
    /// `.rate_limit_rpm` are exercised by `enforce_rate_limit`.
    fn unreachable_coordinator() -> std::sync::Arc<modkit_pipeline::Coordinator> {
        std::sync::Arc::new(modkit_pipeline::Coordinator {
            pool: PgPoolOptions::new().connect_lazy("postgres://localhost/modkit_test").unwrap(),
            adapters: Vec::new(),
            mode: modkit_pipeline::ClassificationMode::Fallback,
            ensemble_config: Default::default(),
            calibration: Default::default(),
            llm: None,
            llm_config: Default::default(),
            cache: modkit_cache::ClassificationCache::new("redis://127.0.0.1:6379").unwrap(),
            dispatcher: modkit_webhook::Dispatcher::new(),
            subscriptions: modkit_webhook::SubscriptionCache::new(),
            max_content_length: 10_000,
        })
    }

    #[test]
    fn per_user_rpm_overrides_global_default_when_set() {
        let state = test_state();
        let user = test_user(1);
        assert!(enforce_rate_limit(&state, &user).is_ok());
        assert!(enforce_rate_limit(&state, &user).is_err());
    }

    #[test]
    fn zero_rpm_falls_back_to_global_default() {
        let state = test_state();
        let user = test_user(0);
        assert!(enforce_rate_limit(&state, &user).is_ok());
        assert!(enforce_rate_limit(&state, &user).is_ok());
        assert!(enforce_rate_limit(&state, &user).is_err());
    }
}
