//! Policy API: `GET/POST /policies`, `GET /policies/{id}`,
//! `POST /policies/{id}/evaluate`, `/publish`, `/archive`.

use crate::error::{policy_error, ApiError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use modkit_common::error::AppError;
use modkit_domain::{CategoryScores, PolicyStatus, Role};
use modkit_gate::AuthenticatedUser;
use modkit_policy::PolicyRepo;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

pub async fn list_policies(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter.status.as_deref().and_then(PolicyStatus::parse);
    let policies = PolicyRepo::new(&state.pool).list(status).await.map_err(policy_error)?;
    Ok(Json(policies))
}

#[derive(Debug, Deserialize)]
pub struct CreatePolicyBody {
    pub name: String,
    pub thresholds: Value,
    pub actions: Value,
    #[serde(default)]
    pub scope: Value,
}

pub async fn create_policy(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePolicyBody>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(crate::error::auth_error)?;
    let scope = if body.scope.is_null() { json!({}) } else { body.scope };
    let policy = PolicyRepo::new(&state.pool)
        .create_draft(&body.name, body.thresholds, body.actions, scope, &user.0.email)
        .await
        .map_err(policy_error)?;
    Ok(Json(policy))
}

pub async fn get_policy(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = PolicyRepo::new(&state.pool)
        .get_by_id(id)
        .await
        .map_err(policy_error)?
        .ok_or_else(|| ApiError(AppError::NotFound(format!("policy {id}"))))?;
    Ok(Json(policy))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateBody {
    pub category_scores: CategoryScores,
    #[serde(default)]
    pub context: Value,
    pub trust_score: Option<f64>,
}

/// Dry-run evaluation against a stored policy: no submission, decision, or
/// evidence row is created.
pub async fn evaluate_policy(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<EvaluateBody>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = PolicyRepo::new(&state.pool)
        .get_by_id(id)
        .await
        .map_err(policy_error)?
        .ok_or_else(|| ApiError(AppError::NotFound(format!("policy {id}"))))?;

    let result = modkit_policy::evaluate(&policy, &body.category_scores, &body.context, body.trust_score);
    Ok(Json(json!({
        "action": result.action.as_str(),
        "effective_thresholds": result.effective_thresholds,
        "triggered_rules": result.triggered_rules,
    })))
}

pub async fn publish_policy(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(crate::error::auth_error)?;
    let policy = PolicyRepo::new(&state.pool)
        .publish(id)
        .await
        .map_err(policy_error)?
        .ok_or_else(|| ApiError(AppError::InvalidInput(format!("policy {id} is not a publishable draft"))))?;
    Ok(Json(policy))
}

pub async fn archive_policy(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Admin).map_err(crate::error::auth_error)?;
    let policy = PolicyRepo::new(&state.pool)
        .archive(id)
        .await
        .map_err(policy_error)?
        .ok_or_else(|| ApiError(AppError::InvalidInput(format!("policy {id} is not an archivable published policy"))))?;
    Ok(Json(policy))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use modkit_gate::{CorsPolicy, GateState};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Never actually connects; these tests only exercise the auth
    /// extractor, which refuses before the pool is touched.
    fn make_test_state() -> crate::state::AppState {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/modkit_test").unwrap();
        crate::state::AppState {
            gate: GateState::new(pool.clone(), CorsPolicy::new(vec![]), None),
            coordinator: std::sync::Arc::new(modkit_pipeline::Coordinator {
                pool: pool.clone(),
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
            }),
            pool,
            rate_limit_rpm: modkit_gate::DEFAULT_RATE_LIMIT_RPM,
        }
    }

    #[tokio::test]
    async fn unauthenticated_create_policy_is_rejected() {
        let router = crate::routes::build(make_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/policies")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"x","thresholds":{},"actions":{}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthenticated_publish_is_rejected() {
        let router = crate::routes::build(make_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/policies/{}/publish", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
