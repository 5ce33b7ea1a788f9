//! Review API: `GET /reviews`, `GET /reviews/{id}`,
//! `POST /reviews/{id}/action`.

use crate::error::{review_error, ApiError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use modkit_common::error::AppError;
use modkit_domain::{EventType, ReviewActionKind, Role};
use modkit_gate::AuthenticatedUser;
use modkit_review::{QueueFilter, ReviewRepo};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<String>,
    pub action: Option<String>,
    /// Accepted for API compatibility; the queue is always ordered
    /// oldest-first, so any other value is ignored.
    #[allow(dead_code)]
    pub sort: Option<String>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ReviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = QueueFilter { action: query.action, status: query.status };
    let decisions = ReviewRepo::new(&state.pool).list_queue(&filter).await.map_err(review_error)?;
    Ok(Json(decisions))
}

pub async fn get_review(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (decision, actions) = ReviewRepo::new(&state.pool)
        .get_detail(id)
        .await
        .map_err(review_error)?
        .ok_or_else(|| ApiError(AppError::NotFound(format!("decision {id}"))))?;
    Ok(Json(json!({ "decision": decision, "actions": actions })))
}

#[derive(Debug, Deserialize)]
pub struct SubmitActionBody {
    pub action: String,
    pub rationale: Option<String>,
    pub edited_content: Option<String>,
}

/// Submits a human action and, on success, dispatches `review.completed`
/// — `ReviewRepo::submit_action` only owns the
/// transactional persistence, not the webhook fan-out.
pub async fn submit_review_action(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitActionBody>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Moderator).map_err(crate::error::auth_error)?;

    let kind = ReviewActionKind::parse(&body.action)
        .ok_or_else(|| ApiError(AppError::InvalidInput(format!("unknown review action: {}", body.action))))?;

    let action = ReviewRepo::new(&state.pool)
        .submit_action(id, user.0.id, kind, body.rationale, body.edited_content)
        .await
        .map_err(review_error)?;

    let payload = json!({ "decision_id": id, "review_id": action.id, "action": kind.as_str() });
    let coordinator = state.coordinator.clone();
    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(err) =
            coordinator.dispatcher.dispatch(&pool, &coordinator.subscriptions, EventType::ReviewCompleted, payload).await
        {
            tracing::warn!(error = %err, "review.completed webhook dispatch failed");
        }
    });

    Ok(Json(action))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use modkit_gate::{CorsPolicy, GateState};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

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
    async fn unauthenticated_submit_review_action_is_rejected() {
        let router = crate::routes::build(make_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/reviews/{}/action", uuid::Uuid::new_v4()))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"action":"uphold"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unauthenticated_list_reviews_is_rejected() {
        let router = crate::routes::build(make_test_state());
        let response = router
            .oneshot(Request::builder().uri("/reviews").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
