//! Router assembly: one `axum::Router<AppState>` per resource
//! group, composed in `build`.

mod cors;
mod evidence;
mod moderate;
mod policies;
mod reviews;

use crate::state::AppState;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

pub fn build(state: AppState) -> Router {
    let moderation = Router::new()
        .route("/moderate", post(moderate::moderate))
        .route("/moderate/batch", post(moderate::moderate_batch));

    let policy = Router::new()
        .route("/policies", get(policies::list_policies).post(policies::create_policy))
        .route("/policies/:id", get(policies::get_policy))
        .route("/policies/:id/evaluate", post(policies::evaluate_policy))
        .route("/policies/:id/publish", post(policies::publish_policy))
        .route("/policies/:id/archive", post(policies::archive_policy));

    let review = Router::new()
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/:id", get(reviews::get_review))
        .route("/reviews/:id/action", post(reviews::submit_review_action));

    let evidence = Router::new()
        .route("/evidence", get(evidence::get_evidence))
        .route("/evidence/export", get(evidence::export_evidence))
        .route("/compliance/report", get(evidence::compliance_report));

    Router::new()
        .route("/health", get(moderate::health))
        .merge(moderation)
        .merge(policy)
        .merge(review)
        .merge(evidence)
        .layer(middleware::from_fn_with_state(state.clone(), cors::apply_cors))
        .with_state(state)
}
