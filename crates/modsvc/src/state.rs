//! Shared axum state: one `Clone`-able struct
//! composing the gate, the pipeline coordinator, and the raw pool for
//! handlers that talk to a domain repo directly.

use axum::extract::FromRef;
use modkit_gate::GateState;
use modkit_pipeline::Coordinator;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gate: GateState,
    pub coordinator: Arc<Coordinator>,
    pub pool: PgPool,
    pub rate_limit_rpm: u32,
}

impl FromRef<AppState> for GateState {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}
