//! CORS enforcement: strict default, exact-match origins,
//! `OPTIONS` refused entirely when no origin is configured.

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::extract::Request;

pub async fn apply_cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if request.method() == Method::OPTIONS {
        if !state.gate.cors.allows_preflight() {
            return StatusCode::FORBIDDEN.into_response();
        }
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_origin_header(&state, &origin, &mut response);
        return response;
    }

    let mut response = next.run(request).await;
    apply_origin_header(&state, &origin, &mut response);
    response
}

fn apply_origin_header(state: &AppState, origin: &Option<String>, response: &mut Response) {
    let Some(origin) = origin else { return };
    let Some(allowed) = state.gate.cors.allow_origin_header(origin) else { return };
    if let Ok(value) = HeaderValue::from_str(allowed) {
        response.headers_mut().insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
}
