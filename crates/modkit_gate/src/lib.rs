//! modkit_gate
//!
//! Shared infrastructure: credential verification,
//! authorization, rate limiting, trusted-proxy IP extraction, and CORS.

pub mod auth;
pub mod cors;
pub mod proxy;
pub mod ratelimit;

pub use auth::{authenticate, authorize, hash_api_key, verify_internal_bearer, AuthError};
pub use cors::CorsPolicy;
pub use proxy::{client_ip, default_trusted_prefixes, is_trusted};
pub use ratelimit::{RateLimiter, DEFAULT_RATE_LIMIT_RPM};

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, StatusCode};
use modkit_domain::{Role, User};
use sqlx::PgPool;
use std::net::IpAddr;
use std::sync::Arc;

/// Process-wide gate state, cloned cheaply into axum handler state.
#[derive(Clone)]
pub struct GateState {
    pub pool: PgPool,
    pub rate_limiter: Arc<RateLimiter>,
    pub cors: CorsPolicy,
    pub trusted_proxies: Vec<(IpAddr, u8)>,
    pub internal_bearer_token: Option<Arc<str>>,
}

impl GateState {
    pub fn new(pool: PgPool, cors: CorsPolicy, internal_bearer_token: Option<String>) -> Self {
        Self {
            pool,
            rate_limiter: Arc::new(RateLimiter::new()),
            cors,
            trusted_proxies: default_trusted_prefixes(),
            internal_bearer_token: internal_bearer_token.map(Arc::from),
        }
    }
}

/// The authenticated caller, attached to request context by the
/// `X-API-Key` extractor. Handlers that need a minimum role
/// call [`AuthenticatedUser::require`].
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn require(&self, minimum: Role) -> Result<(), AuthError> {
        authorize(self.0.role, minimum)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = GateState::from_ref(state);
        let key = parts
            .headers
            .get("X-API-Key")
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing X-API-Key"))?;

        let user = authenticate(&gate.pool, key)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid API key"))?;

        Ok(AuthenticatedUser(user))
    }
}

/// Applies the rate limit for an authenticated caller, keyed on user id
/// with that user's configured RPM. Returns `Err` with the
/// `Retry-After` seconds to send back on refusal.
pub fn enforce_rate_limit(state: &GateState, key: &str, rpm: u32) -> Result<(), u64> {
    if state.rate_limiter.check(key, rpm) {
        Ok(())
    } else {
        Err(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_refusal_carries_retry_after() {
        let limiter = RateLimiter::new();
        let state = GateState {
            pool: PgPool::connect_lazy("postgres://localhost/test").unwrap(),
            rate_limiter: Arc::new(limiter),
            cors: CorsPolicy::default(),
            trusted_proxies: default_trusted_prefixes(),
            internal_bearer_token: None,
        };
        assert!(enforce_rate_limit(&state, "k", 1).is_ok());
        assert_eq!(enforce_rate_limit(&state, "k", 1), Err(60));
    }
}
