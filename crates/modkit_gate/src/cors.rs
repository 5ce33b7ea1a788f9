//! Strict-default CORS: no allowed origins means no
//! `Access-Control-Allow-Origin` header and `OPTIONS` is refused.
//! Wildcards are never accepted; origins are exact-match only.

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    /// Builds a policy from configured origins, dropping any literal `*`
    /// since wildcards are never honored regardless of configuration.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: allowed_origins.into_iter().filter(|o| o != "*").collect(),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }

    pub fn is_strict_default(&self) -> bool {
        self.allowed_origins.is_empty()
    }

    /// The `Access-Control-Allow-Origin` value to emit for `origin`, or
    /// `None` when the origin isn't allowed (no header should be emitted).
    pub fn allow_origin_header(&self, origin: &str) -> Option<&str> {
        self.allows(origin).then_some(origin)
    }

    /// Whether a preflight `OPTIONS` request should be accepted at all.
    pub fn allows_preflight(&self) -> bool {
        !self.is_strict_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_allows_nothing() {
        let cors = CorsPolicy::new(vec![]);
        assert!(cors.is_strict_default());
        assert!(!cors.allows_preflight());
        assert_eq!(cors.allow_origin_header("https://example.com"), None);
    }

    #[test]
    fn wildcard_is_never_honored() {
        let cors = CorsPolicy::new(vec!["*".to_string()]);
        assert!(cors.is_strict_default());
        assert_eq!(cors.allow_origin_header("https://example.com"), None);
    }

    #[test]
    fn exact_match_only() {
        let cors = CorsPolicy::new(vec!["https://app.example.com".to_string()]);
        assert_eq!(
            cors.allow_origin_header("https://app.example.com"),
            Some("https://app.example.com")
        );
        assert_eq!(cors.allow_origin_header("https://evil.example.com"), None);
        assert_eq!(cors.allow_origin_header("app.example.com"), None);
    }
}
