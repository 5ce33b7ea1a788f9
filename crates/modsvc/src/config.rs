//! Process configuration: one `clap` struct covering every recognized
//! environment variable, parsed once at startup.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "modsvc", version, about = "Online text moderation pipeline service")]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 25)]
    pub db_max_connections: u32,

    #[arg(long, env = "DB_MIN_CONNECTIONS", default_value_t = 5)]
    pub db_min_connections: u32,

    /// Redis connection string backing the classification cache.
    #[arg(long, env = "CACHE_URL", default_value = "redis://127.0.0.1:6379")]
    pub cache_url: String,

    /// Base URL of the primary classification provider.
    #[arg(long, env = "CLASSIFIER_PROVIDER_BASE_URL")]
    pub classifier_provider_base_url: Option<String>,

    #[arg(long, env = "CLASSIFIER_PROVIDER_API_KEY")]
    pub classifier_provider_api_key: Option<String>,

    /// A second classification provider, enabling ensemble mode when set
    /// alongside `ENSEMBLE_ENABLED=true`.
    #[arg(long, env = "CLASSIFIER_PROVIDER_2_BASE_URL")]
    pub classifier_provider_2_base_url: Option<String>,

    #[arg(long, env = "CLASSIFIER_PROVIDER_2_API_KEY")]
    pub classifier_provider_2_api_key: Option<String>,

    #[arg(long, env = "LLM_PROVIDER_BASE_URL")]
    pub llm_provider_base_url: Option<String>,

    #[arg(long, env = "LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, env = "LLM_SECOND_PASS_ENABLED", default_value_t = false)]
    pub llm_second_pass_enabled: bool,

    #[arg(long, env = "ENSEMBLE_ENABLED", default_value_t = false)]
    pub ensemble_enabled: bool,

    /// `max`, `mean`, or `weighted_mean`.
    #[arg(long, env = "ENSEMBLE_STRATEGY", default_value = "max")]
    pub ensemble_strategy: String,

    #[arg(long, env = "ENSEMBLE_THRESHOLD", default_value_t = 0.3)]
    pub ensemble_threshold: f64,

    /// Inline JSON array of `{provider, category, offset, scale}` entries;
    /// empty/absent means no calibration is applied.
    #[arg(long, env = "CALIBRATION_JSON")]
    pub calibration_json: Option<String>,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Comma-separated exact-match CORS origins; empty means the strict
    /// default (no header emitted, no preflight allowed).
    #[arg(long, env = "ALLOWED_CORS_ORIGINS", default_value = "")]
    pub allowed_cors_origins: String,

    #[arg(long, env = "RATE_LIMIT_RPM", default_value_t = modkit_gate::DEFAULT_RATE_LIMIT_RPM)]
    pub rate_limit_rpm: u32,

    #[arg(long, env = "MAX_CONTENT_LENGTH", default_value_t = 10_000)]
    pub max_content_length: usize,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// `json` or `pretty`.
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Shared bearer token for back-end-to-back-end calls. Absent means
    /// every internal-auth check refuses: there is no
    /// "unconfigured = allow" fallback.
    #[arg(long, env = "INTERNAL_SERVICE_TOKEN")]
    pub internal_service_token: Option<String>,

    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn cors_origins(&self) -> Vec<String> {
        self.allowed_cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn ensemble_strategy(&self) -> modkit_classifier::CombineStrategy {
        match self.ensemble_strategy.as_str() {
            "mean" => modkit_classifier::CombineStrategy::Mean,
            "weighted_mean" => modkit_classifier::CombineStrategy::WeightedMean,
            _ => modkit_classifier::CombineStrategy::Max,
        }
    }

    /// Parses `CALIBRATION_JSON` into a `Calibration` table. Malformed or
    /// absent configuration yields an empty (no-op) table rather than
    /// failing startup.
    pub fn calibration(&self) -> modkit_classifier::Calibration {
        let mut calibration = modkit_classifier::Calibration::default();
        let Some(raw) = &self.calibration_json else { return calibration };
        let Ok(entries) = serde_json::from_str::<Vec<CalibrationEntry>>(raw) else {
            tracing::warn!("CALIBRATION_JSON is not valid JSON; running without calibration");
            return calibration;
        };
        for entry in entries {
            let Some(category) = modkit_domain::scores::CATEGORIES
                .into_iter()
                .find(|c| *c == entry.category.as_str())
            else {
                tracing::warn!(category = %entry.category, "CALIBRATION_JSON names an unknown category, skipping");
                continue;
            };
            calibration.set(&entry.provider, category, entry.offset, entry.scale);
        }
        calibration
    }
}

#[derive(Debug, serde::Deserialize)]
struct CalibrationEntry {
    provider: String,
    category: String,
    offset: f64,
    scale: f64,
}
