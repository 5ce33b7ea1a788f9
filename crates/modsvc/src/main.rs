//! modsvc
//!
//! The moderation pipeline HTTP service binary: loads configuration, wires
//! every `modkit_*` crate into one `Coordinator` + `GateState`, spawns the
//! background maintenance loops, and serves the axum router.

mod config;
mod error;
mod routes;
mod state;
mod tasks;

use anyhow::Context;
use clap::Parser;
use config::Config;
use modkit_cache::ClassificationCache;
use modkit_classifier::{AdapterSlot, EnsembleConfig, LlmSecondPassConfig};
use modkit_gate::{CorsPolicy, GateState};
use modkit_pipeline::{ClassificationMode, Coordinator};
use modkit_providers::OpenAiModerationProvider;
use modkit_webhook::{Dispatcher, SubscriptionCache};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    init_tracing(&config);

    let pool_config = modkit_db::PoolConfig {
        database_url: config.database_url.clone(),
        max_connections: config.db_max_connections,
        min_connections: config.db_min_connections,
        max_lifetime: Duration::from_secs(3600),
        acquire_timeout: Duration::from_secs(10),
    };
    let pool = modkit_db::connect(&pool_config).await.context("connecting to database")?;
    modkit_db::migrate(&pool).await.context("running database migrations")?;

    let cache = ClassificationCache::new(&config.cache_url).context("building classification cache client")?;

    let mut adapters = Vec::new();
    if let Some(base_url) = &config.classifier_provider_base_url {
        adapters.push(AdapterSlot {
            provider: Arc::new(OpenAiModerationProvider::new(base_url.clone(), config.classifier_provider_api_key.clone())),
            priority: 0,
            enabled: true,
            weight: 1.0,
        });
    }
    if let Some(base_url) = &config.classifier_provider_2_base_url {
        adapters.push(AdapterSlot {
            provider: Arc::new(OpenAiModerationProvider::new(base_url.clone(), config.classifier_provider_2_api_key.clone())),
            priority: 1,
            enabled: true,
            weight: 1.0,
        });
    }

    let llm: Option<Arc<dyn modkit_providers::Provider>> = config
        .llm_provider_base_url
        .as_ref()
        .map(|base_url| Arc::new(OpenAiModerationProvider::new(base_url.clone(), config.llm_api_key.clone())) as _);

    let llm_config = if config.llm_second_pass_enabled {
        LlmSecondPassConfig { enabled: true, low: 0.3, high: 0.7 }
    } else {
        LlmSecondPassConfig::disabled()
    };

    let ensemble_config = EnsembleConfig {
        strategy: config.ensemble_strategy(),
        agreement_threshold: config.ensemble_threshold,
        ..EnsembleConfig::default()
    };

    let dispatcher = Dispatcher::new();
    let subscriptions = SubscriptionCache::new();
    subscriptions.refresh(&pool).await.context("loading webhook subscriptions")?;

    let coordinator = Arc::new(Coordinator {
        pool: pool.clone(),
        adapters,
        mode: if config.ensemble_enabled { ClassificationMode::Ensemble } else { ClassificationMode::Fallback },
        ensemble_config,
        calibration: config.calibration(),
        llm,
        llm_config,
        cache,
        dispatcher,
        subscriptions,
        max_content_length: config.max_content_length,
    });

    let cors = CorsPolicy::new(config.cors_origins());
    let gate = GateState::new(pool.clone(), cors, config.internal_service_token.clone());

    let app_state = AppState { gate, coordinator, pool, rate_limit_rpm: config.rate_limit_rpm };
    tasks::spawn_background_tasks(&app_state);

    let router = routes::build(app_state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.context("binding listener")?;
    tracing::info!(%addr, environment = %config.environment, "modsvc listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "pretty" {
        registry.with(fmt::layer()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}
