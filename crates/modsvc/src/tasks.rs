//! Background maintenance loops. Each is a
//! `tokio::spawn`'d `tokio::time::interval` loop started once at boot.

use crate::state::AppState;
use std::time::Duration;

const RATE_LIMIT_EVICT_INTERVAL: Duration = Duration::from_secs(300);
const SUBSCRIPTION_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const RETENTION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

pub fn spawn_background_tasks(state: &AppState) {
    spawn_rate_limit_eviction(state.clone());
    spawn_subscription_refresh(state.clone());
    spawn_retention_purge(state.clone());
}

fn spawn_rate_limit_eviction(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RATE_LIMIT_EVICT_INTERVAL);
        loop {
            ticker.tick().await;
            state.gate.rate_limiter.evict_idle();
        }
    });
}

fn spawn_subscription_refresh(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SUBSCRIPTION_REFRESH_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(err) = state.coordinator.subscriptions.refresh(&state.pool).await {
                tracing::warn!(error = %err, "webhook subscription cache refresh failed");
            }
        }
    });
}

fn spawn_retention_purge(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match modkit_retention::purge_expired(&state.pool).await {
                Ok(report) => {
                    if report.decisions_deleted > 0 || report.submissions_deleted > 0 {
                        tracing::info!(
                            decisions_deleted = report.decisions_deleted,
                            submissions_deleted = report.submissions_deleted,
                            "retention purge completed"
                        );
                    }
                }
                Err(err) => tracing::warn!(error = %err, "retention purge failed"),
            }
        }
    });
}
