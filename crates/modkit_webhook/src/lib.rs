//! modkit_webhook
//!
//! Webhook dispatcher: HMAC-signed, at-least-once
//! delivery, out-of-band from the originating request. Deliveries within a
//! subscription proceed sequentially; across subscriptions they run
//! concurrently.

use chrono::Utc;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use modkit_domain::{EventType, WebhookDelivery, WebhookSubscription};
use reqwest::Client;
use sha2::Sha256;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Canon(#[from] modkit_common::CanonError),
}

/// Canonical outbound payload: `{id, event_type, timestamp, data}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookPayload {
    pub id: Uuid,
    pub event_type: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub data: serde_json::Value,
}

/// `sha256=<hex hmac_sha256(secret, body)>`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    sign(secret, body) == signature
}

/// In-process cache of active subscriptions, refreshed from the DB
/// periodically rather than re-queried on every dispatch.
#[derive(Default)]
pub struct SubscriptionCache {
    subscriptions: DashMap<Uuid, WebhookSubscription>,
}

impl SubscriptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh(&self, pool: &PgPool) -> Result<(), WebhookError> {
        let rows = sqlx::query_as::<_, WebhookSubscription>(
            "SELECT * FROM webhook_subscriptions WHERE active = true",
        )
        .fetch_all(pool)
        .await?;
        self.subscriptions.clear();
        for row in rows {
            self.subscriptions.insert(row.id, row);
        }
        Ok(())
    }

    pub fn matching(&self, event: EventType) -> Vec<WebhookSubscription> {
        self.subscriptions
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| s.subscribes_to(event))
            .collect()
    }
}

pub struct Dispatcher {
    client: Client,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builder"),
        }
    }

    /// Dispatches `event_type` with `data` to every active subscription
    /// that matches, concurrently across subscriptions, sequentially (by
    /// construction: one task per subscription, retried in a loop) within
    /// each.
    pub async fn dispatch(
        &self,
        pool: &PgPool,
        cache: &SubscriptionCache,
        event_type: EventType,
        data: serde_json::Value,
    ) -> Result<(), WebhookError> {
        let subscriptions = cache.matching(event_type);
        let payload_id = Uuid::new_v4();
        let timestamp = Utc::now();
        let payload = WebhookPayload { id: payload_id, event_type: event_type.as_str().to_string(), timestamp, data };
        let body = modkit_common::canonical_json_bytes(&payload)?;

        let mut handles = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let client = self.client.clone();
            let pool = pool.clone();
            let body = body.clone();
            handles.push(tokio::spawn(async move {
                deliver_with_retries(&client, &pool, &subscription, event_type, &body).await
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

async fn deliver_with_retries(
    client: &Client,
    pool: &PgPool,
    subscription: &WebhookSubscription,
    event_type: EventType,
    body: &[u8],
) -> Result<(), WebhookError> {
    let mut delivery = WebhookDelivery::new(
        subscription.id,
        event_type,
        serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
    );
    delivery.id = sqlx::query_scalar(
        "INSERT INTO webhook_deliveries \
            (id, subscription_id, event_type, payload, attempt, max_attempts, created_at) \
         VALUES (gen_random_uuid(), $1, $2, $3, 0, $4, now()) RETURNING id",
    )
    .bind(subscription.id)
    .bind(&delivery.event_type)
    .bind(&delivery.payload)
    .bind(delivery.max_attempts)
    .fetch_one(pool)
    .await?;

    let signature = sign(&subscription.secret, body);

    loop {
        delivery.attempt += 1;
        let result = client
            .post(&subscription.url)
            .header("Content-Type", "application/json")
            .header("X-Webhook-ID", delivery.id.to_string())
            .header("X-Webhook-Event", &delivery.event_type)
            .header("X-Webhook-Timestamp", Utc::now().to_rfc3339())
            .header("X-Webhook-Signature", &signature)
            .body(body.to_vec())
            .send()
            .await;

        let now = Utc::now();
        match result {
            Ok(resp) if resp.status().is_success() => {
                let body_text = resp.text().await.unwrap_or_default();
                let truncated = truncate_bytes(&body_text, WebhookDelivery::RESPONSE_BODY_CAP);
                sqlx::query(
                    "UPDATE webhook_deliveries SET attempt = $1, response_status = $2, \
                     response_body = $3, delivered_at = $4 WHERE id = $5",
                )
                .bind(delivery.attempt)
                .bind(200i32)
                .bind(truncated)
                .bind(now)
                .bind(delivery.id)
                .execute(pool)
                .await?;
                return Ok(());
            }
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                record_attempt(pool, &delivery, status, now).await?;
            }
            Err(_) => {
                record_attempt(pool, &delivery, 0, now).await?;
            }
        }

        if delivery.exhausted() {
            sqlx::query("UPDATE webhook_deliveries SET failed_at = $1 WHERE id = $2")
                .bind(now)
                .bind(delivery.id)
                .execute(pool)
                .await?;
            return Ok(());
        }

        let wait = WebhookDelivery::backoff_seconds(delivery.attempt);
        tokio::time::sleep(Duration::from_secs(wait)).await;
    }
}

async fn record_attempt(
    pool: &PgPool,
    delivery: &WebhookDelivery,
    status: i32,
    now: chrono::DateTime<Utc>,
) -> Result<(), WebhookError> {
    sqlx::query(
        "UPDATE webhook_deliveries SET attempt = $1, response_status = $2, next_retry_at = $3 WHERE id = $4",
    )
    .bind(delivery.attempt)
    .bind(status)
    .bind(now + chrono::Duration::seconds(WebhookDelivery::backoff_seconds(delivery.attempt) as i64))
    .bind(delivery.id)
    .execute(pool)
    .await?;
    Ok(())
}

fn truncate_bytes(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let secret = "topsecret";
        let body = b"{\"a\":1}";
        let sig = sign(secret, body);
        assert!(sig.starts_with("sha256="));
        assert!(verify(secret, body, &sig));
        assert!(!verify(secret, body, "sha256=deadbeef"));
    }

    #[test]
    fn truncate_bytes_caps_length() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_bytes(&long, 1024).len(), 1024);
    }
}
