//! WebhookSubscription / WebhookDelivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    ModerationCompleted,
    ReviewRequired,
    ReviewCompleted,
    PolicyUpdated,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::ModerationCompleted => "moderation.completed",
            EventType::ReviewRequired => "review.required",
            EventType::ReviewCompleted => "review.completed",
            EventType::PolicyUpdated => "policy.updated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "moderation.completed" => Some(EventType::ModerationCompleted),
            "review.required" => Some(EventType::ReviewRequired),
            "review.completed" => Some(EventType::ReviewCompleted),
            "policy.updated" => Some(EventType::PolicyUpdated),
            _ => None,
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EventType::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown event type: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookSubscription {
    pub id: Uuid,
    pub url: String,
    pub secret: String,
    /// Stored as a JSON array of event-type strings.
    pub event_types: serde_json::Value,
    pub active: bool,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookSubscription {
    pub fn event_types_parsed(&self) -> Vec<EventType> {
        let raw: Vec<String> = serde_json::from_value(self.event_types.clone()).unwrap_or_default();
        raw.iter().filter_map(|s| EventType::parse(s)).collect()
    }

    pub fn subscribes_to(&self, event: EventType) -> bool {
        self.active && self.event_types_parsed().contains(&event)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub attempt: i32,
    pub max_attempts: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub const MAX_ATTEMPTS: i32 = 5;
    /// Response bodies are stored truncated to 1 KiB.
    pub const RESPONSE_BODY_CAP: usize = 1024;

    pub fn new(subscription_id: Uuid, event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            subscription_id,
            event_type: event_type.as_str().to_string(),
            payload,
            response_status: None,
            response_body: None,
            attempt: 0,
            max_attempts: Self::MAX_ATTEMPTS,
            next_retry_at: None,
            delivered_at: None,
            failed_at: None,
            created_at: Utc::now(),
        }
    }

    /// `wait = min(2^(attempt-1), 64)` seconds before the next try
    ///, where `attempt` is the attempt number that just failed.
    pub fn backoff_seconds(attempt: i32) -> u64 {
        let pow = 1u64.checked_shl((attempt.max(1) - 1) as u32).unwrap_or(u64::MAX);
        pow.min(64)
    }

    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_as_str_uses_dotted_form() {
        assert_eq!(EventType::ModerationCompleted.as_str(), "moderation.completed");
        assert_eq!(EventType::parse("review.required"), Some(EventType::ReviewRequired));
    }

    #[test]
    fn backoff_caps_at_64_seconds() {
        assert_eq!(WebhookDelivery::backoff_seconds(1), 1);
        assert_eq!(WebhookDelivery::backoff_seconds(2), 2);
        assert_eq!(WebhookDelivery::backoff_seconds(4), 8);
        assert_eq!(WebhookDelivery::backoff_seconds(10), 64);
    }

    #[test]
    fn subscription_filters_inactive_and_unmatched() {
        let mut sub = WebhookSubscription {
            id: Uuid::new_v4(),
            url: "https://example.com/hook".into(),
            secret: "s".into(),
            event_types: serde_json::json!(["moderation.completed"]),
            active: true,
            description: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(sub.subscribes_to(EventType::ModerationCompleted));
        assert!(!sub.subscribes_to(EventType::ReviewRequired));
        sub.active = false;
        assert!(!sub.subscribes_to(EventType::ModerationCompleted));
    }

    #[test]
    fn delivery_is_exhausted_after_max_attempts() {
        let mut d = WebhookDelivery::new(Uuid::new_v4(), EventType::ModerationCompleted, serde_json::json!({}));
        d.attempt = WebhookDelivery::MAX_ATTEMPTS;
        assert!(d.exhausted());
    }
}
