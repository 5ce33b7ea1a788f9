//! modkit_providers
//!
//! Provider transport + normalization ONLY.
//! No retry. No caching. No policy. Adapters are stateless, carry their own
//! HTTP client and timeout, and map upstream labels onto the fixed
//! `CategoryScores` vector.

use async_trait::async_trait;
use modkit_domain::CategoryScores;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("permanent provider failure: {0}")]
    Permanent(String),
    #[error("rate limited by provider")]
    RateLimited,
}

impl ProviderError {
    /// Whether the classifier orchestrator should retry this adapter
    /// before falling through.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::RateLimited)
    }
}

#[derive(Debug, Clone)]
pub struct ClassifyResponse {
    pub scores: CategoryScores,
    pub model_name: String,
    pub model_version: String,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<ClassifyResponse, ProviderError>;
}

/// An OpenAI-moderation-compatible adapter: POSTs `{input}`, expects
/// `{results: [{category_scores: {<label>: f64, ...}}]}` and maps upstream
/// labels onto the fixed category set via `label_map`.
pub struct OpenAiModerationProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model_name: String,
    model_version: String,
    label_map: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    category_scores: BTreeMap<String, f64>,
}

impl OpenAiModerationProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builder");
        Self {
            client,
            base_url,
            api_key,
            model_name: "openai-moderation".to_string(),
            model_version: "latest".to_string(),
            label_map: [
                ("harassment", "harassment"),
                ("hate", "hate"),
                ("sexual", "sexual_content"),
                ("violence", "violence"),
                ("self-harm", "self_harm"),
            ]
            .into_iter()
            .collect(),
        }
    }
}

#[async_trait]
impl Provider for OpenAiModerationProvider {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn classify(
        &self,
        text: &str,
        _language: Option<&str>,
    ) -> Result<ClassifyResponse, ProviderError> {
        let url = format!("{}/v1/moderations", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(url).json(&serde_json::json!({ "input": text }));
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                req = req.bearer_auth(key);
            }
        }

        let resp = req.send().await.map_err(classify_transport_error)?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if resp.status().is_server_error() {
            return Err(ProviderError::Transient(format!("upstream {}", resp.status())));
        }
        if !resp.status().is_success() {
            return Err(ProviderError::Permanent(format!("upstream {}", resp.status())));
        }

        let body: ModerationResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("invalid response body: {e}")))?;
        let first = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Permanent("empty results array".into()))?;

        let mut mapped = BTreeMap::new();
        for (upstream_label, score) in first.category_scores {
            if let Some(category) = self.label_map.get(upstream_label.as_str()) {
                mapped.insert(category.to_string(), score);
            }
        }

        Ok(ClassifyResponse {
            scores: CategoryScores::from_map(&mapped),
            model_name: self.model_name.clone(),
            model_version: self.model_version.clone(),
        })
    }
}

fn classify_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() || e.is_connect() {
        ProviderError::Transient(e.to_string())
    } else {
        ProviderError::Permanent(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_retryable_for_each_error_kind() {
        assert!(ProviderError::Transient("x".into()).is_retryable());
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(!ProviderError::Permanent("x".into()).is_retryable());
    }

    #[test]
    fn label_map_drops_unknown_upstream_categories() {
        let provider = OpenAiModerationProvider::new("http://localhost".into(), None);
        let mut raw = BTreeMap::new();
        raw.insert("harassment".to_string(), 0.4);
        raw.insert("some-new-upstream-label".to_string(), 0.9);
        let mut mapped = BTreeMap::new();
        for (k, v) in raw {
            if let Some(c) = provider.label_map.get(k.as_str()) {
                mapped.insert(c.to_string(), v);
            }
        }
        let scores = CategoryScores::from_map(&mapped);
        assert_eq!(scores.harassment, 0.4);
    }
}
