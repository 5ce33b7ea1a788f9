//! modkit_classifier
//!
//! The classifier orchestrator: fallback or ensemble
//! combination over configured adapters, optional calibration and an LLM
//! second pass over ambiguous-band categories.

use modkit_common::clamp01;
use modkit_domain::scores::CATEGORIES;
use modkit_domain::CategoryScores;
use modkit_providers::{ClassifyResponse, Provider, ProviderError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use modkit_domain::scores::CATEGORIES as ALL_CATEGORIES;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classification_failed: every adapter was exhausted")]
    ClassificationFailed,
}

/// One configured adapter slot.
pub struct AdapterSlot {
    pub provider: Arc<dyn Provider>,
    pub priority: i32,
    pub enabled: bool,
    /// Accuracy weight for `weighted_mean` combination, default 1.0.
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineStrategy {
    Max,
    Mean,
    WeightedMean,
}

impl Default for CombineStrategy {
    fn default() -> Self {
        CombineStrategy::Max
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub strategy: CombineStrategy,
    /// A category is "disagreed" iff `max - min > agreement_threshold`.
    pub agreement_threshold: f64,
    pub min_providers: usize,
    pub deadline: Duration,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            strategy: CombineStrategy::Max,
            agreement_threshold: 0.3,
            min_providers: 2,
            deadline: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmSecondPassConfig {
    pub enabled: bool,
    pub low: f64,
    pub high: f64,
}

impl LlmSecondPassConfig {
    pub fn disabled() -> Self {
        Self { enabled: false, low: 0.3, high: 0.7 }
    }

    fn in_ambiguous_band(&self, score: f64) -> bool {
        score >= self.low && score <= self.high
    }
}

/// `(offset, scale)` applied as `clamp01((s + offset) * scale)` before
/// combination. Keyed by `(provider_name, category)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    table: BTreeMap<(String, &'static str), (f64, f64)>,
}

impl Calibration {
    pub fn set(&mut self, provider: &str, category: &'static str, offset: f64, scale: f64) {
        self.table.insert((provider.to_string(), category), (offset, scale));
    }

    fn apply(&self, provider: &str, category: &'static str, score: f64) -> f64 {
        match self.table.get(&(provider.to_string(), category)) {
            Some((offset, scale)) => clamp01((score + offset) * scale),
            None => score,
        }
    }

    fn apply_all(&self, provider: &str, scores: &CategoryScores) -> CategoryScores {
        let mut out = scores.clone();
        for cat in CATEGORIES {
            let calibrated = self.apply(provider, cat, out.get(cat));
            out.set(cat, calibrated);
        }
        out
    }
}

/// Per-category disagreement, surfaced for the policy layer to decide
/// auto-escalation.
#[derive(Debug, Clone, Default)]
pub struct Disagreement {
    pub disagreed_categories: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub scores: CategoryScores,
    pub model_name: String,
    pub model_version: String,
    pub disagreement: Disagreement,
}

/// Fallback mode: call adapters in priority order;
/// first successful response wins. Transient/rate-limited errors retry up
/// to 3 times per adapter with 1s/2s/3s waits; permanent errors fall
/// through to the next adapter immediately.
pub async fn classify_fallback(
    adapters: &[AdapterSlot],
    text: &str,
    language: Option<&str>,
) -> Result<ClassificationOutcome, ClassifierError> {
    let mut sorted: Vec<&AdapterSlot> = adapters.iter().filter(|a| a.enabled).collect();
    sorted.sort_by_key(|a| a.priority);

    for slot in sorted {
        match call_with_retry(slot.provider.as_ref(), text, language).await {
            Ok(resp) => {
                return Ok(ClassificationOutcome {
                    scores: resp.scores.clamped(),
                    model_name: resp.model_name,
                    model_version: resp.model_version,
                    disagreement: Disagreement::default(),
                })
            }
            Err(_) => continue,
        }
    }

    Err(ClassifierError::ClassificationFailed)
}

const RETRY_WAITS_SECS: [u64; 3] = [1, 2, 3];

/// The initial call plus up to 3 retries (one per `RETRY_WAITS_SECS` entry),
/// 4 attempts total. Each wait precedes its retry; a failing final attempt
/// returns immediately without sleeping again.
async fn call_with_retry(
    provider: &dyn Provider,
    text: &str,
    language: Option<&str>,
) -> Result<ClassifyResponse, ProviderError> {
    let mut last_err = match provider.classify(text, language).await {
        Ok(resp) => return Ok(resp),
        Err(e) if e.is_retryable() => e,
        Err(e) => return Err(e),
    };

    for wait in RETRY_WAITS_SECS {
        tokio::time::sleep(Duration::from_secs(wait)).await;
        match provider.classify(text, language).await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_retryable() => last_err = e,
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}

/// Ensemble mode: invoke enabled adapters in parallel under a
/// shared deadline, combine per category, detect disagreement.
pub async fn classify_ensemble(
    adapters: &[AdapterSlot],
    text: &str,
    language: Option<&str>,
    config: &EnsembleConfig,
    calibration: &Calibration,
) -> Result<ClassificationOutcome, ClassifierError> {
    let enabled: Vec<&AdapterSlot> = adapters.iter().filter(|a| a.enabled).collect();

    let futures = enabled.iter().map(|slot| {
        let provider = slot.provider.clone();
        let weight = slot.weight;
        async move {
            let result = tokio::time::timeout(config.deadline, provider.classify(text, language)).await;
            match result {
                Ok(Ok(resp)) => Some((resp, weight)),
                _ => None,
            }
        }
    });

    let results: Vec<Option<(ClassifyResponse, f64)>> = futures::future::join_all(futures).await;
    let successes: Vec<(ClassifyResponse, f64)> = results.into_iter().flatten().collect();

    if successes.is_empty() {
        return Err(ClassifierError::ClassificationFailed);
    }

    let mut combined = CategoryScores::default();
    let mut disagreed = Vec::new();

    for category in CATEGORIES {
        let per_provider: Vec<(f64, f64)> = successes
            .iter()
            .map(|(resp, weight)| {
                let calibrated = calibration.apply(&resp.model_name, category, resp.scores.get(category));
                (calibrated, *weight)
            })
            .collect();

        let values: Vec<f64> = per_provider.iter().map(|(v, _)| *v).collect();
        let max = values.iter().cloned().fold(f64::MIN, f64::max);
        let min = values.iter().cloned().fold(f64::MAX, f64::min);

        let value = match config.strategy {
            CombineStrategy::Max => max,
            CombineStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
            CombineStrategy::WeightedMean => {
                let weight_sum: f64 = per_provider.iter().map(|(_, w)| w).sum();
                if weight_sum == 0.0 {
                    values.iter().sum::<f64>() / values.len() as f64
                } else {
                    per_provider.iter().map(|(v, w)| v * w).sum::<f64>() / weight_sum
                }
            }
        };

        combined.set(category, clamp01(value));

        if values.len() >= config.min_providers && (max - min) > config.agreement_threshold {
            disagreed.push(category);
        }
    }

    Ok(ClassificationOutcome {
        scores: combined.clamped(),
        model_name: "ensemble".to_string(),
        model_version: successes.len().to_string(),
        disagreement: Disagreement { disagreed_categories: disagreed },
    })
}

/// LLM second pass: for every category whose primary score
/// falls inside `[low, high]`, replace it with the LLM's score for that
/// category; non-ambiguous categories are left untouched.
pub async fn apply_llm_second_pass(
    llm: &dyn Provider,
    text: &str,
    language: Option<&str>,
    config: &LlmSecondPassConfig,
    primary: &CategoryScores,
) -> Result<CategoryScores, ProviderError> {
    if !config.enabled {
        return Ok(primary.clone());
    }

    let ambiguous: Vec<&'static str> = CATEGORIES
        .into_iter()
        .filter(|c| config.in_ambiguous_band(primary.get(c)))
        .collect();

    if ambiguous.is_empty() {
        return Ok(primary.clone());
    }

    let llm_resp = llm.classify(text, language).await?;
    let mut out = primary.clone();
    for cat in ambiguous {
        out.set(cat, llm_resp.scores.get(cat));
    }
    Ok(out.clamped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use modkit_providers::ClassifyResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        name: &'static str,
        attempts: AtomicUsize,
        fail_times: usize,
        fail_kind: fn() -> ProviderError,
        final_score: f64,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn classify(&self, _text: &str, _language: Option<&str>) -> Result<ClassifyResponse, ProviderError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                return Err((self.fail_kind)());
            }
            let mut scores = CategoryScores::default();
            scores.toxicity = self.final_score;
            Ok(ClassifyResponse {
                scores,
                model_name: self.name.to_string(),
                model_version: "1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn fallback_tries_next_adapter_on_permanent_error() {
        let failing = AdapterSlot {
            provider: Arc::new(ScriptedProvider {
                name: "a",
                attempts: AtomicUsize::new(0),
                fail_times: 99,
                fail_kind: || ProviderError::Permanent("nope".into()),
                final_score: 0.0,
            }),
            priority: 0,
            enabled: true,
            weight: 1.0,
        };
        let working = AdapterSlot {
            provider: Arc::new(ScriptedProvider {
                name: "b",
                attempts: AtomicUsize::new(0),
                fail_times: 0,
                fail_kind: || ProviderError::Permanent("unused".into()),
                final_score: 0.7,
            }),
            priority: 1,
            enabled: true,
            weight: 1.0,
        };
        let outcome = classify_fallback(&[failing, working], "hello", None).await.unwrap();
        assert_eq!(outcome.model_name, "b");
        assert_eq!(outcome.scores.toxicity, 0.7);
    }

    #[tokio::test]
    async fn fallback_fails_when_all_adapters_exhausted() {
        let a = AdapterSlot {
            provider: Arc::new(ScriptedProvider {
                name: "a",
                attempts: AtomicUsize::new(0),
                fail_times: 99,
                fail_kind: || ProviderError::Permanent("nope".into()),
                final_score: 0.0,
            }),
            priority: 0,
            enabled: true,
            weight: 1.0,
        };
        let err = classify_fallback(&[a], "hello", None).await.unwrap_err();
        assert!(matches!(err, ClassifierError::ClassificationFailed));
    }

    #[tokio::test]
    async fn ensemble_detects_disagreement_via_max_min_spread() {
        let a = AdapterSlot {
            provider: Arc::new(ScriptedProvider {
                name: "a",
                attempts: AtomicUsize::new(0),
                fail_times: 0,
                fail_kind: || ProviderError::Permanent("unused".into()),
                final_score: 0.2,
            }),
            priority: 0,
            enabled: true,
            weight: 1.0,
        };
        let b = AdapterSlot {
            provider: Arc::new(ScriptedProvider {
                name: "b",
                attempts: AtomicUsize::new(0),
                fail_times: 0,
                fail_kind: || ProviderError::Permanent("unused".into()),
                final_score: 0.9,
            }),
            priority: 1,
            enabled: true,
            weight: 1.0,
        };
        let config = EnsembleConfig::default();
        let outcome = classify_ensemble(&[a, b], "hello", None, &config, &Calibration::default())
            .await
            .unwrap();
        assert_eq!(outcome.scores.toxicity, 0.9);
        assert!(outcome.disagreement.disagreed_categories.contains(&"toxicity"));
    }

    #[tokio::test]
    async fn llm_second_pass_only_replaces_ambiguous_categories() {
        struct FixedLlm;
        #[async_trait]
        impl Provider for FixedLlm {
            fn name(&self) -> &str {
                "llm"
            }
            async fn classify(&self, _text: &str, _language: Option<&str>) -> Result<ClassifyResponse, ProviderError> {
                let mut scores = CategoryScores::default();
                scores.toxicity = 0.55;
                scores.hate = 0.1;
                Ok(ClassifyResponse { scores, model_name: "llm".into(), model_version: "1".into() })
            }
        }

        let mut primary = CategoryScores::default();
        primary.toxicity = 0.5; // inside [0.3, 0.7]
        primary.hate = 0.95; // outside band, must stay untouched

        let config = LlmSecondPassConfig { enabled: true, low: 0.3, high: 0.7 };
        let result = apply_llm_second_pass(&FixedLlm, "text", None, &config, &primary).await.unwrap();
        assert_eq!(result.toxicity, 0.55);
        assert_eq!(result.hate, 0.95);
    }
}
