//! Per-request pipeline coordinator: composes every other
//! component in the fixed 13-step order and commits the decision and its
//! `MOD-001`/`POL-001` evidence atomically.

use crate::validate::{validate_content, validate_context, validate_source, ValidationError};
use modkit_cache::ClassificationCache;
use modkit_classifier::{
    classify_ensemble, classify_fallback, AdapterSlot, Calibration, ClassificationOutcome,
    ClassifierError, Disagreement, EnsembleConfig, LlmSecondPassConfig,
};
use modkit_domain::evidence::ControlTag;
use modkit_domain::{Action, CategoryScores, Decision, Submission};
use modkit_evidence::{write_decision_with_evidence, EvidenceSpec};
use modkit_policy::{evaluate, PolicyRepo};
use modkit_providers::Provider;
use modkit_trust::TrustScorer;
use modkit_webhook::{Dispatcher, SubscriptionCache};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Evidence(#[from] modkit_evidence::EvidenceError),
    #[error(transparent)]
    PolicyRepo(#[from] modkit_policy::PolicyRepoError),
    #[error(transparent)]
    Trust(#[from] modkit_trust::TrustError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMode {
    Fallback,
    Ensemble,
}

pub struct ModerationRequest {
    pub content: String,
    pub context_metadata: Option<Value>,
    pub source: Option<String>,
    pub policy_id: Option<Uuid>,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModerationResult {
    pub decision_id: Uuid,
    pub submission_id: Uuid,
    pub action: Action,
    pub category_scores: CategoryScores,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub policy_applied: Option<String>,
    pub policy_version: Option<i32>,
    pub requires_review: bool,
    pub detected_language: String,
}

pub struct Coordinator {
    pub pool: PgPool,
    pub adapters: Vec<AdapterSlot>,
    pub mode: ClassificationMode,
    pub ensemble_config: EnsembleConfig,
    pub calibration: Calibration,
    pub llm: Option<Arc<dyn Provider>>,
    pub llm_config: LlmSecondPassConfig,
    pub cache: ClassificationCache,
    pub dispatcher: Dispatcher,
    pub subscriptions: SubscriptionCache,
    /// `MAX_CONTENT_LENGTH`.
    pub max_content_length: usize,
}

impl Coordinator {
    /// Runs the full pipeline and additionally fires step 13's
    /// webhook/trust notifications as a detached background task, so a slow
    /// or retrying delivery never delays the response. Used by `/moderate`.
    pub async fn moderate(self: Arc<Self>, request: ModerationRequest) -> Result<ModerationResult, PipelineError> {
        let (decision, result, user_id) = self.run(request).await?;
        let requires_review = result.requires_review;
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.notify(&decision, requires_review, user_id).await;
        });
        Ok(result)
    }

    /// Runs steps 1-12 only, skipping step 13's notifications. Used by
    /// `/moderate/batch`, which does not fan out per-item webhooks or trust
    /// updates at batch scale.
    pub async fn moderate_quiet(&self, request: ModerationRequest) -> Result<ModerationResult, PipelineError> {
        let (_, result, _) = self.run(request).await?;
        Ok(result)
    }

    async fn run(
        &self,
        request: ModerationRequest,
    ) -> Result<(Decision, ModerationResult, Option<String>), PipelineError> {
        // 1. validate
        validate_content(&request.content, self.max_content_length)?;
        validate_source(request.source.as_deref())?;
        let context = request.context_metadata.unwrap_or_else(|| serde_json::json!({}));
        validate_context(&context)?;

        // 2. normalize
        let normalized = modkit_normalize::normalize(&request.content);
        let content_hash = modkit_common::content_hash(&normalized);

        // 3. persist submission
        let submission = Submission::new(content_hash.clone(), request.source.clone(), context.clone());
        sqlx::query(
            "INSERT INTO submissions (id, content_hash, source, context, created_at, retention_expires_at) \
             VALUES ($1,$2,$3,$4,$5,$6)",
        )
        .bind(submission.id)
        .bind(&submission.content_hash)
        .bind(&submission.source)
        .bind(&submission.context)
        .bind(submission.created_at)
        .bind(submission.retention_expires_at)
        .execute(&self.pool)
        .await?;

        // 4. cache lookup
        let cached = self.cache.get(&content_hash).await;

        // 5. detect language
        let detection = modkit_langdetect::detect(&normalized);

        // 6. classify (fallback or ensemble), unless the cache already has it
        let mut outcome = match cached {
            Some(scores) => ClassificationOutcome {
                scores,
                model_name: "cache".to_string(),
                model_version: "-".to_string(),
                disagreement: Disagreement::default(),
            },
            None => {
                let outcome = match self.mode {
                    ClassificationMode::Fallback => {
                        classify_fallback(&self.adapters, &normalized, Some(&detection.language)).await?
                    }
                    ClassificationMode::Ensemble => {
                        classify_ensemble(
                            &self.adapters,
                            &normalized,
                            Some(&detection.language),
                            &self.ensemble_config,
                            &self.calibration,
                        )
                        .await?
                    }
                };
                self.cache.put(&content_hash, &outcome.scores).await;
                outcome
            }
        };

        // 7. optional LLM second pass over the ambiguous band
        if let Some(llm) = &self.llm {
            let refined = modkit_classifier::apply_llm_second_pass(
                llm.as_ref(),
                &normalized,
                Some(&detection.language),
                &self.llm_config,
                &outcome.scores,
            )
            .await;
            if let Ok(refined) = refined {
                outcome.scores = refined;
            }
        }

        // 8. select policy
        let policy_repo = PolicyRepo::new(&self.pool);
        let policy = policy_repo
            .select_for_evaluation(request.policy_id)
            .await?
            .unwrap_or_else(|| modkit_domain::Policy::synthetic_allow_all("default"));

        // 9. fetch trust score if context.user_id present
        let user_id = submission.user_id();
        let trust_score = match &user_id {
            Some(uid) => Some(TrustScorer::new(&self.pool).trust_score(uid).await?),
            None => None,
        };

        // 10. evaluate
        let eval = evaluate(&policy, &outcome.scores, &context, trust_score);
        let mut action = eval.action;
        let disagreement_clears_threshold = outcome.disagreement.disagreed_categories.iter().any(|category| {
            let threshold = eval.effective_thresholds.get(*category).copied().unwrap_or(f64::INFINITY);
            outcome.scores.get(category) >= threshold
        });
        if disagreement_clears_threshold {
            action = action.strictest(Action::Escalate);
        }

        let confidence = outcome.scores.iter().map(|(_, v)| v).fold(0.0_f64, f64::max);
        let explanation = if eval.triggered_rules.is_empty() {
            None
        } else {
            Some(eval.triggered_rules.join(", "))
        };

        // 11. atomic decision + MOD-001 (+ POL-001 when a real policy applied)
        let decision = Decision::new(
            submission.id,
            outcome.model_name.clone(),
            outcome.model_version.clone(),
            &outcome.scores,
            (!policy.is_synthetic()).then_some(policy.id),
            (!policy.is_synthetic()).then_some(policy.version),
            action,
            Some(confidence),
            explanation.clone(),
            request.correlation_id,
        );

        let mut specs = vec![EvidenceSpec {
            control_id: ControlTag::Mod001,
            policy_id: decision.policy_id,
            policy_version: decision.policy_version,
            decision_id: Some(decision.id),
            model_name: Some(decision.model_name.clone()),
            model_version: Some(decision.model_version.clone()),
            category_scores: Some(outcome.scores),
            automated_action: Some(action),
            submission_hash: Some(content_hash.clone()),
            ..Default::default()
        }];
        if !policy.is_synthetic() {
            specs.push(EvidenceSpec {
                control_id: ControlTag::Pol001,
                policy_id: Some(policy.id),
                policy_version: Some(policy.version),
                decision_id: Some(decision.id),
                automated_action: Some(action),
                ..Default::default()
            });
        }

        write_decision_with_evidence(&self.pool, &decision, specs).await?;

        let requires_review = decision.needs_review();

        let result = ModerationResult {
            decision_id: decision.id,
            submission_id: submission.id,
            action,
            category_scores: decision.scores(),
            confidence: decision.confidence,
            explanation,
            policy_applied: (!policy.is_synthetic()).then(|| policy.name.clone()),
            policy_version: decision.policy_version,
            requires_review,
            detected_language: detection.language,
        };

        Ok((decision, result, user_id))
    }

    async fn notify(&self, decision: &Decision, requires_review: bool, user_id: Option<String>) {
        let payload = serde_json::json!({
            "decision_id": decision.id,
            "submission_id": decision.submission_id,
            "action": decision.automated_action.as_str(),
        });

        if let Err(err) = self
            .dispatcher
            .dispatch(&self.pool, &self.subscriptions, modkit_domain::EventType::ModerationCompleted, payload.clone())
            .await
        {
            tracing::warn!(error = %err, "moderation.completed webhook dispatch failed");
        }

        if requires_review {
            if let Err(err) = self
                .dispatcher
                .dispatch(&self.pool, &self.subscriptions, modkit_domain::EventType::ReviewRequired, payload)
                .await
            {
                tracing::warn!(error = %err, "review.required webhook dispatch failed");
            }
        }

        if let Some(uid) = user_id {
            if let Err(err) = TrustScorer::new(&self.pool).record_outcome(&uid, decision.automated_action).await {
                tracing::warn!(error = %err, "trust counter update failed");
            }
        }
    }
}
