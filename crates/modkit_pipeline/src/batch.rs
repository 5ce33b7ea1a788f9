//! `/moderate/batch`: bounded worker pool, partial failures do
//! not fail the batch. Per-item webhook/trust notifications are skipped —
//! see the coordinator crate's open-question note in the repo's design
//! ledger.

use crate::coordinator::{Coordinator, ModerationRequest, ModerationResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

pub const MAX_BATCH_ITEMS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch exceeds {MAX_BATCH_ITEMS} items")]
    TooManyItems,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub allowed: usize,
    pub warned: usize,
    pub blocked: usize,
    pub escalated: usize,
    pub failed: usize,
}

pub struct BatchItemResult {
    pub result: Option<ModerationResult>,
    pub error: Option<String>,
}

/// Runs every request through [`Coordinator::moderate_quiet`] under a
/// bounded worker pool, skipping per-item webhook/trust notifications to
/// keep batch throughput bounded.
pub async fn moderate_batch(
    coordinator: Arc<Coordinator>,
    requests: Vec<ModerationRequest>,
    concurrency: usize,
) -> Result<(Vec<BatchItemResult>, BatchSummary), BatchError> {
    if requests.len() > MAX_BATCH_ITEMS {
        return Err(BatchError::TooManyItems);
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(requests.len());

    for request in requests {
        let coordinator = coordinator.clone();
        let semaphore = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            coordinator.moderate_quiet(request).await
        }));
    }

    let mut summary = BatchSummary { total: handles.len(), ..Default::default() };
    let mut results = Vec::with_capacity(handles.len());

    for handle in handles {
        match handle.await {
            Ok(Ok(result)) => {
                tally(&mut summary, &result);
                results.push(BatchItemResult { result: Some(result), error: None });
            }
            Ok(Err(err)) => {
                summary.failed += 1;
                results.push(BatchItemResult { result: None, error: Some(err.to_string()) });
            }
            Err(join_err) => {
                summary.failed += 1;
                results.push(BatchItemResult { result: None, error: Some(join_err.to_string()) });
            }
        }
    }

    Ok((results, summary))
}

fn tally(summary: &mut BatchSummary, result: &ModerationResult) {
    use modkit_domain::Action;
    match result.action {
        Action::Allow => summary.allowed += 1,
        Action::Warn => summary.warned += 1,
        Action::Block => summary.blocked += 1,
        Action::Escalate => summary.escalated += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit_domain::{Action, CategoryScores};
    use uuid::Uuid;

    fn result_with(action: Action) -> ModerationResult {
        ModerationResult {
            decision_id: Uuid::new_v4(),
            submission_id: Uuid::new_v4(),
            action,
            category_scores: CategoryScores::default(),
            confidence: None,
            explanation: None,
            policy_applied: None,
            policy_version: None,
            requires_review: action == Action::Escalate,
            detected_language: "en".into(),
        }
    }

    #[test]
    fn tally_buckets_by_action() {
        let mut summary = BatchSummary::default();
        tally(&mut summary, &result_with(Action::Allow));
        tally(&mut summary, &result_with(Action::Block));
        tally(&mut summary, &result_with(Action::Escalate));
        tally(&mut summary, &result_with(Action::Warn));
        assert_eq!(summary.allowed, 1);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.escalated, 1);
        assert_eq!(summary.warned, 1);
    }
}
