//! modkit_pipeline
//!
//! The pipeline coordinator: the single place that wires
//! normalization, persistence, caching, language detection, classification,
//! policy evaluation, trust scoring, evidence writing, and notification
//! fan-out into one per-request (or batched) operation.

pub mod batch;
pub mod coordinator;
pub mod validate;

pub use batch::{moderate_batch, BatchError, BatchItemResult, BatchSummary, DEFAULT_CONCURRENCY, MAX_BATCH_ITEMS};
pub use coordinator::{ClassificationMode, Coordinator, ModerationRequest, ModerationResult, PipelineError};
