//! modkit_domain
//!
//! The data model of the moderation service, expressed as plain
//! Rust types. `CategoryScores` is a closed, fixed-field record rather than
//! an open map — per design note, implementers should prefer explicit
//! fields even though the wire format is an open JSON object; unknown
//! incoming categories are ignored and absent fields default to 0.

pub mod action;
pub mod calibration;
pub mod decision;
pub mod evidence;
pub mod policy;
pub mod review;
pub mod scores;
pub mod submission;
pub mod trust;
pub mod user;
pub mod webhook;

pub use action::Action;
pub use calibration::{CalibrationData, ReviewOutcome};
pub use decision::Decision;
pub use evidence::{ControlTag, EvidenceRecord};
pub use policy::{ContextOverrideRule, Policy, PolicyScope, PolicyStatus};
pub use review::{ReviewAction, ReviewActionKind};
pub use scores::CategoryScores;
pub use submission::Submission;
pub use trust::UserBehaviorStats;
pub use user::{Role, User};
pub use webhook::{EventType, WebhookDelivery, WebhookSubscription};
