//! EvidenceRecord. Strictly append-only: the storage layer
//! (`modkit_evidence`) rejects any `UPDATE`/`DELETE` against
//! `evidence_records`; this type only describes the row shape.

use crate::action::Action;
use crate::scores::CategoryScores;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Control tags a written evidence row may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlTag {
    /// Automated decision.
    #[default]
    Mod001,
    /// Policy application.
    Pol001,
    /// Human review action.
    Gov002,
    /// Chain record.
    Aud001,
    /// Retention/erasure.
    Sec003,
    /// API key lifecycle event.
    Sec002,
}

impl ControlTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlTag::Mod001 => "MOD-001",
            ControlTag::Pol001 => "POL-001",
            ControlTag::Gov002 => "GOV-002",
            ControlTag::Aud001 => "AUD-001",
            ControlTag::Sec003 => "SEC-003",
            ControlTag::Sec002 => "SEC-002",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MOD-001" => Some(ControlTag::Mod001),
            "POL-001" => Some(ControlTag::Pol001),
            "GOV-002" => Some(ControlTag::Gov002),
            "AUD-001" => Some(ControlTag::Aud001),
            "SEC-003" => Some(ControlTag::Sec003),
            "SEC-002" => Some(ControlTag::Sec002),
            _ => None,
        }
    }
}

modkit_common::sqlx_text_enum!(ControlTag);

impl Serialize for ControlTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ControlTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ControlTag::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown control tag: {s}")))
    }
}

/// The subset of an evidence row's fields that feed the hash chain. Kept
/// separate from `EvidenceRecord` so the chain hash is computed over
/// exactly these fields and nothing else (notably: never over
/// `chain_hash` itself).
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceChainInput<'a> {
    pub control_id: &'a str,
    pub policy_id: Option<Uuid>,
    pub policy_version: Option<i32>,
    pub decision_id: Option<Uuid>,
    pub review_id: Option<Uuid>,
    pub model_name: Option<&'a str>,
    pub model_version: Option<&'a str>,
    pub category_scores: Option<&'a CategoryScores>,
    pub automated_action: Option<Action>,
    pub human_override: Option<bool>,
    pub submission_hash: Option<&'a str>,
    pub previous_hash: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvidenceRecord {
    pub id: Uuid,
    pub control_id: ControlTag,
    pub policy_id: Option<Uuid>,
    pub policy_version: Option<i32>,
    pub decision_id: Option<Uuid>,
    pub review_id: Option<Uuid>,
    pub model_name: Option<String>,
    pub model_version: Option<String>,
    /// Stored as JSON: a serialized `CategoryScores`, when present.
    pub category_scores: Option<serde_json::Value>,
    pub automated_action: Option<Action>,
    pub human_override: Option<bool>,
    pub submission_hash: Option<String>,
    pub chain_hash: String,
    pub previous_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EvidenceRecord {
    /// `chain_hash = SHA-256(previous_hash || canonical_json(chain input))`
    ///. `previous_hash` is folded into the hashed bytes rather
    /// than being a field of the canonicalized struct, so a row's chain
    /// hash is cheap to recompute for verification without re-deriving the
    /// full input structure.
    pub fn compute_chain_hash(
        previous_hash: Option<&str>,
        input: &EvidenceChainInput,
    ) -> Result<String, modkit_common::CanonError> {
        let body = modkit_common::canonical_json_bytes(input)?;
        let mut buf = Vec::with_capacity(body.len() + 64);
        buf.extend_from_slice(previous_hash.unwrap_or("").as_bytes());
        buf.extend_from_slice(&body);
        Ok(modkit_common::sha256_hex(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input(previous: Option<&str>) -> EvidenceChainInput<'_> {
        EvidenceChainInput {
            control_id: "MOD-001",
            policy_id: None,
            policy_version: None,
            decision_id: None,
            review_id: None,
            model_name: Some("ensemble"),
            model_version: Some("1"),
            category_scores: None,
            automated_action: Some(Action::Allow),
            human_override: None,
            submission_hash: Some("abc"),
            previous_hash: previous,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn chain_hash_changes_with_previous_hash() {
        let input = sample_input(None);
        let h1 = EvidenceRecord::compute_chain_hash(None, &input).unwrap();
        let h2 = EvidenceRecord::compute_chain_hash(Some("seed"), &input).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn chain_hash_is_deterministic_for_same_input() {
        let input = sample_input(Some("prev"));
        let h1 = EvidenceRecord::compute_chain_hash(Some("prev"), &input).unwrap();
        let h2 = EvidenceRecord::compute_chain_hash(Some("prev"), &input).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn control_tag_round_trips() {
        for tag in [
            ControlTag::Mod001,
            ControlTag::Pol001,
            ControlTag::Gov002,
            ControlTag::Aud001,
            ControlTag::Sec003,
            ControlTag::Sec002,
        ] {
            assert_eq!(ControlTag::parse(tag.as_str()), Some(tag));
        }
    }
}
