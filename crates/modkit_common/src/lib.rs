//! modkit_common
//!
//! Canonical JSON serialization + SHA-256 hashing utilities, shared across
//! every crate that needs deterministic hashes:
//! - evidence hash chain entries
//! - content hashes for submissions / classification cache keys
//! - webhook payload signing
//!
//! IMPORTANT: never "pretty print" before hashing. Hashes are computed over
//! canonical bytes (sorted keys, no whitespace, UTF-8) so the same logical
//! value always hashes the same way regardless of field insertion order.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub mod error;

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize to canonical JSON bytes: stable key ordering, no whitespace.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let v = serde_json::to_value(value)?;
    let sorted = sort_json_value(v);
    Ok(serde_json::to_vec(&sorted)?)
}

/// Hex-encoded SHA-256 of the canonical JSON encoding of `value` (no prefix).
pub fn sha256_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Hex-encoded SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Content hash of a normalized text string, as stored on `Submission.content_hash`.
pub fn content_hash(normalized_text: &str) -> String {
    sha256_hex(normalized_text.as_bytes())
}

fn sort_json_value(v: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k, sort_json_value(v));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json_value).collect()),
        other => other,
    }
}

/// Clamp a score into `[0, 1]`.
pub fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Implements `sqlx::Type`/`Encode`/`Decode` for a C-like enum backed by a
/// plain Postgres `TEXT` column, going through `$ty::as_str()` /
/// `$ty::parse()`. Used for every enum-valued domain column so the schema
/// never needs a `CREATE TYPE ... AS ENUM` migration per enum.
#[macro_export]
macro_rules! sqlx_text_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                <$ty>::parse(s).ok_or_else(|| format!("unknown {}: {s}", stringify!($ty)).into())
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}
