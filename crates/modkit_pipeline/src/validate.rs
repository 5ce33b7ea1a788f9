//! Request validation: content length, `source` shape,
//! and `context` size/shape, all enforced at the pipeline boundary before
//! anything is normalized or persisted.

use serde_json::Value;
use thiserror::Error;

/// A generous content-length ceiling used in this crate's own tests; the
/// deployment's actual limit is `MAX_CONTENT_LENGTH`, passed into [`validate_content`] by the caller.
pub const MAX_CONTENT_LEN: usize = 50_000;
pub const MAX_SOURCE_LEN: usize = 100;
pub const MAX_CONTEXT_KEYS: usize = 10;
pub const MAX_CONTEXT_BYTES: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content exceeds the configured maximum length")]
    ContentTooLong,
    #[error("content must not be empty")]
    ContentEmpty,
    #[error("source must match ^[A-Za-z0-9-]+$ and be at most {MAX_SOURCE_LEN} characters")]
    InvalidSource,
    #[error("context must have at most {MAX_CONTEXT_KEYS} keys")]
    ContextTooManyKeys,
    #[error("context must serialize to at most {MAX_CONTEXT_BYTES} bytes")]
    ContextTooLarge,
    #[error("context must be a JSON object")]
    ContextNotAnObject,
}

/// `max_len` comes from the deployment's `MAX_CONTENT_LENGTH` setting
///; [`MAX_CONTENT_LEN`] is only the hard upper
/// bound used when no override is configured.
pub fn validate_content(content: &str, max_len: usize) -> Result<(), ValidationError> {
    if content.is_empty() {
        return Err(ValidationError::ContentEmpty);
    }
    if content.chars().count() > max_len {
        return Err(ValidationError::ContentTooLong);
    }
    Ok(())
}

pub fn validate_source(source: Option<&str>) -> Result<(), ValidationError> {
    let Some(source) = source else { return Ok(()) };
    if source.is_empty() || source.len() > MAX_SOURCE_LEN {
        return Err(ValidationError::InvalidSource);
    }
    if !source.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidSource);
    }
    Ok(())
}

pub fn validate_context(context: &Value) -> Result<(), ValidationError> {
    let Some(map) = context.as_object() else {
        return Err(ValidationError::ContextNotAnObject);
    };
    if map.len() > MAX_CONTEXT_KEYS {
        return Err(ValidationError::ContextTooManyKeys);
    }
    let serialized = serde_json::to_vec(context).map_err(|_| ValidationError::ContextNotAnObject)?;
    if serialized.len() > MAX_CONTEXT_BYTES {
        return Err(ValidationError::ContextTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_rejected() {
        assert_eq!(validate_content("", MAX_CONTENT_LEN), Err(ValidationError::ContentEmpty));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let content = "a".repeat(MAX_CONTENT_LEN + 1);
        assert_eq!(validate_content(&content, MAX_CONTENT_LEN), Err(ValidationError::ContentTooLong));
    }

    #[test]
    fn content_at_configured_max_succeeds_one_over_fails() {
        let at_max = "a".repeat(100);
        let over_max = "a".repeat(101);
        assert!(validate_content(&at_max, 100).is_ok());
        assert_eq!(validate_content(&over_max, 100), Err(ValidationError::ContentTooLong));
    }

    #[test]
    fn source_rejects_non_matching_characters() {
        assert!(validate_source(Some("api_gateway")).is_err());
        assert!(validate_source(Some("api-gateway-1")).is_ok());
        assert!(validate_source(None).is_ok());
    }

    #[test]
    fn context_enforces_key_count_and_byte_size() {
        let too_many: Value = serde_json::json!({
            "a":1,"b":2,"c":3,"d":4,"e":5,"f":6,"g":7,"h":8,"i":9,"j":10,"k":11
        });
        assert_eq!(validate_context(&too_many), Err(ValidationError::ContextTooManyKeys));

        let too_big = serde_json::json!({"blob": "x".repeat(2000)});
        assert_eq!(validate_context(&too_big), Err(ValidationError::ContextTooLarge));

        assert!(validate_context(&serde_json::json!({"user_id": "u1"})).is_ok());
    }

    #[test]
    fn context_must_be_an_object() {
        assert_eq!(
            validate_context(&serde_json::json!([1, 2, 3])),
            Err(ValidationError::ContextNotAnObject)
        );
    }
}
