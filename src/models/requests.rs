//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

/// Request body for the PUT operation (PUT /cache/:section/:key)
///
/// # Fields
/// - `value`: The value to store, required
/// - `ttl_ms`: Optional TTL in milliseconds (uses the backend default if not specified)
/// - `if_absent`: Only store when no live entry exists
#[derive(Debug, Clone, Deserialize)]
pub struct PutRequest {
    /// The value to store
    #[serde(default)]
    pub value: Option<String>,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Skip the write if the key is already live
    #[serde(default)]
    pub if_absent: bool,
}

impl PutRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.value.is_none() {
            return Some("Value is required".to_string());
        }
        if self.ttl_ms == Some(0) {
            return Some("ttl_ms must be greater than zero".to_string());
        }
        None
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_request_deserialize() {
        let json = r#"{"value": "hello"}"#;
        let req: PutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.value.as_deref(), Some("hello"));
        assert!(req.ttl_ms.is_none());
        assert!(!req.if_absent);
    }

    #[test]
    fn test_put_request_with_ttl() {
        let json = r#"{"value": "hello", "ttl_ms": 60000, "if_absent": true}"#;
        let req: PutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Some(Duration::from_secs(60)));
        assert!(req.if_absent);
    }

    #[test]
    fn test_validate_missing_value() {
        let req: PutRequest = serde_json::from_str(r#"{"ttl_ms": 5}"#).unwrap();
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let req = PutRequest {
            value: Some("v".to_string()),
            ttl_ms: Some(0),
            if_absent: false,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = PutRequest {
            value: Some("test".to_string()),
            ttl_ms: Some(60),
            if_absent: false,
        };
        assert!(req.validate().is_none());
    }
}
