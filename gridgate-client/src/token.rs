//! Token payloads exchanged with the auth endpoints.
//!
//! This module provides:
//! - [`TokenPair`] - An access token and (optionally) a refresh token
//! - [`TokenEnvelope`] - Either accepted response shape of the auth endpoints
//! - [`RenewalRequest`] - The body sent to the renewal endpoint

use serde::{Deserialize, Serialize};

use crate::store::Secret;

/// An access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token sent as `Authorization: Bearer <access>`.
    pub access: Secret,

    /// The refresh token used for renewal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<Secret>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access),
            refresh: Some(Secret::new(refresh)),
        }
    }

    /// A pair carrying only an access token.
    pub fn access_only(access: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access),
            refresh: None,
        }
    }
}

/// A token response from the login or renewal endpoint.
///
/// Two shapes are accepted:
/// - flat: `{"access": "...", "refresh": "..."}`
/// - wrapped: `{"data": {"tokens": {"access": "...", "refresh": "..."}}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenEnvelope {
    Wrapped { data: WrappedTokens },
    Flat(TokenPair),
}

/// The `data` member of a wrapped token response.
///
/// Other members of `data` (user profile and the like) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WrappedTokens {
    pub tokens: TokenPair,
}

impl TokenEnvelope {
    /// Unwrap either shape into the token pair.
    pub fn into_pair(self) -> TokenPair {
        match self {
            TokenEnvelope::Wrapped { data } => data.tokens,
            TokenEnvelope::Flat(pair) => pair,
        }
    }
}

/// Body of a renewal request: `{"refresh": "..."}`.
#[derive(Serialize)]
pub struct RenewalRequest<'a> {
    pub refresh: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flat_response() {
        let envelope: TokenEnvelope =
            serde_json::from_value(json!({"access": "a1", "refresh": "r1"})).unwrap();
        assert_eq!(envelope.into_pair(), TokenPair::new("a1", "r1"));
    }

    #[test]
    fn test_parse_wrapped_response() {
        let envelope: TokenEnvelope = serde_json::from_value(json!({
            "data": {"tokens": {"access": "a2", "refresh": "r2"}, "user": {"id": 4}}
        }))
        .unwrap();
        assert_eq!(envelope.into_pair(), TokenPair::new("a2", "r2"));
    }

    #[test]
    fn test_parse_without_refresh() {
        let envelope: TokenEnvelope = serde_json::from_value(json!({"access": "a3"})).unwrap();
        let pair = envelope.into_pair();
        assert_eq!(pair.access.expose(), "a3");
        assert!(pair.refresh.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_access() {
        let result = serde_json::from_value::<TokenEnvelope>(json!({"refresh": "r"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_renewal_request_body() {
        let body = serde_json::to_value(RenewalRequest { refresh: "r1" }).unwrap();
        assert_eq!(body, json!({"refresh": "r1"}));
    }
}
