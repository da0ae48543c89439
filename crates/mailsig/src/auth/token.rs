//! Token Exchange
//!
//! Trades a signed assertion for a bearer access token at the OAuth2 token
//! endpoint, with an optional in-memory cache.

use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::common::{AppResult, RequestFailure};

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Cached tokens are dropped this many seconds before the assertion expires.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// POST the assertion as form data and decode the token response.
pub async fn exchange_assertion(
    http: &reqwest::Client,
    token_endpoint: &str,
    assertion: &str,
) -> AppResult<AccessToken> {
    debug!("Exchanging assertion at {}", token_endpoint);

    let response = http
        .post(token_endpoint)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
        .send()
        .await
        .map_err(|e| RequestFailure::Transport(format!("Token exchange request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RequestFailure::Transport(format!("Failed to read token response: {}", e)))?;

    if !status.is_success() {
        error!("Token exchange failed with HTTP {}", status);
        let error_description = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error_description")?.as_str().map(String::from));

        return Err(RequestFailure::Authorization {
            message: format!("HTTP {} error: {}", status, body),
            error_description,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| RequestFailure::Transport(format!("Invalid token response: {}", e)))
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Access tokens keyed by `(iss, sub)`.
#[derive(Default)]
pub struct TokenCache {
    entries: Mutex<HashMap<(String, String), CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, issuer: &str, subject: &str, now: i64) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let key = (issuer.to_string(), subject.to_string());

        match entries.get(&key) {
            Some(cached) if cached.expires_at - EXPIRY_SKEW_SECS > now => {
                Some(cached.access_token.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, issuer: &str, subject: &str, access_token: String, expires_at: i64) {
        self.entries.lock().await.insert(
            (issuer.to_string(), subject.to_string()),
            CachedToken {
                access_token,
                expires_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_exchange_posts_form_encoded_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=header.payload.sig"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.service",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchange_assertion(
            &reqwest::Client::new(),
            &format!("{}/token", server.uri()),
            "header.payload.sig",
        )
        .await
        .unwrap();

        assert_eq!(token.access_token, "ya29.service");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn test_exchange_error_is_authorization_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })))
            .mount(&server)
            .await;

        let err = exchange_assertion(&reqwest::Client::new(), &format!("{}/token", server.uri()), "a.b.c")
            .await
            .unwrap_err();

        match err {
            RequestFailure::Authorization {
                error_description, ..
            } => assert_eq!(error_description.as_deref(), Some("Invalid JWT Signature.")),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_access_token_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
            .mount(&server)
            .await;

        let err = exchange_assertion(&reqwest::Client::new(), &server.uri(), "a.b.c")
            .await
            .unwrap_err();
        assert!(matches!(err, RequestFailure::Transport(_)));
    }

    #[tokio::test]
    async fn test_cache_expiry_with_skew() {
        let cache = TokenCache::new();
        cache.insert("sa@x", "u@x", "tok".to_string(), 1_000).await;

        assert_eq!(cache.get("sa@x", "u@x", 900).await.as_deref(), Some("tok"));
        assert_eq!(cache.get("sa@x", "other@x", 900).await, None);
        assert_eq!(cache.get("sa@x", "u@x", 940).await, None);
        // expired entries are evicted
        assert_eq!(cache.get("sa@x", "u@x", 0).await, None);
    }
}
