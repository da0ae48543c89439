//! Authentication Strategies
//!
//! Two ways to authenticate a Google API request:
//! - `OAuth2Strategy`: bearer token from the managed OAuth2 credential
//! - `ServiceAccountStrategy`: signed JWT assertion exchanged for a token

pub mod credentials;
pub mod jwt;
pub mod token;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use std::sync::Arc;
use tracing::debug;

pub use credentials::{CredentialStore, CredentialType, ServiceAccountCredentials, StaticCredentialStore};
pub use jwt::KeyIdPolicy;

use crate::common::AppResult;
use crate::config::{Authentication, Config};
use jwt::Claims;
use token::TokenCache;

/// Attaches credentials to an outgoing request.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Credential type this strategy draws from.
    fn credential_type(&self) -> CredentialType;

    /// Authorize `request`. `http` is available for token round-trips.
    async fn authorize(
        &self,
        http: &reqwest::Client,
        request: RequestBuilder,
    ) -> AppResult<RequestBuilder>;
}

/// Build the strategy selected by `authentication`.
pub fn strategy_for(
    authentication: Authentication,
    config: &Config,
    store: Arc<dyn CredentialStore>,
) -> Box<dyn AuthStrategy> {
    match authentication {
        Authentication::OAuth2 => Box::new(OAuth2Strategy::new(store)),
        Authentication::ServiceAccount => {
            let strategy = ServiceAccountStrategy::new(store, config.token_endpoint.clone())
                .with_key_id(config.key_id);
            if config.cache_tokens {
                Box::new(strategy.with_cache())
            } else {
                Box::new(strategy)
            }
        }
    }
}

/// Managed OAuth2 credential; the store owns refresh.
pub struct OAuth2Strategy {
    store: Arc<dyn CredentialStore>,
}

impl OAuth2Strategy {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthStrategy for OAuth2Strategy {
    fn credential_type(&self) -> CredentialType {
        CredentialType::GmailOAuth2
    }

    async fn authorize(
        &self,
        _http: &reqwest::Client,
        request: RequestBuilder,
    ) -> AppResult<RequestBuilder> {
        let token = self.store.oauth2_token().await?;
        Ok(request.bearer_auth(token))
    }
}

/// Service account JWT bearer flow.
///
/// Without a cache every request signs a fresh assertion and performs one
/// token exchange.
pub struct ServiceAccountStrategy {
    store: Arc<dyn CredentialStore>,
    token_endpoint: String,
    key_id: KeyIdPolicy,
    cache: Option<TokenCache>,
}

impl ServiceAccountStrategy {
    pub fn new(store: Arc<dyn CredentialStore>, token_endpoint: String) -> Self {
        Self {
            store,
            token_endpoint,
            key_id: KeyIdPolicy::default(),
            cache: None,
        }
    }

    pub fn with_key_id(mut self, key_id: KeyIdPolicy) -> Self {
        self.key_id = key_id;
        self
    }

    pub fn with_cache(mut self) -> Self {
        self.cache = Some(TokenCache::new());
        self
    }

    /// Obtain an access token for the stored service account.
    pub async fn access_token(&self, http: &reqwest::Client) -> AppResult<String> {
        let credentials = self.store.service_account().await?.normalized();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims::new(&credentials, &self.token_endpoint, now);

        if let Some(cache) = &self.cache {
            if let Some(token) = cache.get(&claims.iss, &claims.sub, now).await {
                debug!("Using cached access token for {}", claims.sub);
                return Ok(token);
            }
        }

        let assertion = jwt::sign_assertion(&credentials, &claims, self.key_id)?;
        let token = token::exchange_assertion(http, &self.token_endpoint, &assertion).await?;

        if let Some(cache) = &self.cache {
            cache
                .insert(&claims.iss, &claims.sub, token.access_token.clone(), claims.exp)
                .await;
        }

        Ok(token.access_token)
    }
}

#[async_trait]
impl AuthStrategy for ServiceAccountStrategy {
    fn credential_type(&self) -> CredentialType {
        CredentialType::GoogleApi
    }

    async fn authorize(
        &self,
        http: &reqwest::Client,
        request: RequestBuilder,
    ) -> AppResult<RequestBuilder> {
        let token = self.access_token(http).await?;
        Ok(request.bearer_auth(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../fixtures/test_key.pem");

    fn store() -> Arc<dyn CredentialStore> {
        Arc::new(StaticCredentialStore::new().with_service_account(
            ServiceAccountCredentials::new("sa@project.iam.gserviceaccount.com", TEST_KEY),
        ))
    }

    #[test]
    fn test_strategy_for_selects_credential_type() {
        let config = Config::default();
        let oauth = strategy_for(Authentication::OAuth2, &config, store());
        assert_eq!(oauth.credential_type(), CredentialType::GmailOAuth2);

        let service = strategy_for(Authentication::ServiceAccount, &config, store());
        assert_eq!(service.credential_type(), CredentialType::GoogleApi);
        assert_eq!(service.credential_type().as_str(), "googleApi");
    }

    async fn token_server(expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.service",
                "expires_in": 3599
            })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_every_call_exchanges_without_cache() {
        let server = token_server(2).await;
        let strategy = ServiceAccountStrategy::new(store(), format!("{}/token", server.uri()));
        let http = reqwest::Client::new();

        assert_eq!(strategy.access_token(&http).await.unwrap(), "ya29.service");
        assert_eq!(strategy.access_token(&http).await.unwrap(), "ya29.service");
    }

    #[tokio::test]
    async fn test_cache_reuses_token() {
        let server = token_server(1).await;
        let strategy =
            ServiceAccountStrategy::new(store(), format!("{}/token", server.uri())).with_cache();
        let http = reqwest::Client::new();

        strategy.access_token(&http).await.unwrap();
        strategy.access_token(&http).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_service_account_fails_before_exchange() {
        let server = token_server(0).await;
        let strategy = ServiceAccountStrategy::new(
            Arc::new(StaticCredentialStore::new()),
            format!("{}/token", server.uri()),
        );

        let err = strategy
            .access_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("googleApi"));
    }
}
