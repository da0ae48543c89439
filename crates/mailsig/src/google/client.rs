//! Google API Authenticated HTTP Client
//!
//! Dispatches a single request against the Google API host through the
//! configured authentication strategy and classifies any failure into an
//! `ApiError`. No retries.

use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::{self, AuthStrategy, CredentialStore};
use crate::common::{classify, create_http_client, ApiError, AppResult, RequestFailure};
use crate::config::{Authentication, Config};

/// Options for one API request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Path appended to the API base, e.g. `/gmail/v1/users/me/labels`
    pub endpoint: String,
    /// Full URI; wins over `endpoint` when set
    pub uri: Option<String>,
    /// JSON body; `{}` or `null` means no body at all
    pub body: Value,
    /// Query parameters; arrays are sent as repeated keys
    pub qs: Map<String, Value>,
    pub headers: Vec<(String, String)>,
}

/// Option bag merged over `RequestOptions` last. Each field that is set
/// replaces the corresponding option wholesale.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub method: Option<Method>,
    pub uri: Option<String>,
    pub body: Option<Value>,
    pub qs: Option<Map<String, Value>>,
    pub headers: Option<Vec<(String, String)>>,
}

impl RequestOptions {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            uri: None,
            body: Value::Object(Map::new()),
            qs: Map::new(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.qs.insert(key.into(), value.into());
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn merge(mut self, overrides: RequestOverrides) -> Self {
        if let Some(method) = overrides.method {
            self.method = method;
        }
        if let Some(uri) = overrides.uri {
            self.uri = Some(uri);
        }
        if let Some(body) = overrides.body {
            self.body = body;
        }
        if let Some(qs) = overrides.qs {
            self.qs = qs;
        }
        if let Some(headers) = overrides.headers {
            self.headers = headers;
        }
        self
    }

    fn url(&self, api_base: &str) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => format!("{}{}", api_base, self.endpoint),
        }
    }

    fn has_body(&self) -> bool {
        match &self.body {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

/// Flatten a query map into pairs, repeating the key for each array element.
pub fn encode_query(qs: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(qs.len());

    for (key, value) in qs {
        match value {
            Value::Array(values) => {
                for v in values {
                    if let Some(s) = query_value(v) {
                        pairs.push((key.clone(), s));
                    }
                }
            }
            other => {
                if let Some(s) = query_value(other) {
                    pairs.push((key.clone(), s));
                }
            }
        }
    }

    pairs
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Google API HTTP client with pluggable authentication
pub struct GoogleClient {
    client: Client,
    api_base: String,
    auth: Box<dyn AuthStrategy>,
}

impl GoogleClient {
    pub fn new(config: &Config, auth: Box<dyn AuthStrategy>) -> AppResult<Self> {
        let client = create_http_client(config.timeout(), config.connect_timeout())?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Client authenticating with `authentication`, drawing credentials from `store`.
    pub fn with_store(
        config: &Config,
        authentication: Authentication,
        store: Arc<dyn CredentialStore>,
    ) -> AppResult<Self> {
        Self::new(config, auth::strategy_for(authentication, config, store))
    }

    /// Send a request; failures are classified for `resource`.
    pub async fn request(&self, resource: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.dispatch(options).await.map_err(|failure| {
            error!("Google API request failed: {}", failure);
            classify(failure, resource)
        })
    }

    fn build(&self, options: &RequestOptions) -> RequestBuilder {
        let url = options.url(&self.api_base);
        debug!("{} {} ({})", options.method, url, self.auth.credential_type());

        let mut builder = self.client.request(options.method.clone(), url);

        let query = encode_query(&options.qs);
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if options.has_body() {
            builder = builder.body(options.body.to_string());
        }

        builder
    }

    async fn dispatch(&self, options: RequestOptions) -> AppResult<Value> {
        let builder = self.build(&options);
        let builder = self.auth.authorize(&self.client, builder).await?;

        let response = builder
            .send()
            .await
            .map_err(|e| RequestFailure::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        debug!("Response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| RequestFailure::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(RequestFailure::from_response(status.as_u16(), body));
        }

        // Empty successful responses (e.g., DELETE)
        if body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&body).map_err(|e| {
            RequestFailure::Transport(format!("Failed to parse JSON response: {} (body: {})", e, body))
        })
    }
}
