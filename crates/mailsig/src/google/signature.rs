//! Gmail send-as signature settings
//!
//! - Set the signature of a send-as alias
//! - Read the send-as alias back

use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;

use super::client::{GoogleClient, RequestOptions};
use crate::common::ApiError;

/// Resource name used when classifying errors.
pub const RESOURCE: &str = "signature";

pub struct SignatureApi {
    client: GoogleClient,
}

impl SignatureApi {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }

    /// Set the signature of the primary send-as alias of `email`.
    ///
    /// # Returns
    /// The updated SendAs resource
    pub async fn set(&self, email: &str, signature: &str) -> Result<Value, ApiError> {
        info!("Setting signature for {}", email);

        let options = RequestOptions::new(Method::PATCH, send_as_endpoint(email)).body(json!({
            "signature": signature,
            "sendAs": email,
        }));

        self.client.request(RESOURCE, options).await
    }

    /// Fetch the send-as alias of `email`, including its signature.
    pub async fn get(&self, email: &str) -> Result<Value, ApiError> {
        info!("Fetching signature for {}", email);

        self.client
            .request(RESOURCE, RequestOptions::new(Method::GET, send_as_endpoint(email)))
            .await
    }
}

fn send_as_endpoint(email: &str) -> String {
    format!("/gmail/v1/users/{}/settings/sendAs/{}", email, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_as_endpoint() {
        assert_eq!(
            send_as_endpoint("a@b.com"),
            "/gmail/v1/users/a@b.com/settings/sendAs/a@b.com"
        );
    }
}
