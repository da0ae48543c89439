//! Service Account JWT Assertions
//!
//! Builds and signs the RS256 assertion exchanged at Google's token endpoint.
//! See https://developers.google.com/identity/protocols/oauth2/service-account#httprest

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credentials::ServiceAccountCredentials;
use crate::common::{AppResult, RequestFailure};

/// Lifetime of an assertion, in seconds.
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Every assertion requests the full Gmail scope set.
pub const GMAIL_SCOPES: [&str; 8] = [
    "https://www.googleapis.com/auth/gmail.labels",
    "https://www.googleapis.com/auth/gmail.addons.current.action.compose",
    "https://www.googleapis.com/auth/gmail.addons.current.message.action",
    "https://mail.google.com/",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.compose",
    "https://www.googleapis.com/auth/gmail.settings.sharing",
    "https://www.googleapis.com/auth/gmail.settings.basic",
];

/// What goes into the `kid` header of the assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyIdPolicy {
    /// The private key material itself. Matches the assertions issued by
    /// the existing integration.
    #[default]
    PrivateKey,
    /// The key file's `private_key_id`, omitted when the file has none.
    KeyId,
    Omit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Claims for `credentials` (already normalized) issued at `now`.
    pub fn new(credentials: &ServiceAccountCredentials, audience: &str, now: i64) -> Self {
        Self {
            iss: credentials.email.clone(),
            sub: credentials.subject().to_string(),
            scope: GMAIL_SCOPES.join(" "),
            aud: audience.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Sign `claims` with the credentials' private key.
///
/// `credentials` must already be normalized.
pub fn sign_assertion(
    credentials: &ServiceAccountCredentials,
    claims: &Claims,
    key_id: KeyIdPolicy,
) -> AppResult<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| RequestFailure::KeyFormat(e.to_string()))?;

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = match key_id {
        KeyIdPolicy::PrivateKey => Some(credentials.private_key.clone()),
        KeyIdPolicy::KeyId => {
            if credentials.private_key_id.is_none() {
                warn!("Key id requested but credentials have no private_key_id");
            }
            credentials.private_key_id.clone()
        }
        KeyIdPolicy::Omit => None,
    };

    debug!("Signing assertion for {} (sub {})", claims.iss, claims.sub);

    jsonwebtoken::encode(&header, claims, &key).map_err(|e| RequestFailure::KeyFormat(e.to_string()))
}
