//! Configuration management
//!
//! Reads `~/.mailsig/config.json` (or an explicit path) and applies
//! environment overrides. A missing default file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::auth::jwt::KeyIdPolicy;
use crate::common::paths;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

const ENV_API_BASE: &str = "MAILSIG_API_BASE";
const ENV_TOKEN_ENDPOINT: &str = "MAILSIG_TOKEN_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    HomeDirUnavailable,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Which credential the dispatcher authenticates with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authentication {
    /// Managed OAuth2 credential (`gmailOAuth2`)
    #[default]
    #[serde(rename = "oAuth2")]
    OAuth2,
    /// Service account JWT bearer flow (`googleApi`)
    #[serde(rename = "serviceAccount")]
    ServiceAccount,
}

impl FromStr for Authentication {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "oAuth2" | "oauth2" => Ok(Self::OAuth2),
            "serviceAccount" | "service-account" => Ok(Self::ServiceAccount),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown authentication mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub authentication: Authentication,
    pub api_base: String,
    pub token_endpoint: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Service account key file (Google JSON key format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegated_email: Option<String>,
    pub key_id: KeyIdPolicy,
    pub cache_tokens: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authentication: Authentication::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            credentials_path: None,
            delegated_email: None,
            key_id: KeyIdPolicy::default(),
            cache_tokens: false,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; the default `~/.mailsig/config.json`
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = paths::config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(ENV_API_BASE).filter(|v| !v.is_empty()) {
            self.api_base = base;
        }
        if let Some(endpoint) = lookup(ENV_TOKEN_ENDPOINT).filter(|v| !v.is_empty()) {
            self.token_endpoint = endpoint;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.authentication, Authentication::OAuth2);
        assert_eq!(config.api_base, "https://www.googleapis.com");
        assert_eq!(config.token_endpoint, "https://oauth2.googleapis.com/token");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.cache_tokens);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"authentication": "serviceAccount", "timeoutSecs": 5}"#).unwrap();
        assert_eq!(config.authentication, Authentication::ServiceAccount);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.key_id, KeyIdPolicy::PrivateKey);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MAILSIG_API_BASE", "http://127.0.0.1:9000"),
            ("MAILSIG_TOKEN_ENDPOINT", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base, "http://127.0.0.1:9000");
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
    }

    #[test]
    fn test_authentication_from_str() {
        assert_eq!("oAuth2".parse::<Authentication>().unwrap(), Authentication::OAuth2);
        assert_eq!(
            "service-account".parse::<Authentication>().unwrap(),
            Authentication::ServiceAccount
        );
        assert!("apiKey".parse::<Authentication>().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/mailsig.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
