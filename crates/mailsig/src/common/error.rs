//! Error Types
//!
//! Raw request failures and their classification into user-facing API errors.
//! Everything that goes wrong while dispatching a Google API request is first
//! captured as a [`RequestFailure`], then [`classify`]-ed into an [`ApiError`]
//! at the dispatcher boundary.

use serde::Serialize;
use std::fmt;

const BAD_REQUEST_MESSAGE: &str = "Bad request - please check your parameters";
const INVALID_ID_CAUSE: &str = "Invalid id value";
const EXAMPLE_RESOURCE_ID: &str = "182b676d244938bd";

/// A failure observed while building or sending a request, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestFailure {
    /// The signer could not parse the service account private key.
    KeyFormat(String),

    /// The API answered with a non-success status.
    Http {
        status: u16,
        /// `error.message` from the Google error envelope, if present
        cause: Option<String>,
        body: String,
    },

    /// Credentials were missing or the token endpoint refused the assertion.
    Authorization {
        message: String,
        error_description: Option<String>,
    },

    /// Network failure or an undecodable response body.
    Transport(String),
}

impl RequestFailure {
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            error_description: None,
        }
    }

    /// Build an HTTP failure from a raw response body, pulling the cause out
    /// of Google's `{"error": {"code": .., "message": ..}}` envelope.
    pub fn from_response(status: u16, body: String) -> Self {
        let cause = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|parsed| {
                let error = parsed.get("error")?;
                error
                    .get("message")
                    .and_then(|v| v.as_str())
                    .or_else(|| error.as_str())
                    .map(String::from)
            });

        Self::Http {
            status,
            cause,
            body,
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFormat(detail) => write!(f, "Invalid private key: {}", detail),
            Self::Http { status, cause, .. } => match cause {
                Some(cause) => write!(f, "HTTP {}: {}", status, cause),
                None => write!(f, "HTTP {}", status),
            },
            Self::Authorization { message, .. } => f.write_str(message),
            Self::Transport(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for RequestFailure {}

/// Classified error kinds, listed in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    KeyFormat,
    InvalidResourceId,
    NotFound,
    Authorization,
    BadParameters,
    Generic,
}

/// Uniform domain error returned by the request dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiError {
    fn new(
        kind: ErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            description: description.filter(|d| !d.is_empty()),
        }
    }

    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            ErrorKind::Generic,
            None,
            format!("Missing required parameter '{}'", name),
            None,
        )
    }
}

/// Classify a raw failure for the given resource (e.g. "signature").
pub fn classify(failure: RequestFailure, resource: &str) -> ApiError {
    match failure {
        RequestFailure::KeyFormat(detail) => ApiError::new(
            ErrorKind::KeyFormat,
            Some(401),
            status_message(401),
            Some(detail),
        ),

        RequestFailure::Http {
            status: 400,
            cause: Some(cause),
            ..
        } if cause.contains(INVALID_ID_CAUSE) => ApiError::new(
            ErrorKind::InvalidResourceId,
            Some(400),
            format!("Invalid {} ID", resource),
            Some(format!(
                "{} IDs should look something like this: {}",
                capitalize(resource),
                EXAMPLE_RESOURCE_ID
            )),
        ),

        RequestFailure::Http { status: 404, .. } => {
            let message = if resource == "signature" {
                "email Address not found".to_string()
            } else {
                format!("{} not found", capitalize(resource))
            };
            ApiError::new(ErrorKind::NotFound, Some(404), message, None)
        }

        RequestFailure::Authorization {
            message,
            error_description,
        } => ApiError::new(
            ErrorKind::Authorization,
            None,
            error_description.unwrap_or_else(|| "Authorization error".to_string()),
            Some(message),
        ),

        RequestFailure::Http {
            status,
            cause,
            body,
        } => {
            let message = status_message(status);
            let description = cause.or_else(|| Some(body).filter(|b| !b.trim().is_empty()));

            match description {
                Some(description) if message.contains(BAD_REQUEST_MESSAGE) => {
                    ApiError::new(ErrorKind::BadParameters, Some(status), description, None)
                }
                description => ApiError::new(ErrorKind::Generic, Some(status), message, description),
            }
        }

        RequestFailure::Transport(message) => {
            ApiError::new(ErrorKind::Generic, None, message, None)
        }
    }
}

/// Default user-facing message for an HTTP status.
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => BAD_REQUEST_MESSAGE,
        401 => "Authorization failed - please check your credentials",
        403 => "Forbidden - perhaps check your credentials?",
        404 => "The resource you are requesting could not be found",
        405 => "Method not allowed - please check you are using the right HTTP method",
        429 => "The service is receiving too many requests from you",
        500 => "The service was not able to process your request",
        502 => "Bad gateway - the service failed to handle your request",
        503 => "Service unavailable - try again later",
        504 => "Gateway timed out - perhaps try again later?",
        500..=599 => "The service failed to process your request",
        _ => "Your request is invalid or could not be processed by the service",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
