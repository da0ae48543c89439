//! Common Utilities
//!
//! Shared error handling, HTTP client construction and path helpers.

pub mod error;
pub mod http;
pub mod paths;
pub mod result;

pub use error::{classify, ApiError, ErrorKind, RequestFailure};
pub use http::create_http_client;
pub use result::AppResult;
