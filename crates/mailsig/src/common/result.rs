//! Common Result Type

use super::error::RequestFailure;

/// Result of request plumbing that has not yet been classified.
///
/// The dispatcher turns the error side into an `ApiError`.
pub type AppResult<T> = Result<T, RequestFailure>;
