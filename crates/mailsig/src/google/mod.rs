//! Google API Client Module
//!
//! Authenticated access to the Gmail API.

pub mod client;
pub mod common;
pub mod signature;

pub use client::{GoogleClient, RequestOptions, RequestOverrides};
pub use signature::SignatureApi;
