//! Gmail send-as signature management.
//!
//! [`google::GoogleClient`] dispatches authenticated requests through an
//! [`auth::AuthStrategy`]; [`node::MailSignatureNode`] runs the signature
//! operation over a batch of items.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
pub mod node;

pub use auth::{CredentialStore, ServiceAccountCredentials, StaticCredentialStore};
pub use common::{ApiError, ErrorKind};
pub use config::{Authentication, Config, ConfigError};
pub use google::{GoogleClient, SignatureApi};
pub use node::{MailSignatureNode, NodeError, Operation, OutputItem, Resource};
