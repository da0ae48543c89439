//! Mail Signature Node
//!
//! Runs the signature operation once per input item, sequentially. Each item
//! is independent: with continue-on-fail an item error becomes an error
//! record, otherwise the first error aborts the batch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::common::ApiError;
use crate::config::ConfigError;
use crate::google::common::unescape_snippet;
use crate::google::SignatureApi;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    #[default]
    Signature,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    #[default]
    Set,
    Get,
}

impl FromStr for Resource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signature" => Ok(Self::Signature),
            other => Err(ConfigError::InvalidValue(format!("unknown resource '{}'", other))),
        }
    }
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "get" => Ok(Self::Get),
            other => Err(ConfigError::InvalidValue(format!("unknown operation '{}'", other))),
        }
    }
}

/// One output record, tagged with the index of the input item it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputItem {
    pub json: Value,
    #[serde(rename = "pairedItem")]
    pub paired_item: usize,
}

/// Item failure that aborted the batch.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct NodeError {
    pub message: String,
    pub description: Option<String>,
    pub item_index: usize,
}

pub struct MailSignatureNode {
    api: SignatureApi,
    resource: Resource,
    operation: Operation,
    continue_on_fail: bool,
}

impl MailSignatureNode {
    pub fn new(api: SignatureApi, resource: Resource, operation: Operation) -> Self {
        Self {
            api,
            resource,
            operation,
            continue_on_fail: false,
        }
    }

    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    /// Execute the operation for each item.
    ///
    /// Items carry their parameters as JSON: `email` and, for `set`,
    /// `sigValue`.
    pub async fn execute(&self, items: &[Value]) -> Result<Vec<OutputItem>, NodeError> {
        let mut output = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            match self.execute_item(item).await {
                Ok(response) => {
                    output.extend(
                        into_records(response).map(|json| OutputItem {
                            json,
                            paired_item: index,
                        }),
                    );
                }
                Err(err) => {
                    let message = format!("{} (item {})", err.message, index);

                    if self.continue_on_fail {
                        warn!("Continuing after failure: {}", message);
                        output.push(OutputItem {
                            json: json!({ "error": message }),
                            paired_item: index,
                        });
                        continue;
                    }

                    return Err(NodeError {
                        message,
                        description: err.description,
                        item_index: index,
                    });
                }
            }
        }

        if self.resource == Resource::Signature && self.operation == Operation::Get {
            for record in &mut output {
                unescape_snippet(&mut record.json);
            }
        }

        debug!("Produced {} output records", output.len());
        Ok(output)
    }

    async fn execute_item(&self, item: &Value) -> Result<Value, ApiError> {
        match (self.resource, self.operation) {
            (Resource::Signature, Operation::Set) => {
                let email = parameter(item, "email")?;
                let signature = parameter(item, "sigValue")?;
                self.api.set(email, signature).await
            }
            (Resource::Signature, Operation::Get) => {
                let email = parameter(item, "email")?;
                self.api.get(email).await
            }
        }
    }
}

fn parameter<'a>(item: &'a Value, name: &str) -> Result<&'a str, ApiError> {
    item.get(name)
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_parameter(name))
}

/// Arrays fan out into one record each; anything else is a single record.
fn into_records(response: Value) -> Box<dyn Iterator<Item = Value>> {
    match response {
        Value::Array(values) => Box::new(values.into_iter()),
        other => Box::new(std::iter::once(other)),
    }
}
