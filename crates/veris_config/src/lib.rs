#![warn(missing_docs)]
//! Configuration utilities for the Veris node.
//!
//! Config structs derive `Serialize`, `Deserialize` and `validator::Validate`,
//! and implement [`SerializeConfig`] to expose a flat, documented view of
//! every parameter. Operators read the dumped view; the node loads the nested
//! JSON form and validates it before any component sees a value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod dumping;
pub mod loading;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

/// A nested path of a configuration parameter, e.g. `rate_limit.max_total`.
pub type ParamPath = String;

/// Separator between nesting levels of a [`ParamPath`].
pub const FIELD_SEPARATOR: &str = ".";

/// A description and serialized value of a configuration parameter.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SerializedParam {
    /// The description of the parameter.
    pub description: String,
    /// The JSON value of the parameter.
    pub value: Value,
}

/// Errors at the configuration dumping and loading process.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    DeserializationError(#[from] serde_json::Error),
    #[error("Config validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}
