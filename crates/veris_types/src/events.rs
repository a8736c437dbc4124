use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

/// Event emitted when the rate limiter rejects a transaction.
pub const EVENT_RATE_LIMIT_EXCEEDED: &str = "rate_limit_exceeded";
/// Event emitted when validator-registration traffic passes the identity gate.
pub const EVENT_VALIDATOR_IDENTITY_VERIFIED: &str = "validator_identity_verified";

/// A structured event: a kind plus ordered attribute key-value pairs.
///
/// Attribute keys and values are plain strings so downstream indexers can
/// parse them without a schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), attributes: Vec::new() }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// The value of the first attribute with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}
