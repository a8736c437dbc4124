use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
#[path = "address_test.rs"]
mod address_test;

/// Human-readable prefix of Veris account addresses.
pub const ACCOUNT_ADDRESS_PREFIX: &str = "veris1";

/// Minimum total length of a well-formed address.
const MIN_ADDRESS_LEN: usize = 12;
/// Maximum total length of a well-formed address.
const MAX_ADDRESS_LEN: usize = 90;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address '{address}' does not start with '{ACCOUNT_ADDRESS_PREFIX}'")]
    MissingPrefix { address: String },
    #[error("address '{address}' has invalid length {len}")]
    InvalidLength { address: String, len: usize },
    #[error("address '{address}' contains non-bech32 character '{found}'")]
    InvalidCharacter { address: String, found: char },
}

/// A bech32-style account address.
///
/// The inner string is not canonicalized on construction; call [`validate`]
/// before trusting an externally supplied address.
///
/// [`validate`]: AccountAddress::validate
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Structural validation: prefix, length and the bech32 character set.
    pub fn validate(&self) -> Result<(), AddressError> {
        if !self.0.starts_with(ACCOUNT_ADDRESS_PREFIX) {
            return Err(AddressError::MissingPrefix { address: self.0.clone() });
        }
        let len = self.0.len();
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
            return Err(AddressError::InvalidLength { address: self.0.clone(), len });
        }
        // bech32 data charset excludes '1', 'b', 'i', 'o'; the delimiting '1'
        // is part of the prefix above.
        let data = &self.0[ACCOUNT_ADDRESS_PREFIX.len()..];
        if let Some(found) =
            data.chars().find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() || "1bio".contains(*c))
        {
            return Err(AddressError::InvalidCharacter { address: self.0.clone(), found });
        }
        Ok(())
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountAddress {
    fn from(address: &str) -> Self {
        Self(address.to_owned())
    }
}
