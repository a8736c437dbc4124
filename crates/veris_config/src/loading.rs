//! Loading and validating a config from its nested JSON form.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::ConfigError;

/// Parses a config from a nested JSON file and validates it.
///
/// Validation failures surface here, at load time; components may assume any
/// config value they receive has already passed its `Validate` rules.
pub fn load_and_validate<T: DeserializeOwned + Validate>(
    config_path: &Path,
) -> Result<T, ConfigError> {
    let reader = BufReader::new(File::open(config_path)?);
    let config: T = serde_json::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}

/// Parses a config from an in-memory JSON value and validates it.
pub fn load_and_validate_json<T: DeserializeOwned + Validate>(
    raw: serde_json::Value,
) -> Result<T, ConfigError> {
    let config: T = serde_json::from_value(raw)?;
    config.validate()?;
    Ok(config)
}
