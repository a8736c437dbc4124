//! Dumping a config into a flat, documented parameter map.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::{ConfigError, ParamPath, SerializedParam, FIELD_SEPARATOR};

/// A config that can be flattened into documented `(path, value)` pairs.
pub trait SerializeConfig {
    /// Conversion of the configuration into a mapping of flattened parameter
    /// paths to their descriptions and values.
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam>;

    /// Writes the flattened parameter map as pretty JSON.
    fn dump_to_file(&self, file_path: &str) -> Result<(), ConfigError> {
        let dump = self.dump();
        std::fs::write(file_path, serde_json::to_string_pretty(&dump)?)?;
        Ok(())
    }
}

/// Serializes a single parameter of a config.
pub fn ser_param<T: Serialize>(
    name: &str,
    value: &T,
    description: &str,
) -> (ParamPath, SerializedParam) {
    (name.to_owned(), SerializedParam { description: description.to_owned(), value: json!(value) })
}

/// Prefixes every path of a sub-config dump with the sub-config field name.
pub fn prepend_sub_config_name(
    sub_config_dump: BTreeMap<ParamPath, SerializedParam>,
    sub_config_name: &str,
) -> BTreeMap<ParamPath, SerializedParam> {
    sub_config_dump
        .into_iter()
        .map(|(field_name, val)| (format!("{sub_config_name}{FIELD_SEPARATOR}{field_name}"), val))
        .collect()
}
