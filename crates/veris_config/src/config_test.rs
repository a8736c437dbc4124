use std::collections::BTreeMap;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use validator::Validate;

use crate::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use crate::loading::{load_and_validate, load_and_validate_json};
use crate::{ConfigError, ParamPath, SerializedParam};

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
struct InnerConfig {
    #[validate(range(min = 1))]
    cap: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
struct OuterConfig {
    enabled: bool,
    #[validate(nested)]
    inner: InnerConfig,
}

impl SerializeConfig for OuterConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut dump = BTreeMap::from_iter([ser_param(
            "enabled",
            &self.enabled,
            "Whether the component is enabled.",
        )]);
        dump.extend(prepend_sub_config_name(
            BTreeMap::from_iter([ser_param("cap", &self.inner.cap, "The cap.")]),
            "inner",
        ));
        dump
    }
}

#[test]
fn dump_flattens_with_field_separator() {
    let config = OuterConfig { enabled: true, inner: InnerConfig { cap: 7 } };
    let dump = config.dump();
    assert_eq!(
        dump.keys().cloned().collect::<Vec<_>>(),
        vec!["enabled".to_owned(), "inner.cap".to_owned()]
    );
    assert_eq!(dump["inner.cap"].value, json!(7));
    assert_eq!(dump["inner.cap"].description, "The cap.");
}

#[test]
fn dump_to_file_and_reload_dump() {
    let config = OuterConfig { enabled: false, inner: InnerConfig { cap: 3 } };
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config_dump.json");
    config.dump_to_file(path.to_str().unwrap()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let reloaded: BTreeMap<ParamPath, SerializedParam> = serde_json::from_str(&raw).unwrap();
    assert_eq!(reloaded, config.dump());
}

#[test]
fn load_validates_nested_config() {
    let valid: OuterConfig =
        load_and_validate_json(json!({"enabled": true, "inner": {"cap": 10}})).unwrap();
    assert_eq!(valid, OuterConfig { enabled: true, inner: InnerConfig { cap: 10 } });

    let invalid = load_and_validate_json::<OuterConfig>(json!({"enabled": true, "inner": {"cap": 0}}));
    assert_matches!(invalid, Err(ConfigError::ValidationError(_)));
}

#[test]
fn load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"enabled": true, "inner": {"cap": 42}}"#).unwrap();

    let config: OuterConfig = load_and_validate(&path).unwrap();
    assert_eq!(config.inner.cap, 42);
}
