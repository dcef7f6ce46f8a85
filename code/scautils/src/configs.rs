/// Read check settings from a json file.
///
/// File format:
///
/// An object { ... } with the following named fields and value types:
///
///   msgwait-min - integer, optional, the smallest acceptable SBD msgwait timeout in seconds
///      [default: 300]
///   ha-file - string, optional, the name of the bundle file holding the HA data
///      [default: "ha.txt"]
///
/// Any field name starting with '#' is reserved for arbitrary comments.  Other unknown fields are
/// errors, to catch misspellings.
use crate::bundle::HA_FILE;
use anyhow::{bail, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path;

pub const DEFAULT_MSGWAIT_MIN: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    pub msgwait_min: i64,
    pub ha_file: String,
}

impl Default for CheckConfig {
    fn default() -> CheckConfig {
        CheckConfig {
            msgwait_min: DEFAULT_MSGWAIT_MIN,
            ha_file: HA_FILE.to_string(),
        }
    }
}

/// As with the cluster configs this uses the generic JSON parser followed by explicit decoding of
/// the fields, so that errors can name the offending field.

pub fn read_check_config(filename: &str) -> Result<CheckConfig> {
    let file = File::open(path::Path::new(filename))?;
    let reader = BufReader::new(file);
    let v = serde_json::from_reader(reader)?;
    parse_check_config(&v)
}

fn parse_check_config(v: &Value) -> Result<CheckConfig> {
    let mut cfg: CheckConfig = Default::default();
    if let Value::Object(fields) = v {
        for name in fields.keys() {
            if !name.starts_with('#') && name != "msgwait-min" && name != "ha-file" {
                bail!("Unknown field '{name}'");
            }
        }
        if let Some(n) = grab_i64_opt(fields, "msgwait-min")? {
            cfg.msgwait_min = n;
        }
        if let Some(s) = grab_string_opt(fields, "ha-file")? {
            if s.is_empty() {
                bail!("Field 'ha-file' must not be empty");
            }
            cfg.ha_file = s;
        }
    } else {
        bail!("Expected an object value")
    }
    Ok(cfg)
}

fn grab_string_opt(fields: &serde_json::Map<String, Value>, name: &str) -> Result<Option<String>> {
    if let Some(val) = fields.get(name) {
        if let Value::String(s) = val {
            Ok(Some(s.to_string()))
        } else {
            bail!("Field '{name}' must have a string value");
        }
    } else {
        Ok(None)
    }
}

fn grab_i64_opt(fields: &serde_json::Map<String, Value>, name: &str) -> Result<Option<i64>> {
    if let Some(val) = fields.get(name) {
        if let Some(n) = val.as_i64() {
            Ok(Some(n))
        } else {
            bail!("Field '{name}' must have an integer value")
        }
    } else {
        Ok(None)
    }
}

#[test]
fn test_config() {
    let conf = read_check_config("../tests/scautils/check-config.json").unwrap();
    assert!(conf.msgwait_min == 20);
    assert!(conf.ha_file == "ha-extra.txt");
}

#[test]
fn test_config_defaults() {
    let conf = parse_check_config(&serde_json::json!({"#comment": "nothing here"})).unwrap();
    assert!(conf == CheckConfig::default());
    assert!(conf.msgwait_min == 300);
    assert!(conf.ha_file == "ha.txt");
}

#[test]
fn test_config_errors() {
    assert!(parse_check_config(&serde_json::json!([])).is_err());
    assert!(parse_check_config(&serde_json::json!({"msgwait-min": "10"})).is_err());
    assert!(parse_check_config(&serde_json::json!({"msgwait-min": 1.5})).is_err());
    assert!(parse_check_config(&serde_json::json!({"ha-file": 3})).is_err());
    assert!(parse_check_config(&serde_json::json!({"ha-file": ""})).is_err());
    assert!(parse_check_config(&serde_json::json!({"msgwait_min": 10})).is_err());
    assert!(read_check_config("../tests/scautils/no-such-config.json").is_err());
}
