//! Generation options and the protoc-style parameter string.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Switches threaded into lowering and the procedure templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Enums as their number instead of their name.
    pub emit_enums_as_integers: bool,
    /// Recorded in the file header. Encoding is total, so default-valued
    /// fields are always written regardless.
    pub emit_default_valued_fields: bool,
    /// Keys are proto field names instead of JSON names.
    pub use_original_field_names: bool,
    /// The decode procedure errors on fields absent from the schema.
    pub reject_unknown_fields: bool,
}

impl Options {
    /// Parse `key[=bool],key[=bool],...`. A bare key means `true`.
    pub fn from_parameter(parameter: &str) -> Result<Self, ConfigError> {
        let mut options = Options::default();
        options.apply_parameter(parameter)?;
        Ok(options)
    }

    /// Like `from_parameter`, but only the keys present change.
    pub fn apply_parameter(&mut self, parameter: &str) -> Result<(), ConfigError> {
        for item in parameter.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), parse_bool(k.trim(), v.trim())?),
                None => (item, true),
            };
            self.set(key, value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: bool) -> Result<(), ConfigError> {
        match key {
            "emit_enums_as_integers" | "enums_as_ints" => self.emit_enums_as_integers = value,
            "emit_default_valued_fields" | "emit_defaults" => self.emit_default_valued_fields = value,
            "use_original_field_names" | "orig_name" => self.use_original_field_names = value,
            "reject_unknown_fields" => self.reject_unknown_fields = value,
            "allow_unknown" => self.reject_unknown_fields = !value,
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Canonical parameter string, as written into generated headers.
    pub fn to_parameter(&self) -> String {
        format!(
            "emit_enums_as_integers={},emit_default_valued_fields={},use_original_field_names={},reject_unknown_fields={}",
            self.emit_enums_as_integers,
            self.emit_default_valued_fields,
            self.use_original_field_names,
            self.reject_unknown_fields,
        )
    }
}

impl FromStr for Options {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Options::from_parameter(s)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::NotBoolean { key: key.to_string(), value: value.to_string() }),
    }
}
