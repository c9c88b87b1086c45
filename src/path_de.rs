use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DescriptorError;

/// Deserialize with JSON-path context in error messages.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, DescriptorError> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(DescriptorError::Malformed { path, message: err.into_inner().to_string() })
        }
    }
}
