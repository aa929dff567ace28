//! Typed access to tool call arguments.

use crate::error::ChatwireError;

/// Wrapper around a parsed tool-call argument payload.
#[derive(Debug, Clone)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Parse the raw serialized payload the model produced.
    ///
    /// An empty payload parses as an empty object, which some providers emit
    /// for zero-argument tools.
    pub fn from_raw(raw: &str) -> Result<Self, ChatwireError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::new(serde_json::json!({})));
        }
        let value: serde_json::Value = serde_json::from_str(trimmed)?;
        if !value.is_object() {
            return Err(ChatwireError::InvalidArgument(format!(
                "tool arguments must be a JSON object, got: {value}"
            )));
        }
        Ok(Self::new(value))
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, ChatwireError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChatwireError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, ChatwireError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ChatwireError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, ChatwireError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ChatwireError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Get an array argument.
    pub fn get_array(&self, key: &str) -> Result<&Vec<serde_json::Value>, ChatwireError> {
        self.value
            .get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ChatwireError::InvalidArgument(format!("Missing array argument: {key}")))
    }
}
