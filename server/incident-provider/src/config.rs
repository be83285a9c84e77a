//! Provider configuration with sane defaults.

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Recognized configuration keys.
pub const KEY_SOURCE: &str = "source";
pub const KEY_DEFAULT_SEVERITY: &str = "defaultSeverity";

/// Options applied by the provider before delegating to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Injected into every created incident as `metadata["source"]`.
  pub source: String,
  /// Applied to `create` input when its severity is empty.
  pub default_severity: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      source: "memory".to_string(),
      default_severity: "sev3".to_string(),
    }
  }
}

impl Config {
  /// Build a config from a loosely-typed mapping.
  ///
  /// Unknown keys are ignored. A recognized key holding a non-string value is
  /// rejected; an absent key keeps its default.
  pub fn from_map(map: &Map<String, Value>) -> Result<Self, ProviderError> {
    let mut config = Self::default();
    if let Some(source) = string_option(map, KEY_SOURCE)? {
      config.source = source;
    }
    if let Some(severity) = string_option(map, KEY_DEFAULT_SEVERITY)? {
      config.default_severity = severity;
    }
    Ok(config)
  }

  /// Parse a JSON object string (as read from the environment) into a config.
  pub fn from_json_str(raw: &str) -> Result<Self, ProviderError> {
    let value: Value = serde_json::from_str(raw)
      .map_err(|e| ProviderError::invalid_config("<root>", &e.to_string()))?;
    match value {
      Value::Object(map) => Self::from_map(&map),
      _ => Err(ProviderError::invalid_config("<root>", "expected a JSON object")),
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = source.into();
    self
  }

  pub fn with_default_severity(mut self, severity: impl Into<String>) -> Self {
    self.default_severity = severity.into();
    self
  }
}

fn string_option(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ProviderError> {
  match map.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(other) => Err(ProviderError::invalid_config(
      key,
      &format!("expected string, got {}", value_type(other)),
    )),
  }
}

fn value_type(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
