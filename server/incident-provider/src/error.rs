//! Structured error types for the incident provider.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("invalid input: {field}: {reason}")]
  InvalidInput { field: String, reason: String },

  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },

  #[error("operation cancelled")]
  Cancelled,

  #[error("invalid config: {key}: {reason}")]
  InvalidConfig { key: String, reason: String },

  #[error("internal: {0}")]
  Internal(String),

  /// Malformed request JSON.
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl ProviderError {
  pub fn invalid_input(field: &str, reason: &str) -> Self {
    Self::InvalidInput {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn not_found(kind: &'static str, id: &str) -> Self {
    Self::NotFound {
      kind,
      id: id.to_string(),
    }
  }

  pub fn invalid_config(key: &str, reason: &str) -> Self {
    Self::InvalidConfig {
      key: key.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self::Internal(msg.into())
  }

  /// Stable machine-readable name for the error class.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidInput { .. } => "invalid_input",
      Self::NotFound { .. } => "not_found",
      Self::Cancelled => "cancelled",
      Self::InvalidConfig { .. } => "invalid_config",
      Self::Internal(_) => "internal",
      Self::Json(_) => "invalid_input",
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
