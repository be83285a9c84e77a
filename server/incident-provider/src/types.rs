//! Core types for the incident provider (data model + request/response contracts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open mapping of string keys to arbitrary JSON values.
pub type FieldMap = serde_json::Map<String, Value>;

/// Metadata keys the query engine and provider understand.
pub mod meta {
  pub const SOURCE: &str = "source";
  pub const ENVIRONMENT: &str = "environment";
  pub const TEAM: &str = "team";
}

/// Well-known status values. Other values are accepted as-is.
pub mod status {
  pub const OPEN: &str = "open";
  pub const ACKNOWLEDGED: &str = "acknowledged";
  pub const RESOLVED: &str = "resolved";
}

/// Well-known severity values. Other values are accepted as-is.
pub mod severity {
  pub const CRITICAL: &str = "critical";
  pub const HIGH: &str = "high";
  pub const SEV2: &str = "sev2";
  pub const LOW: &str = "low";
}

/// Timeline entry kinds.
pub mod kind {
  pub const NOTE: &str = "note";
  pub const STATUS_CHANGE: &str = "status-change";
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
  pub id: String,
  pub title: String,
  pub status: String,
  pub severity: String,
  pub service: String,
  #[serde(default)]
  pub fields: FieldMap,
  #[serde(default)]
  pub metadata: FieldMap,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Incident {
  /// String value of a metadata key, if present and a string.
  pub fn metadata_str(&self, key: &str) -> Option<&str> {
    self.metadata.get(key).and_then(Value::as_str)
  }
}

/// Immutable narrative record attached to one incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub id: String,
  pub incident_id: String,
  pub at: DateTime<Utc>,
  pub kind: String,
  pub body: String,
  #[serde(default)]
  pub actor: FieldMap,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Input for creating an incident. Unknown fields are silently ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateIncidentInput {
  pub title: String,
  pub status: String,
  /// Empty means "use the provider's default severity".
  #[serde(default)]
  pub severity: String,
  #[serde(default)]
  pub service: String,
  #[serde(default)]
  pub fields: FieldMap,
  #[serde(default)]
  pub metadata: FieldMap,
}

/// Partial update. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateIncidentInput {
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub severity: Option<String>,
  #[serde(default)]
  pub service: Option<String>,
  /// Replaces the fields map when present.
  #[serde(default)]
  pub fields: Option<FieldMap>,
  /// Merged key by key into existing metadata when present.
  #[serde(default)]
  pub metadata: Option<FieldMap>,
}

impl UpdateIncidentInput {
  pub fn status(status: impl Into<String>) -> Self {
    Self {
      status: Some(status.into()),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.status.is_none()
      && self.severity.is_none()
      && self.service.is_none()
      && self.fields.is_none()
      && self.metadata.is_none()
  }
}

/// Scope sub-filter. Empty strings impose no constraint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryScope {
  #[serde(default)]
  pub service: String,
  #[serde(default)]
  pub environment: String,
  #[serde(default)]
  pub team: String,
}

/// Multi-predicate incident filter. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IncidentQuery {
  #[serde(default)]
  pub statuses: Vec<String>,
  #[serde(default)]
  pub severities: Vec<String>,
  #[serde(default)]
  pub scope: QueryScope,
  /// Case-insensitive free text, matched against title and string field values.
  #[serde(default)]
  pub query: String,
  /// Maximum results; 0 means unlimited.
  #[serde(default)]
  pub limit: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TimelineAppendInput {
  /// Event time; the provider assigns the current time when absent.
  #[serde(default)]
  pub at: Option<DateTime<Utc>>,
  /// Defaults to `note` when empty.
  #[serde(default)]
  pub kind: String,
  pub body: String,
  #[serde(default)]
  pub actor: FieldMap,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// One request line read by the driver binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
  Create { input: CreateIncidentInput },
  Get { id: String },
  Update { id: String, input: UpdateIncidentInput },
  Query {
    #[serde(default)]
    query: IncidentQuery,
  },
  GetTimeline { id: String },
  AppendTimeline { id: String, input: TimelineAppendInput },
}

/// Successful response line.
#[derive(Debug, Clone, Serialize)]
pub struct OkOutput<T: Serialize> {
  pub ok: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<T>,
}

impl<T: Serialize> OkOutput<T> {
  pub fn new(result: T) -> Self {
    Self {
      ok: true,
      result: Some(result),
    }
  }

  pub fn empty() -> Self {
    Self { ok: true, result: None }
  }
}

/// Structured error output for failed or invalid request lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub kind: String,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      error: true,
      kind: kind.into(),
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

impl From<&crate::error::ProviderError> for ErrorOutput {
  fn from(e: &crate::error::ProviderError) -> Self {
    use crate::error::ProviderError;
    let out = Self::new(e.kind(), e.to_string());
    match e {
      ProviderError::InvalidInput { field, .. } => out.with_field(field.clone()),
      ProviderError::InvalidConfig { key, .. } => out.with_field(key.clone()),
      _ => out,
    }
  }
}
