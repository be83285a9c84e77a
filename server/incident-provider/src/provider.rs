//! Provider façade: the single entry point for incident operations.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ProviderError;
use crate::store::IncidentStore;
use crate::timeline::TimelineLog;
use crate::types::*;

/// Uniform incident contract, implemented by every backend.
///
/// Each operation checks `cancel` first and returns [`ProviderError::Cancelled`]
/// without side effects when it has fired.
#[async_trait]
pub trait IncidentProvider: Send + Sync {
  async fn create(
    &self,
    cancel: &CancellationToken,
    input: CreateIncidentInput,
  ) -> Result<Incident, ProviderError>;

  async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Incident, ProviderError>;

  async fn update(
    &self,
    cancel: &CancellationToken,
    id: &str,
    input: UpdateIncidentInput,
  ) -> Result<Incident, ProviderError>;

  /// Never fails on an empty result.
  async fn query(
    &self,
    cancel: &CancellationToken,
    query: &IncidentQuery,
  ) -> Result<Vec<Incident>, ProviderError>;

  async fn get_timeline(
    &self,
    cancel: &CancellationToken,
    incident_id: &str,
  ) -> Result<Vec<TimelineEntry>, ProviderError>;

  async fn append_timeline(
    &self,
    cancel: &CancellationToken,
    incident_id: &str,
    input: TimelineAppendInput,
  ) -> Result<(), ProviderError>;
}

/// In-memory reference backend. Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
  config: Arc<Config>,
  store: Arc<IncidentStore>,
  timeline: Arc<TimelineLog>,
}

impl MemoryProvider {
  pub fn new(config: Config) -> Self {
    let store = Arc::new(IncidentStore::new());
    let timeline = Arc::new(TimelineLog::new(Arc::clone(&store)));
    Self {
      config: Arc::new(config),
      store,
      timeline,
    }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  /// Build from a loosely-typed config mapping (see [`Config::from_map`]).
  pub fn from_map(map: &Map<String, Value>) -> Result<Self, ProviderError> {
    Ok(Self::new(Config::from_map(map)?))
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Apply defaults and injected metadata, then validate.
  fn prepare_create(&self, mut input: CreateIncidentInput) -> Result<CreateIncidentInput, ProviderError> {
    if input.title.is_empty() {
      return Err(ProviderError::invalid_input("title", "must not be empty"));
    }
    if input.status.is_empty() {
      return Err(ProviderError::invalid_input("status", "must not be empty"));
    }
    if input.severity.is_empty() {
      input.severity = self.config.default_severity.clone();
    }
    input.metadata.insert(
      meta::SOURCE.to_string(),
      Value::String(self.config.source.clone()),
    );
    Ok(input)
  }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ProviderError> {
  if cancel.is_cancelled() {
    Err(ProviderError::Cancelled)
  } else {
    Ok(())
  }
}

/// Log a read-path failure; not-found is an expected outcome.
fn trace_lookup<T>(op: &str, id: &str, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
  if let Err(e) = &result {
    debug!(op, id, error = %e, "lookup failed");
  }
  result
}

#[async_trait]
impl IncidentProvider for MemoryProvider {
  async fn create(
    &self,
    cancel: &CancellationToken,
    input: CreateIncidentInput,
  ) -> Result<Incident, ProviderError> {
    check_cancelled(cancel)?;
    let input = self.prepare_create(input)?;
    let incident = self.store.create(input)?;
    info!(
      id = %incident.id,
      status = %incident.status,
      severity = %incident.severity,
      service = %incident.service,
      "incident created"
    );
    Ok(incident)
  }

  async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<Incident, ProviderError> {
    check_cancelled(cancel)?;
    trace_lookup("get", id, self.store.get(id))
  }

  async fn update(
    &self,
    cancel: &CancellationToken,
    id: &str,
    input: UpdateIncidentInput,
  ) -> Result<Incident, ProviderError> {
    check_cancelled(cancel)?;
    if input.is_empty() {
      debug!(id, "empty update; only updated_at changes");
    }
    let incident = trace_lookup("update", id, self.store.update(id, input))?;
    info!(id = %incident.id, status = %incident.status, "incident updated");
    Ok(incident)
  }

  async fn query(
    &self,
    cancel: &CancellationToken,
    query: &IncidentQuery,
  ) -> Result<Vec<Incident>, ProviderError> {
    check_cancelled(cancel)?;
    let matches = self.store.scan(|all| crate::query::evaluate(all, query))?;
    debug!(matched = matches.len(), limit = query.limit, "query evaluated");
    Ok(matches)
  }

  async fn get_timeline(
    &self,
    cancel: &CancellationToken,
    incident_id: &str,
  ) -> Result<Vec<TimelineEntry>, ProviderError> {
    check_cancelled(cancel)?;
    trace_lookup("get_timeline", incident_id, self.timeline.list(incident_id))
  }

  async fn append_timeline(
    &self,
    cancel: &CancellationToken,
    incident_id: &str,
    input: TimelineAppendInput,
  ) -> Result<(), ProviderError> {
    check_cancelled(cancel)?;
    let entry = trace_lookup(
      "append_timeline",
      incident_id,
      self.timeline.append(incident_id, input),
    )?;
    info!(incident_id, entry_id = %entry.id, kind = %entry.kind, "timeline entry appended");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn provider() -> MemoryProvider {
    MemoryProvider::new(
      Config::default()
        .with_source("integration-test")
        .with_default_severity("sev2"),
    )
  }

  fn open(title: &str) -> CreateIncidentInput {
    CreateIncidentInput {
      title: title.into(),
      status: status::OPEN.into(),
      service: "api-service".into(),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn create_applies_default_severity_and_source() {
    let p = provider();
    let cx = CancellationToken::new();
    let inc = p.create(&cx, open("Test Incident 2")).await.unwrap();
    assert_eq!(inc.severity, "sev2");
    assert_eq!(inc.metadata["source"], json!("integration-test"));
  }

  #[tokio::test]
  async fn explicit_severity_is_kept() {
    let p = provider();
    let cx = CancellationToken::new();
    let mut input = open("db down");
    input.severity = severity::CRITICAL.into();
    let inc = p.create(&cx, input).await.unwrap();
    assert_eq!(inc.severity, "critical");
  }

  #[tokio::test]
  async fn configured_source_overrides_caller_source() {
    let p = provider();
    let cx = CancellationToken::new();
    let mut input = open("x");
    input.metadata.insert("source".into(), json!("caller"));
    input.metadata.insert("team".into(), json!("backend"));
    let inc = p.create(&cx, input).await.unwrap();
    assert_eq!(inc.metadata["source"], json!("integration-test"));
    assert_eq!(inc.metadata["team"], json!("backend"));
  }

  #[tokio::test]
  async fn create_requires_title_and_status() {
    let p = provider();
    let cx = CancellationToken::new();

    let err = p.create(&cx, open("")).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidInput { ref field, .. } if field == "title"));

    let mut input = open("t");
    input.status.clear();
    let err = p.create(&cx, input).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidInput { ref field, .. } if field == "status"));

    assert!(p.query(&cx, &IncidentQuery::new()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn update_rejects_blank_title() {
    let p = provider();
    let cx = CancellationToken::new();
    let inc = p.create(&cx, open("t")).await.unwrap();
    let err = p
      .update(
        &cx,
        &inc.id,
        UpdateIncidentInput {
          title: Some(String::new()),
          ..Default::default()
        },
      )
      .await
      .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(p.get(&cx, &inc.id).await.unwrap().title, "t");

    let err = p
      .update(&cx, "INVALID_ID_9999", UpdateIncidentInput::status(""))
      .await
      .unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn empty_update_only_refreshes_updated_at() {
    let p = provider();
    let cx = CancellationToken::new();
    let inc = p.create(&cx, open("t")).await.unwrap();
    let same = p.update(&cx, &inc.id, UpdateIncidentInput::default()).await.unwrap();
    assert_eq!(same.title, inc.title);
    assert_eq!(same.status, inc.status);
    assert_eq!(same.metadata, inc.metadata);
    assert!(same.updated_at >= inc.updated_at);
  }

  #[tokio::test]
  async fn cancelled_token_short_circuits_without_side_effects() {
    let p = provider();
    let cx = CancellationToken::new();
    cx.cancel();

    let err = p.create(&cx, open("never stored")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Cancelled));
    assert!(matches!(p.get(&cx, "inc-000001").await, Err(ProviderError::Cancelled)));
    assert!(matches!(
      p.query(&cx, &IncidentQuery::new()).await,
      Err(ProviderError::Cancelled)
    ));

    let live = CancellationToken::new();
    assert!(p.query(&live, &IncidentQuery::new()).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn clones_share_state() {
    let p = provider();
    let other = p.clone();
    let cx = CancellationToken::new();
    let inc = p.create(&cx, open("shared")).await.unwrap();
    assert_eq!(other.get(&cx, &inc.id).await.unwrap().title, "shared");
  }

  #[tokio::test]
  async fn usable_as_trait_object() {
    let p: Arc<dyn IncidentProvider> = Arc::new(provider());
    let cx = CancellationToken::new();
    let inc = p.create(&cx, open("dyn")).await.unwrap();
    p.append_timeline(
      &cx,
      &inc.id,
      TimelineAppendInput {
        body: "note".into(),
        ..Default::default()
      },
    )
    .await
    .unwrap();
    assert_eq!(p.get_timeline(&cx, &inc.id).await.unwrap().len(), 1);
  }

  #[test]
  fn from_map_rejects_wrong_types() {
    let map = match json!({ "source": ["a"] }) {
      Value::Object(m) => m,
      _ => unreachable!(),
    };
    assert_eq!(MemoryProvider::from_map(&map).unwrap_err().kind(), "invalid_config");
  }
}
