//! Append-only timeline log, keyed by incident id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::error::ProviderError;
use crate::store::IncidentStore;
use crate::types::{kind, TimelineAppendInput, TimelineEntry};

/// Per-incident narrative entries in append order.
///
/// Entries are never reordered, mutated or removed. There is no per-incident
/// cap; growth is bounded only by the provider's lifetime.
#[derive(Debug)]
pub struct TimelineLog {
  incidents: Arc<IncidentStore>,
  entries: RwLock<HashMap<String, Vec<TimelineEntry>>>,
}

impl TimelineLog {
  /// The log checks incident existence against `incidents`.
  pub fn new(incidents: Arc<IncidentStore>) -> Self {
    Self {
      incidents,
      entries: RwLock::new(HashMap::new()),
    }
  }

  /// Append an entry to the end of the incident's timeline and return it.
  pub fn append(
    &self,
    incident_id: &str,
    input: TimelineAppendInput,
  ) -> Result<TimelineEntry, ProviderError> {
    self.ensure_incident(incident_id)?;

    let mut entries = self
      .entries
      .write()
      .map_err(|_| ProviderError::internal("timeline lock poisoned"))?;
    let timeline = entries.entry(incident_id.to_string()).or_default();

    let entry = TimelineEntry {
      id: format!("tl-{}", timeline.len() + 1),
      incident_id: incident_id.to_string(),
      at: input.at.unwrap_or_else(Utc::now),
      kind: if input.kind.is_empty() {
        kind::NOTE.to_string()
      } else {
        input.kind
      },
      body: input.body,
      actor: input.actor,
    };
    timeline.push(entry.clone());
    Ok(entry)
  }

  /// Entries in append order; empty when the incident has none.
  pub fn list(&self, incident_id: &str) -> Result<Vec<TimelineEntry>, ProviderError> {
    self.ensure_incident(incident_id)?;
    let entries = self
      .entries
      .read()
      .map_err(|_| ProviderError::internal("timeline lock poisoned"))?;
    Ok(entries.get(incident_id).cloned().unwrap_or_default())
  }

  fn ensure_incident(&self, incident_id: &str) -> Result<(), ProviderError> {
    if self.incidents.contains(incident_id)? {
      Ok(())
    } else {
      Err(ProviderError::not_found("incident", incident_id))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::CreateIncidentInput;
  use chrono::TimeZone;
  use serde_json::json;

  fn setup() -> (TimelineLog, String) {
    let store = Arc::new(IncidentStore::new());
    let inc = store
      .create(CreateIncidentInput {
        title: "Queue backlog".into(),
        status: "open".into(),
        ..Default::default()
      })
      .unwrap();
    (TimelineLog::new(store), inc.id)
  }

  fn note(body: &str) -> TimelineAppendInput {
    TimelineAppendInput {
      body: body.into(),
      ..Default::default()
    }
  }

  #[test]
  fn empty_timeline_is_not_an_error() {
    let (log, id) = setup();
    assert!(log.list(&id).unwrap().is_empty());
  }

  #[test]
  fn unknown_incident_is_not_found() {
    let (log, _) = setup();
    assert!(log.list("inc-999999").unwrap_err().is_not_found());
    assert!(log.append("inc-999999", note("x")).unwrap_err().is_not_found());
  }

  #[test]
  fn entries_come_back_in_append_order() {
    let (log, id) = setup();
    for body in ["paged on-call", "identified root cause", "deployed fix"] {
      log.append(&id, note(body)).unwrap();
    }
    let entries = log.list(&id).unwrap();
    let bodies: Vec<_> = entries.iter().map(|e| e.body.as_str()).collect();
    assert_eq!(bodies, vec!["paged on-call", "identified root cause", "deployed fix"]);
    let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["tl-1", "tl-2", "tl-3"]);
    assert!(entries.iter().all(|e| e.incident_id == id));
  }

  #[test]
  fn caller_time_and_kind_are_kept() {
    let (log, id) = setup();
    let at = Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
    let mut actor = crate::types::FieldMap::new();
    actor.insert("name".into(), json!("integration-test"));
    let entry = log
      .append(
        &id,
        TimelineAppendInput {
          at: Some(at),
          kind: kind::STATUS_CHANGE.into(),
          body: "open -> acknowledged".into(),
          actor,
        },
      )
      .unwrap();
    assert_eq!(entry.at, at);
    assert_eq!(entry.kind, "status-change");
    assert_eq!(entry.actor["name"], json!("integration-test"));
  }

  #[test]
  fn defaults_kind_and_time() {
    let (log, id) = setup();
    let before = Utc::now();
    let entry = log.append(&id, note("hello")).unwrap();
    assert_eq!(entry.kind, "note");
    assert!(entry.at >= before);
  }

  #[test]
  fn unknown_incident_wins_over_blank_input() {
    let (log, id) = setup();
    let err = log
      .append("INVALID_ID_9999", TimelineAppendInput::default())
      .unwrap_err();
    assert!(err.is_not_found());

    // Body is free text; an empty one is still a valid entry.
    let entry = log.append(&id, TimelineAppendInput::default()).unwrap();
    assert_eq!(entry.body, "");
    assert_eq!(log.list(&id).unwrap().len(), 1);
  }
}
