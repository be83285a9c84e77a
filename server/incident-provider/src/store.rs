//! In-memory incident store: keyed records in insertion order plus id generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::ProviderError;
use crate::types::{CreateIncidentInput, Incident, UpdateIncidentInput};

#[derive(Debug, Default)]
struct Inner {
  /// Records in insertion order.
  incidents: Vec<Incident>,
  /// id -> position in `incidents`.
  index: HashMap<String, usize>,
}

/// Thread-safe incident store. Returned records are always copies.
#[derive(Debug, Default)]
pub struct IncidentStore {
  inner: RwLock<Inner>,
  next_id: AtomicU64,
}

impl IncidentStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a new incident under a fresh id. Validation is the caller's job.
  pub fn create(&self, input: CreateIncidentInput) -> Result<Incident, ProviderError> {
    let mut inner = self.write()?;
    let id = self.generate_id();
    let now = Utc::now();
    let incident = Incident {
      id: id.clone(),
      title: input.title,
      status: input.status,
      severity: input.severity,
      service: input.service,
      fields: input.fields,
      metadata: input.metadata,
      created_at: now,
      updated_at: now,
    };
    let pos = inner.incidents.len();
    inner.incidents.push(incident.clone());
    inner.index.insert(id, pos);
    Ok(incident)
  }

  pub fn get(&self, id: &str) -> Result<Incident, ProviderError> {
    let inner = self.read()?;
    inner
      .index
      .get(id)
      .map(|&pos| inner.incidents[pos].clone())
      .ok_or_else(|| ProviderError::not_found("incident", id))
  }

  /// Apply only the present fields of `patch`; metadata is merged, not replaced.
  ///
  /// An unknown id is reported before any problem with the patch itself.
  pub fn update(&self, id: &str, patch: UpdateIncidentInput) -> Result<Incident, ProviderError> {
    let mut inner = self.write()?;
    let pos = *inner
      .index
      .get(id)
      .ok_or_else(|| ProviderError::not_found("incident", id))?;
    if patch.title.as_deref() == Some("") {
      return Err(ProviderError::invalid_input("title", "must not be empty"));
    }
    if patch.status.as_deref() == Some("") {
      return Err(ProviderError::invalid_input("status", "must not be empty"));
    }
    let incident = &mut inner.incidents[pos];

    if let Some(title) = patch.title {
      incident.title = title;
    }
    if let Some(status) = patch.status {
      incident.status = status;
    }
    if let Some(severity) = patch.severity {
      incident.severity = severity;
    }
    if let Some(service) = patch.service {
      incident.service = service;
    }
    if let Some(fields) = patch.fields {
      incident.fields = fields;
    }
    if let Some(metadata) = patch.metadata {
      incident.metadata.extend(metadata);
    }
    incident.updated_at = monotonic_now(incident.updated_at);

    Ok(incident.clone())
  }

  /// All incidents in insertion order.
  pub fn list(&self) -> Result<Vec<Incident>, ProviderError> {
    Ok(self.read()?.incidents.clone())
  }

  /// Run `f` over the stored incidents under the read lock, without cloning them all.
  pub fn scan<T>(&self, f: impl FnOnce(&[Incident]) -> T) -> Result<T, ProviderError> {
    let inner = self.read()?;
    Ok(f(&inner.incidents))
  }

  pub fn contains(&self, id: &str) -> Result<bool, ProviderError> {
    Ok(self.read()?.index.contains_key(id))
  }

  fn generate_id(&self) -> String {
    let seq = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
    format!("inc-{:06}", seq)
  }

  fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, ProviderError> {
    self
      .inner
      .read()
      .map_err(|_| ProviderError::internal("incident store lock poisoned"))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, ProviderError> {
    self
      .inner
      .write()
      .map_err(|_| ProviderError::internal("incident store lock poisoned"))
  }
}

/// Current time, never earlier than `prev`.
fn monotonic_now(prev: DateTime<Utc>) -> DateTime<Utc> {
  Utc::now().max(prev)
}
