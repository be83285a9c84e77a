//! Query engine: multi-predicate filtering over the incident collection.
//!
//! Predicates across dimensions are ANDed; values inside `statuses` and
//! `severities` are ORed. Empty predicates impose no constraint.

use serde_json::Value;

use crate::types::{meta, Incident, IncidentQuery};

impl IncidentQuery {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.statuses = statuses.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_severities<I, S>(mut self, severities: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.severities = severities.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_service(mut self, service: impl Into<String>) -> Self {
    self.scope.service = service.into();
    self
  }

  pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
    self.scope.environment = environment.into();
    self
  }

  pub fn with_team(mut self, team: impl Into<String>) -> Self {
    self.scope.team = team.into();
    self
  }

  pub fn with_text(mut self, text: impl Into<String>) -> Self {
    self.query = text.into();
    self
  }

  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = limit;
    self
  }

  /// Does `incident` satisfy every specified predicate?
  pub fn matches(&self, incident: &Incident) -> bool {
    if !self.statuses.is_empty() && !self.statuses.iter().any(|s| *s == incident.status) {
      return false;
    }
    if !self.severities.is_empty() && !self.severities.iter().any(|s| *s == incident.severity) {
      return false;
    }
    if !self.scope.service.is_empty() && incident.service != self.scope.service {
      return false;
    }
    if !self.scope.environment.is_empty()
      && incident.metadata_str(meta::ENVIRONMENT) != Some(self.scope.environment.as_str())
    {
      return false;
    }
    if !self.scope.team.is_empty()
      && incident.metadata_str(meta::TEAM) != Some(self.scope.team.as_str())
    {
      return false;
    }
    if !self.query.is_empty() && !text_matches(incident, &self.query.to_lowercase()) {
      return false;
    }
    true
  }
}

/// Filter `incidents` (in store order) and truncate to the query's limit.
pub fn evaluate(incidents: &[Incident], query: &IncidentQuery) -> Vec<Incident> {
  let matches = incidents.iter().filter(|inc| query.matches(inc)).cloned();
  if query.limit > 0 {
    matches.take(query.limit).collect()
  } else {
    matches.collect()
  }
}

/// Case-insensitive substring search over the title and string field values.
/// `needle` must already be lowercase.
fn text_matches(incident: &Incident, needle: &str) -> bool {
  if incident.title.to_lowercase().contains(needle) {
    return true;
  }
  incident.fields.values().any(|v| match v {
    Value::String(s) => s.to_lowercase().contains(needle),
    _ => false,
  })
}
