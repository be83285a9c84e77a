//! Incident Provider Adapter: vendor-neutral incident contract plus an
//! in-memory reference backend.
//!
//! Create, mutate, query, and narrate incidents through [`IncidentProvider`]
//! without depending on any one upstream incident-management vendor.
//! [`MemoryProvider`] keeps state for its own lifetime; no DB, no network.

pub mod config;
pub mod error;
pub mod provider;
pub mod query;
pub mod store;
pub mod timeline;
pub mod types;

pub use config::Config;
pub use error::ProviderError;
pub use provider::{IncidentProvider, MemoryProvider};
pub use store::IncidentStore;
pub use timeline::TimelineLog;
pub use types::{
  CreateIncidentInput, FieldMap, Incident, IncidentQuery, QueryScope, TimelineAppendInput,
  TimelineEntry, UpdateIncidentInput,
};
