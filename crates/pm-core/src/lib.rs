//! Core engine for ticket flow mining.
//!
//! This crate turns a ticket event log into process models:
//! - Ingestion: validating loosely-typed rows into typed events
//! - Directly-follows graph with duration and compliance per transition
//! - Queue transition map separating flowing tickets from stuck ones
//! - Variant catalog of distinct activity sequences
//! - Queue summaries, KPIs and SLA flag derivation

pub mod duration;
mod error;
mod event;
pub mod graph;
pub mod log;
pub mod queue_map;
pub mod sequence;
pub mod sla;
pub mod summary;
#[cfg(test)]
mod testing;
pub mod transition;
pub mod types;
pub mod variant;

pub use duration::format_duration;
pub use error::CoreError;
pub use event::Event;
pub use graph::{EdgeKind, GraphEdge, GraphModel, NodeDegree};
pub use log::{EventLog, IngestWarning};
pub use queue_map::{Diagnostics, QueueMap, QueueMapOptions};
pub use sequence::{Case, CaseKey, GroupKey, sequence};
pub use sla::{SlaRule, derive_sla};
pub use summary::{KpiRule, Kpis, QueueSummary, kpis, queue_summary};
pub use transition::{MetricMode, Transition, TransitionScope, directly_follows};
pub use types::{CaseId, QueueId, ValidationError};
pub use variant::{Variant, VariantScope, rank_by_frequency};
