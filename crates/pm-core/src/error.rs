//! Error types for the engine.

use thiserror::Error;

use crate::types::CaseId;

/// Errors raised while turning an event log into process models.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Required columns are absent from the log source.
    #[error("event log is missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<&'static str> },

    /// Two adjacent events of a case are out of chronological order.
    #[error("negative duration of {duration_secs}s in case {case_id}: {from} -> {to}")]
    NegativeDuration {
        case_id: CaseId,
        from: String,
        to: String,
        duration_secs: f64,
    },

    /// A duration metric name was not recognised.
    #[error("unknown metric mode: {0} (expected avg, median or total)")]
    UnknownMetricMode(String),

    /// A variant scope name was not recognised.
    #[error("unknown variant scope: {0} (expected global or per-queue)")]
    UnknownScope(String),
}
