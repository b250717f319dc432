//! Typed ticket lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CaseId, QueueId};

/// One row of the event log.
///
/// Events are only built from validated input (see [`crate::EventLog`]), so every
/// field here is guaranteed present and well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The case (ticket) this event belongs to.
    pub case_id: CaseId,
    /// Activity label, e.g. `Assigned`.
    pub activity: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Queue the ticket was in when the event happened.
    pub queue_id: QueueId,
    /// Whether the ticket met its SLA. `None` when the source had no value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla_met: Option<bool>,
    /// Position in the original input. Breaks timestamp ties.
    #[serde(default)]
    pub position: u64,
}

impl Event {
    /// Creates an event with no SLA flag at the given input position.
    pub fn new(
        case_id: CaseId,
        activity: impl Into<String>,
        timestamp: DateTime<Utc>,
        queue_id: QueueId,
        position: u64,
    ) -> Self {
        Self {
            case_id,
            activity: activity.into(),
            timestamp,
            queue_id,
            sla_met: None,
            position,
        }
    }

    /// Sets the SLA flag.
    #[must_use]
    pub fn with_sla(mut self, sla_met: Option<bool>) -> Self {
        self.sla_met = sla_met;
        self
    }

    /// Compliance value used in rate calculations.
    ///
    /// A missing flag counts as compliant.
    pub fn is_compliant(&self) -> bool {
        self.sla_met.unwrap_or(true)
    }
}
