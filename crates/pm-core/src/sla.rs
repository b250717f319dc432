//! Deriving missing SLA flags from case resolution time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::types::CaseId;

/// Resolution-time SLA: a case meets it when it is resolved within
/// `threshold_minutes` of being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaRule {
    pub threshold_minutes: u64,
    /// Marks creation. Falls back to the first event of the case.
    pub created_activity: String,
    /// Mark resolution. The last match wins; falls back to the last event.
    pub resolution_activities: Vec<String>,
}

impl SlaRule {
    pub fn new(threshold_minutes: u64) -> Self {
        Self {
            threshold_minutes,
            created_activity: "Created".to_string(),
            resolution_activities: vec!["Resolved".to_string(), "Closed".to_string()],
        }
    }

    fn is_resolution(&self, activity: &str) -> bool {
        self.resolution_activities.iter().any(|a| a == activity)
    }
}

/// Fills `sla_met` for cases in which no event carries a flag.
///
/// Cases with at least one explicit flag are left untouched. Returns the
/// number of events updated.
#[allow(clippy::cast_precision_loss)]
pub fn derive_sla(events: &mut [Event], rule: &SlaRule) -> usize {
    let mut cases: BTreeMap<CaseId, Vec<usize>> = BTreeMap::new();
    for (idx, event) in events.iter().enumerate() {
        cases.entry(event.case_id.clone()).or_default().push(idx);
    }

    let mut updated = 0;
    for (case_id, mut indices) in cases {
        if indices.iter().any(|&i| events[i].sla_met.is_some()) {
            continue;
        }
        indices.sort_by(|&a, &b| {
            events[a]
                .timestamp
                .cmp(&events[b].timestamp)
                .then(events[a].position.cmp(&events[b].position))
        });

        let first = &events[indices[0]];
        let last = &events[indices[indices.len() - 1]];
        let created: DateTime<Utc> = indices
            .iter()
            .map(|&i| &events[i])
            .find(|e| e.activity == rule.created_activity)
            .unwrap_or(first)
            .timestamp;
        let resolved: DateTime<Utc> = indices
            .iter()
            .rev()
            .map(|&i| &events[i])
            .find(|e| rule.is_resolution(&e.activity))
            .unwrap_or(last)
            .timestamp;

        let elapsed_minutes = (resolved - created).num_milliseconds() as f64 / 60_000.0;
        let met = elapsed_minutes <= rule.threshold_minutes as f64;
        tracing::debug!(%case_id, elapsed_minutes, met, "derived sla flag");

        for &i in &indices {
            events[i].sla_met = Some(met);
        }
        updated += indices.len();
    }
    updated
}
