//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use pm_core::log::filter_queues;
use pm_core::{Event, EventLog, QueueId, derive_sla};
use pm_db::Database;

use crate::Config;

/// Loads the stored event log and applies configured enrichment.
///
/// SLA flags are derived here, before any queue filter, so cases are judged on
/// their whole history.
pub fn load_log(db: &Database, config: &Config) -> Result<EventLog> {
    let mut log = EventLog::from_events(db.list_events().context("failed to load events")?);
    if let Some(rule) = config.sla.rule() {
        let updated = derive_sla(log.events_mut(), &rule);
        tracing::debug!(updated, threshold = rule.threshold_minutes, "derived sla flags");
    }
    Ok(log)
}

/// Parses `--queue` values.
pub fn parse_queues(values: &[String]) -> Result<Vec<QueueId>> {
    values
        .iter()
        .map(|v| QueueId::new(v.as_str()).with_context(|| format!("invalid queue: {v:?}")))
        .collect()
}

/// Restricts events to the selected queues. No selection keeps everything.
pub fn select_queues(events: &[Event], queues: &[QueueId]) -> Vec<Event> {
    let selected = filter_queues(events, queues);
    if !queues.is_empty() {
        tracing::debug!(
            queues = queues.len(),
            kept = selected.len(),
            total = events.len(),
            "filtered events to selected queues"
        );
    }
    selected
}
