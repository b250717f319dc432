//! Fixtures shared by unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::event::Event;
use crate::types::{CaseId, QueueId};

/// A fixed instant plus `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0)
        .single()
        .expect("valid test timestamp")
        + Duration::minutes(minutes)
}

/// An event without an SLA flag, `minutes` after the fixed instant.
pub fn event(case: &str, activity: &str, minutes: i64, queue: &str) -> Event {
    Event::new(
        CaseId::new(case).expect("valid case id"),
        activity,
        at(minutes),
        QueueId::new(queue).expect("valid queue id"),
        0,
    )
}

/// An event with an explicit SLA flag.
pub fn flagged(case: &str, activity: &str, minutes: i64, queue: &str, sla_met: bool) -> Event {
    event(case, activity, minutes, queue).with_sla(Some(sla_met))
}

pub fn queue(name: &str) -> QueueId {
    QueueId::new(name).expect("valid queue id")
}
