//! Case sequencing: grouping events into ordered per-case histories.

use std::collections::BTreeMap;

use crate::event::Event;
use crate::types::{CaseId, QueueId};

/// How events are grouped into cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKey {
    /// One group per case identifier.
    #[default]
    Case,
    /// One group per `(queue, case)` pair. A case that moves between queues
    /// yields one group per queue.
    QueueAndCase,
}

/// Identifies one group produced by [`sequence`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseKey {
    /// Set only when grouping with [`GroupKey::QueueAndCase`].
    pub queue_id: Option<QueueId>,
    pub case_id: CaseId,
}

/// An ordered event history borrowed from a log snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Case<'a> {
    key: CaseKey,
    events: Vec<&'a Event>,
}

impl<'a> Case<'a> {
    /// Builds a case from events taken as given.
    ///
    /// No sorting happens here; use [`sequence`] to build cases from a raw log.
    /// Returns `None` for an empty event list.
    pub fn from_ordered(key: CaseKey, events: Vec<&'a Event>) -> Option<Self> {
        if events.is_empty() {
            None
        } else {
            Some(Self { key, events })
        }
    }

    pub const fn key(&self) -> &CaseKey {
        &self.key
    }

    pub const fn case_id(&self) -> &CaseId {
        &self.key.case_id
    }

    /// Events in chronological order.
    pub fn events(&self) -> &[&'a Event] {
        &self.events
    }

    /// Number of events. Always at least one.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The queue this case is attributed to: the queue of its first event.
    ///
    /// For per-queue groups this is the grouping queue.
    pub fn home_queue(&self) -> &'a QueueId {
        &self.events[0].queue_id
    }

    /// Activity labels in order.
    pub fn activities(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.events.iter().map(|e| e.activity.as_str())
    }
}

/// Groups events into cases and orders each case chronologically.
///
/// Timestamp ties keep input order (by [`Event::position`], then slice order).
/// Cases come back sorted by key so every consumer sees the same order.
pub fn sequence(events: &[Event], group_key: GroupKey) -> Vec<Case<'_>> {
    let mut groups: BTreeMap<CaseKey, Vec<&Event>> = BTreeMap::new();
    for event in events {
        let key = CaseKey {
            queue_id: match group_key {
                GroupKey::Case => None,
                GroupKey::QueueAndCase => Some(event.queue_id.clone()),
            },
            case_id: event.case_id.clone(),
        };
        groups.entry(key).or_default().push(event);
    }

    let cases: Vec<Case<'_>> = groups
        .into_iter()
        .map(|(key, mut events)| {
            events.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then(a.position.cmp(&b.position))
            });
            Case { key, events }
        })
        .collect();

    tracing::debug!(events = events.len(), cases = cases.len(), "sequenced cases");
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, event};

    #[test]
    fn sequence_sorts_each_case_by_time() {
        let events = vec![
            event("C2", "Open", 0, "Q1"),
            event("C1", "Closed", 20, "Q1"),
            event("C1", "Open", 0, "Q1"),
            event("C1", "Assigned", 10, "Q2"),
        ];

        let cases = sequence(&events, GroupKey::Case);
        assert_eq!(cases.len(), 2);

        assert_eq!(cases[0].case_id().as_str(), "C1");
        let activities: Vec<&str> = cases[0].activities().collect();
        assert_eq!(activities, vec!["Open", "Assigned", "Closed"]);
        assert_eq!(cases[0].home_queue().as_str(), "Q1");

        assert_eq!(cases[1].case_id().as_str(), "C2");
        assert_eq!(cases[1].len(), 1);
    }

    #[test]
    fn timestamp_ties_keep_input_order() {
        let events = vec![
            event("C1", "B", 0, "Q1"),
            event("C1", "A", 0, "Q1"),
            event("C1", "C", 0, "Q1"),
        ];

        let cases = sequence(&events, GroupKey::Case);
        let activities: Vec<&str> = cases[0].activities().collect();
        assert_eq!(activities, vec!["B", "A", "C"]);
    }

    #[test]
    fn queue_and_case_splits_a_moving_case() {
        let events = vec![
            event("C1", "Open", 0, "Q1"),
            event("C1", "Transfer", 5, "Q2"),
            event("C1", "Closed", 9, "Q2"),
        ];

        let cases = sequence(&events, GroupKey::QueueAndCase);
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].key().queue_id.as_ref().unwrap().as_str(), "Q1");
        assert_eq!(cases[1].key().queue_id.as_ref().unwrap().as_str(), "Q2");
        assert_eq!(cases[1].home_queue().as_str(), "Q2");
        assert_eq!(cases[1].len(), 2);
    }

    #[test]
    fn sequence_of_empty_log_is_empty() {
        assert!(sequence(&[], GroupKey::Case).is_empty());
    }

    #[test]
    fn from_ordered_rejects_empty_cases() {
        let key = CaseKey {
            queue_id: None,
            case_id: CaseId::new("C1").unwrap(),
        };
        assert!(Case::from_ordered(key.clone(), Vec::new()).is_none());

        let e = event("C1", "Open", 0, "Q1");
        let case = Case::from_ordered(key, vec![&e]).unwrap();
        assert_eq!(case.events()[0].timestamp, at(0));
    }
}
