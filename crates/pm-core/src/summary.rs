//! Per-queue summaries and log-wide service KPIs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::sequence::{GroupKey, sequence};
use crate::transition::duration_secs;
use crate::types::{CaseId, QueueId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSummary {
    pub queue_id: QueueId,
    /// Distinct cases with at least one event in the queue.
    pub cases: usize,
    pub events: usize,
    /// Mean of event compliance flags. Missing flags count as compliant.
    pub compliance_rate: f64,
    /// Mean duration of steps leaving an event in this queue.
    pub avg_step_secs: Option<f64>,
}

#[derive(Default)]
struct QueueAccumulator<'a> {
    cases: BTreeSet<&'a CaseId>,
    events: usize,
    compliant: usize,
    step_total: f64,
    steps: usize,
}

/// Summarizes each queue, in queue order.
#[allow(clippy::cast_precision_loss)]
pub fn queue_summary(events: &[Event]) -> Vec<QueueSummary> {
    let mut queues: BTreeMap<&QueueId, QueueAccumulator<'_>> = BTreeMap::new();
    for event in events {
        let acc = queues.entry(&event.queue_id).or_default();
        acc.cases.insert(&event.case_id);
        acc.events += 1;
        if event.is_compliant() {
            acc.compliant += 1;
        }
    }

    for case in sequence(events, GroupKey::Case) {
        for pair in case.events().windows(2) {
            if let Some(acc) = queues.get_mut(&pair[0].queue_id) {
                acc.step_total += duration_secs(pair[0], pair[1]);
                acc.steps += 1;
            }
        }
    }

    queues
        .into_iter()
        .map(|(queue_id, acc)| QueueSummary {
            queue_id: queue_id.clone(),
            cases: acc.cases.len(),
            events: acc.events,
            compliance_rate: acc.compliant as f64 / acc.events as f64,
            avg_step_secs: (acc.steps > 0).then(|| acc.step_total / acc.steps as f64),
        })
        .collect()
}

/// Activity names that mark lifecycle milestones for KPIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiRule {
    pub start_activity: String,
    pub ack_activity: String,
    pub resolution_activities: Vec<String>,
}

impl Default for KpiRule {
    fn default() -> Self {
        Self {
            start_activity: "Open".to_string(),
            ack_activity: "Assigned".to_string(),
            resolution_activities: vec!["Resolved".to_string(), "Closed".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_cases: usize,
    /// Fraction of cases whose last event met its SLA.
    pub compliance_rate: Option<f64>,
    /// Mean hours from start to last resolution.
    pub mttr_hours: Option<f64>,
    /// Mean minutes from start to first acknowledgement.
    pub mtta_minutes: Option<f64>,
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Computes log-wide KPIs. Cases lacking a milestone are left out of that KPI.
#[allow(clippy::cast_precision_loss)]
pub fn kpis(events: &[Event], rule: &KpiRule) -> Kpis {
    let cases = sequence(events, GroupKey::Case);
    let mut compliant = 0_usize;
    let mut resolve_hours = Vec::new();
    let mut ack_minutes = Vec::new();

    for case in &cases {
        let history = case.events();
        if history.last().is_some_and(|e| e.is_compliant()) {
            compliant += 1;
        }
        let Some(start) = history.iter().find(|e| e.activity == rule.start_activity) else {
            continue;
        };
        if let Some(resolved) = history
            .iter()
            .rev()
            .find(|e| rule.resolution_activities.contains(&e.activity))
        {
            resolve_hours.push(duration_secs(start, resolved) / 3600.0);
        }
        if let Some(ack) = history.iter().find(|e| e.activity == rule.ack_activity) {
            ack_minutes.push(duration_secs(start, ack) / 60.0);
        }
    }

    Kpis {
        total_cases: cases.len(),
        compliance_rate: (!cases.is_empty()).then(|| compliant as f64 / cases.len() as f64),
        mttr_hours: mean(&resolve_hours),
        mtta_minutes: mean(&ack_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{event, flagged, queue};

    fn sample() -> Vec<Event> {
        vec![
            flagged("C1", "Open", 0, "Q1", true),
            flagged("C1", "Assigned", 30, "Q1", true),
            flagged("C1", "Transfer", 60, "Q2", true),
            flagged("C1", "Resolved", 120, "Q2", true),
            flagged("C2", "Open", 0, "Q1", true),
            flagged("C2", "Assigned", 10, "Q1", false),
            flagged("C2", "Closed", 240, "Q1", false),
            event("C3", "Open", 0, "Q2"),
        ]
    }

    #[test]
    fn queue_summary_counts_and_rates() {
        let summary = queue_summary(&sample());
        assert_eq!(summary.len(), 2);

        let q1 = &summary[0];
        assert_eq!(q1.queue_id, queue("Q1"));
        assert_eq!(q1.cases, 2);
        assert_eq!(q1.events, 5);
        assert!((q1.compliance_rate - 0.6).abs() < 1e-9);
        // Steps leaving Q1: 30m, 30m, 10m, 230m
        assert!((q1.avg_step_secs.unwrap() - 4500.0).abs() < 1e-9);

        let q2 = &summary[1];
        assert_eq!(q2.cases, 2);
        assert_eq!(q2.events, 3);
        assert!((q2.compliance_rate - 1.0).abs() < 1e-9);
        assert!((q2.avg_step_secs.unwrap() - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn queue_without_outgoing_steps_has_no_average() {
        let summary = queue_summary(&[event("C1", "Open", 0, "Q9")]);
        assert_eq!(summary[0].avg_step_secs, None);
    }

    #[test]
    fn kpis_from_milestones() {
        let kpis = kpis(&sample(), &KpiRule::default());
        assert_eq!(kpis.total_cases, 3);
        // C1 and C3 end compliant, C2 does not
        assert!((kpis.compliance_rate.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        // 2h and 4h
        assert!((kpis.mttr_hours.unwrap() - 3.0).abs() < 1e-9);
        // 30m and 10m
        assert!((kpis.mtta_minutes.unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn kpis_of_empty_log() {
        let kpis = kpis(&[], &KpiRule::default());
        assert_eq!(kpis.total_cases, 0);
        assert_eq!(kpis.compliance_rate, None);
        assert_eq!(kpis.mttr_hours, None);
        assert_eq!(kpis.mtta_minutes, None);
    }
}
