//! Directly-follows transitions and their aggregation.
//!
//! Every adjacent pair of events in a case is a [`Step`]. Steps are grouped by
//! `(source, target)`, optionally per queue, into [`Transition`]s carrying a
//! count, a duration statistic and a compliance rate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::event::Event;
use crate::sequence::{Case, GroupKey, sequence};
use crate::types::QueueId;

/// Which duration statistic a transition reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricMode {
    /// Mean step duration.
    #[default]
    Avg,
    /// Median step duration.
    Median,
    /// Sum of step durations.
    Total,
}

impl MetricMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Median => "median",
            Self::Total => "total",
        }
    }

    /// Reduces a non-empty list of durations to this statistic.
    #[allow(clippy::cast_precision_loss)]
    fn reduce(self, durations: &mut [f64]) -> f64 {
        let total: f64 = durations.iter().sum();
        match self {
            Self::Total => total,
            Self::Avg => total / durations.len() as f64,
            Self::Median => {
                durations.sort_by(f64::total_cmp);
                let mid = durations.len() / 2;
                if durations.len() % 2 == 0 {
                    f64::midpoint(durations[mid - 1], durations[mid])
                } else {
                    durations[mid]
                }
            }
        }
    }
}

impl fmt::Display for MetricMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" | "mean" => Ok(Self::Avg),
            "median" => Ok(Self::Median),
            "total" | "sum" => Ok(Self::Total),
            _ => Err(CoreError::UnknownMetricMode(s.to_string())),
        }
    }
}

/// Whether transitions are keyed globally or per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionScope {
    #[default]
    Global,
    /// Keyed additionally by each case's home queue.
    PerQueue,
}

/// One directly-follows observation inside a case.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub duration_secs: f64,
    /// Compliance of the target event: the state the ticket arrived in.
    pub compliant: bool,
}

/// Seconds between two events, at millisecond precision.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn duration_secs(from: &Event, to: &Event) -> f64 {
    (to.timestamp - from.timestamp).num_milliseconds() as f64 / 1000.0
}

/// Derives the steps of a case: `n - 1` for `n` events.
///
/// Fails if any adjacent pair is out of chronological order.
pub fn steps<'a>(case: &Case<'a>) -> Result<Vec<Step<'a>>, CoreError> {
    case.events()
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let duration_secs = duration_secs(from, to);
            if duration_secs < 0.0 {
                tracing::warn!(
                    case_id = %case.case_id(),
                    from = %from.activity,
                    to = %to.activity,
                    duration_secs,
                    "events out of order"
                );
                return Err(CoreError::NegativeDuration {
                    case_id: case.case_id().clone(),
                    from: from.activity.clone(),
                    to: to.activity.clone(),
                    duration_secs,
                });
            }
            Ok(Step {
                source: from.activity.as_str(),
                target: to.activity.as_str(),
                duration_secs,
                compliant: to.is_compliant(),
            })
        })
        .collect()
}

/// Grouping key of an aggregated transition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TransitionKey {
    queue_id: Option<QueueId>,
    source: String,
    target: String,
}

#[derive(Debug, Default)]
struct Accumulator {
    durations: Vec<f64>,
    compliant: u64,
}

/// An aggregated directly-follows edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<QueueId>,
    pub source: String,
    pub target: String,
    /// Number of steps with this key. Always at least one.
    pub count: u64,
    /// Duration statistic in seconds, per `mode`.
    pub duration_secs: f64,
    /// Fraction of steps whose target event met its SLA, in `[0, 1]`.
    pub compliance_rate: f64,
    pub mode: MetricMode,
}

/// Aggregates the steps of all cases into transitions, sorted by key.
///
/// Step derivation runs per case in parallel; the reduction walks cases in
/// their given order so the result does not depend on scheduling.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate(
    cases: &[Case<'_>],
    mode: MetricMode,
    scope: TransitionScope,
) -> Result<Vec<Transition>, CoreError> {
    let per_case: Vec<Result<Vec<Step<'_>>, CoreError>> = cases.par_iter().map(steps).collect();

    let mut groups: BTreeMap<TransitionKey, Accumulator> = BTreeMap::new();
    let mut step_count = 0_usize;
    for (case, case_steps) in cases.iter().zip(per_case) {
        let queue_id = match scope {
            TransitionScope::Global => None,
            TransitionScope::PerQueue => Some(case.home_queue()),
        };
        for step in case_steps? {
            step_count += 1;
            let key = TransitionKey {
                queue_id: queue_id.cloned(),
                source: step.source.to_string(),
                target: step.target.to_string(),
            };
            let acc = groups.entry(key).or_default();
            acc.durations.push(step.duration_secs);
            if step.compliant {
                acc.compliant += 1;
            }
        }
    }

    let transitions: Vec<Transition> = groups
        .into_iter()
        .map(|(key, mut acc)| {
            let count = acc.durations.len() as u64;
            Transition {
                queue_id: key.queue_id,
                source: key.source,
                target: key.target,
                count,
                duration_secs: mode.reduce(&mut acc.durations),
                compliance_rate: acc.compliant as f64 / count as f64,
                mode,
            }
        })
        .collect();

    tracing::debug!(
        cases = cases.len(),
        steps = step_count,
        transitions = transitions.len(),
        %mode,
        "aggregated transitions"
    );
    Ok(transitions)
}

/// Builds the directly-follows graph of an event log.
pub fn directly_follows(
    events: &[Event],
    mode: MetricMode,
    scope: TransitionScope,
) -> Result<Vec<Transition>, CoreError> {
    let cases = sequence(events, GroupKey::Case);
    aggregate(&cases, mode, scope)
}
