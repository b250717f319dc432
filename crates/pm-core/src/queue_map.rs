//! Queue transition map: flowing tickets versus tickets stuck in one queue.
//!
//! Queue sequences are computed over the whole log before any queue filter is
//! applied. Filtering first would join queues that were never adjacent: a case
//! visiting `A, C, B` must not produce `A -> B` when `C` is filtered out.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::event::Event;
use crate::graph::{GraphEdge, GraphModel};
use crate::sequence::{GroupKey, sequence};
use crate::types::{CaseId, QueueId};

/// Number of per-case sequences kept in [`Diagnostics::sequence_sample`].
pub const DIAGNOSTIC_SAMPLE_SIZE: usize = 10;

/// Per-case queue visits with consecutive repeats collapsed.
pub fn queue_sequences(events: &[Event]) -> BTreeMap<CaseId, Vec<QueueId>> {
    sequence(events, GroupKey::Case)
        .into_iter()
        .map(|case| {
            let mut queues: Vec<QueueId> = Vec::new();
            for event in case.events() {
                if queues.last() != Some(&event.queue_id) {
                    queues.push(event.queue_id.clone());
                }
            }
            (case.case_id().clone(), queues)
        })
        .collect()
}

/// Counts every adjacent pair across all queue sequences.
///
/// Sequences are de-duplicated so no pair has equal endpoints.
pub fn queue_transition_counts(
    sequences: &BTreeMap<CaseId, Vec<QueueId>>,
) -> BTreeMap<(QueueId, QueueId), u64> {
    let mut counts = BTreeMap::new();
    for queues in sequences.values() {
        for pair in queues.windows(2) {
            *counts
                .entry((pair[0].clone(), pair[1].clone()))
                .or_insert(0) += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMapOptions {
    /// Queues to show. Empty means every queue in the log.
    pub selected_queues: Vec<QueueId>,
    /// Edges with a smaller count are dropped. Zero behaves like one.
    pub min_edge_threshold: u64,
}

impl Default for QueueMapOptions {
    fn default() -> Self {
        Self {
            selected_queues: Vec::new(),
            min_edge_threshold: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueTransitionCount {
    pub source: QueueId,
    pub target: QueueId,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseQueues {
    pub case_id: CaseId,
    pub queues: Vec<QueueId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMapWarning {
    /// The log had no events.
    EmptyInput,
    /// Nothing passed the selection and threshold; the graph has nodes only.
    EmptyResult,
}

/// Pipeline state for checking a queue map without rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub distinct_queues: Vec<QueueId>,
    pub selected_queues: Vec<QueueId>,
    pub total_cases: usize,
    /// Global queue sequences of the first cases in case order.
    pub sequence_sample: Vec<CaseQueues>,
    pub filtered_transition_counts: Vec<QueueTransitionCount>,
    pub self_loop_counts: BTreeMap<QueueId, u64>,
    pub warnings: Vec<QueueMapWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueMap {
    pub graph: GraphModel,
    pub diagnostics: Diagnostics,
}

/// Builds the queue map for the selected queues.
pub fn build(events: &[Event], options: &QueueMapOptions) -> QueueMap {
    let threshold = options.min_edge_threshold.max(1);
    let distinct_queues: Vec<QueueId> = events
        .iter()
        .map(|e| e.queue_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let selected: BTreeSet<QueueId> = if options.selected_queues.is_empty() {
        distinct_queues.iter().cloned().collect()
    } else {
        options.selected_queues.iter().cloned().collect()
    };

    let sequences = queue_sequences(events);

    let transitions: Vec<QueueTransitionCount> = queue_transition_counts(&sequences)
        .into_iter()
        .filter(|((source, target), count)| {
            source != target
                && selected.contains(source)
                && selected.contains(target)
                && *count >= threshold
        })
        .map(|((source, target), count)| QueueTransitionCount {
            source,
            target,
            count,
        })
        .collect();

    let mut self_loop_counts: BTreeMap<QueueId, u64> = BTreeMap::new();
    for queues in sequences.values() {
        if let [only] = queues.as_slice() {
            if selected.contains(only) {
                *self_loop_counts.entry(only.clone()).or_insert(0) += 1;
            }
        }
    }
    self_loop_counts.retain(|_, count| *count >= threshold);

    let mut edges: Vec<GraphEdge> = transitions
        .iter()
        .map(|t| GraphEdge::transition(t.source.as_str(), t.target.as_str(), t.count))
        .collect();
    edges.extend(
        self_loop_counts
            .iter()
            .map(|(queue, count)| GraphEdge::self_loop(queue.as_str(), *count)),
    );

    let mut warnings = Vec::new();
    if events.is_empty() {
        warnings.push(QueueMapWarning::EmptyInput);
    }
    let graph = if edges.is_empty() {
        tracing::warn!(
            selected = selected.len(),
            threshold,
            "no queue transitions or stuck cases above threshold"
        );
        warnings.push(QueueMapWarning::EmptyResult);
        GraphModel::new(selected.iter().map(|q| q.as_str().to_string()), edges)
    } else {
        GraphModel::new(Vec::new(), edges)
    };

    tracing::debug!(
        cases = sequences.len(),
        transitions = transitions.len(),
        self_loops = self_loop_counts.len(),
        "built queue map"
    );

    let diagnostics = Diagnostics {
        distinct_queues,
        selected_queues: selected.into_iter().collect(),
        total_cases: sequences.len(),
        sequence_sample: sequences
            .iter()
            .take(DIAGNOSTIC_SAMPLE_SIZE)
            .map(|(case_id, queues)| CaseQueues {
                case_id: case_id.clone(),
                queues: queues.clone(),
            })
            .collect(),
        filtered_transition_counts: transitions,
        self_loop_counts,
        warnings,
    };

    QueueMap { graph, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::testing::{event, queue};

    fn options(selected: &[&str], threshold: u64) -> QueueMapOptions {
        QueueMapOptions {
            selected_queues: selected.iter().map(|q| queue(q)).collect(),
            min_edge_threshold: threshold,
        }
    }

    fn edge_keys(map: &QueueMap) -> Vec<(String, String, EdgeKind)> {
        map.graph
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.kind))
            .collect()
    }

    #[test]
    fn consecutive_queue_repeats_collapse() {
        let events = vec![
            event("C1", "Open", 0, "A"),
            event("C1", "Assigned", 5, "A"),
            event("C1", "Transfer", 10, "B"),
            event("C1", "Transfer", 15, "A"),
        ];
        let sequences = queue_sequences(&events);
        let names: Vec<&str> = sequences[&CaseId::new("C1").unwrap()]
            .iter()
            .map(QueueId::as_str)
            .collect();
        assert_eq!(names, vec!["A", "B", "A"]);
    }

    #[test]
    fn filtered_queue_does_not_fabricate_transitivity() {
        let events = vec![
            event("C1", "Open", 0, "A"),
            event("C1", "Transfer", 10, "C"),
            event("C1", "Transfer", 20, "B"),
        ];
        let counts = queue_transition_counts(&queue_sequences(&events));
        assert_eq!(counts.get(&(queue("A"), queue("C"))), Some(&1));
        assert_eq!(counts.get(&(queue("C"), queue("B"))), Some(&1));

        let map = build(&events, &options(&["A", "B"], 1));
        assert!(map.graph.edges().is_empty());
        assert!(map.diagnostics.filtered_transition_counts.is_empty());
        assert_eq!(map.graph.nodes(), ["A", "B"]);
        assert_eq!(map.diagnostics.warnings, vec![QueueMapWarning::EmptyResult]);
    }

    #[test]
    fn single_queue_case_is_one_self_loop() {
        let events = vec![
            event("C1", "Open", 0, "A"),
            event("C1", "Assigned", 5, "A"),
            event("C1", "Pending", 9, "A"),
            event("C1", "Resolved", 30, "A"),
        ];
        let map = build(&events, &options(&["A"], 1));
        assert_eq!(map.diagnostics.self_loop_counts.get(&queue("A")), Some(&1));
        assert!(map.diagnostics.filtered_transition_counts.is_empty());
        assert_eq!(
            edge_keys(&map),
            vec![("A".to_string(), "A".to_string(), EdgeKind::SelfLoop)]
        );
        assert!(map.graph.only_self_loops());
    }

    #[test]
    fn transitions_first_then_self_loops() {
        let events = vec![
            event("C1", "Open", 0, "A"),
            event("C1", "Transfer", 5, "B"),
            event("C2", "Open", 0, "B"),
            event("C3", "Open", 0, "A"),
            event("C4", "Open", 0, "X"),
        ];
        let map = build(&events, &options(&["A", "B"], 1));
        assert_eq!(
            edge_keys(&map),
            vec![
                ("A".to_string(), "B".to_string(), EdgeKind::Transition),
                ("A".to_string(), "A".to_string(), EdgeKind::SelfLoop),
                ("B".to_string(), "B".to_string(), EdgeKind::SelfLoop),
            ]
        );
        assert!(
            map.graph
                .edges()
                .iter()
                .filter(|e| e.kind == EdgeKind::Transition)
                .all(|e| e.source != e.target)
        );
        assert_eq!(map.diagnostics.distinct_queues.len(), 3);
        assert_eq!(map.diagnostics.total_cases, 4);
    }

    #[test]
    fn raising_threshold_only_removes_edges() {
        let mut events = Vec::new();
        for (i, path) in [
            &["A", "B"][..],
            &["A", "B"],
            &["A", "B", "C"],
            &["B", "C"],
            &["C"],
            &["C"],
            &["A"],
        ]
        .iter()
        .enumerate()
        {
            let case = format!("C{i}");
            for (step, q) in path.iter().enumerate() {
                events.push(event(&case, "Step", i64::try_from(step).unwrap(), q));
            }
        }

        let base = build(&events, &options(&[], 1));
        let base_edges = edge_keys(&base);
        assert_eq!(base_edges.len(), 4);

        for threshold in [0, 2, 3, 10] {
            let pruned = build(&events, &options(&[], threshold));
            for edge in edge_keys(&pruned) {
                assert!(base_edges.contains(&edge), "{edge:?} absent at threshold 1");
            }
        }
        let at_two = build(&events, &options(&[], 2));
        assert_eq!(at_two.graph.edges().len(), 3);
    }

    #[test]
    fn empty_log_yields_nodes_only_graph() {
        let map = build(&[], &options(&["Q2", "Q1"], 1));
        assert_eq!(map.graph.nodes(), ["Q1", "Q2"]);
        assert!(map.graph.edges().is_empty());
        assert_eq!(
            map.diagnostics.warnings,
            vec![QueueMapWarning::EmptyInput, QueueMapWarning::EmptyResult]
        );
    }

    #[test]
    fn diagnostics_sample_is_bounded() {
        let events: Vec<Event> = (0..25)
            .map(|i| event(&format!("C{i:02}"), "Open", 0, "A"))
            .collect();
        let map = build(&events, &QueueMapOptions::default());
        assert_eq!(map.diagnostics.sequence_sample.len(), DIAGNOSTIC_SAMPLE_SIZE);
        assert_eq!(map.diagnostics.sequence_sample[0].case_id.as_str(), "C00");
        assert_eq!(map.diagnostics.total_cases, 25);
    }

    #[test]
    fn build_is_idempotent() {
        let events = vec![
            event("C1", "Open", 0, "A"),
            event("C1", "Transfer", 5, "B"),
            event("C2", "Open", 0, "B"),
        ];
        let opts = options(&["A", "B"], 1);
        assert_eq!(build(&events, &opts), build(&events, &opts));
    }
}
