//! Renderer-independent directed graph model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::transition::{MetricMode, Transition};

/// What an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Flow from one node to a different node.
    Transition,
    /// A node returning to itself. In a queue map: cases that never left the queue.
    SelfLoop,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transition => "transition",
            Self::SelfLoop => "self_loop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_rate: Option<f64>,
}

impl GraphEdge {
    /// A flow edge. `source` and `target` may be equal, as with a repeated
    /// activity in a DFG.
    pub fn transition(source: impl Into<String>, target: impl Into<String>, weight: u64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
            kind: EdgeKind::Transition,
            duration_secs: None,
            compliance_rate: None,
        }
    }

    /// A node pointing back at itself, counting cases that stayed there.
    pub fn self_loop(node: impl Into<String>, weight: u64) -> Self {
        let node = node.into();
        Self {
            source: node.clone(),
            target: node,
            weight,
            kind: EdgeKind::SelfLoop,
            duration_secs: None,
            compliance_rate: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.kind == EdgeKind::SelfLoop
    }
}

/// Running totals for one merged activity edge.
struct Merged {
    mode: MetricMode,
    parts: usize,
    count: u64,
    duration: f64,
    compliance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeDegree {
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Nodes plus weighted, attributed edges.
///
/// Every edge endpoint is a node. Nodes may also exist without edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphModel {
    nodes: Vec<String>,
    edges: Vec<GraphEdge>,
}

impl GraphModel {
    /// Builds a graph from explicit nodes and edges.
    ///
    /// Edge endpoints missing from `nodes` are added. Nodes are sorted and
    /// deduplicated; edges keep their given order.
    pub fn new(nodes: impl IntoIterator<Item = String>, edges: Vec<GraphEdge>) -> Self {
        let mut nodes: Vec<String> = nodes.into_iter().collect();
        for edge in &edges {
            nodes.push(edge.source.clone());
            nodes.push(edge.target.clone());
        }
        nodes.sort();
        nodes.dedup();
        Self { nodes, edges }
    }

    /// Activity graph of a set of transitions.
    ///
    /// Every edge is a [`EdgeKind::Transition`], including `A -> A`.
    /// Transitions that differ only by queue are merged: counts add up,
    /// compliance is a count-weighted mean, and durations combine by mode
    /// (weighted mean for avg, sum for total). Medians of several queues
    /// cannot be combined, so such a merged edge has no duration; build the
    /// graph from a global aggregation to get one.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_transitions(transitions: &[Transition]) -> Self {
        let mut merged: BTreeMap<(&str, &str), Merged> = BTreeMap::new();
        for t in transitions {
            let weight = t.count as f64;
            let duration = match t.mode {
                MetricMode::Total => t.duration_secs,
                MetricMode::Avg | MetricMode::Median => t.duration_secs * weight,
            };
            let m = merged
                .entry((t.source.as_str(), t.target.as_str()))
                .or_insert(Merged {
                    mode: t.mode,
                    parts: 0,
                    count: 0,
                    duration: 0.0,
                    compliance: 0.0,
                });
            m.parts += 1;
            m.count += t.count;
            m.duration += duration;
            m.compliance += t.compliance_rate * weight;
        }

        let edges = merged
            .into_iter()
            .map(|((source, target), m)| {
                let count = m.count as f64;
                let mut edge = GraphEdge::transition(source, target, m.count);
                edge.duration_secs = match m.mode {
                    MetricMode::Total => Some(m.duration),
                    MetricMode::Avg => Some(m.duration / count),
                    MetricMode::Median if m.parts == 1 => Some(m.duration / count),
                    MetricMode::Median => None,
                };
                edge.compliance_rate = Some(m.compliance / count);
                edge
            })
            .collect();
        Self::new(Vec::new(), edges)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Degree of one node. A self-loop counts once in each direction.
    pub fn degree(&self, node: &str) -> NodeDegree {
        self.edges.iter().fold(NodeDegree::default(), |mut d, e| {
            if e.source == node {
                d.out_degree += 1;
            }
            if e.target == node {
                d.in_degree += 1;
            }
            d
        })
    }

    /// Degrees of all nodes, keyed by node.
    pub fn degrees(&self) -> BTreeMap<&str, NodeDegree> {
        let mut degrees: BTreeMap<&str, NodeDegree> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), NodeDegree::default()))
            .collect();
        for edge in &self.edges {
            if let Some(d) = degrees.get_mut(edge.source.as_str()) {
                d.out_degree += 1;
            }
            if let Some(d) = degrees.get_mut(edge.target.as_str()) {
                d.in_degree += 1;
            }
        }
        degrees
    }

    /// True when there is at least one edge and every edge is a self-loop.
    pub fn only_self_loops(&self) -> bool {
        !self.edges.is_empty() && self.edges.iter().all(GraphEdge::is_self_loop)
    }
}
