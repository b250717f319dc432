//! Text and Graphviz rendering of process models.

use std::io::{self, Write};

use pm_core::{EdgeKind, GraphModel, format_duration};

/// Formats a rate in `[0, 1]` as a whole percentage.
pub fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

/// Writes a graph as a Graphviz `digraph`.
///
/// Transition edges are labelled with their count, plus duration and
/// compliance when present. Self-loops are dashed and labelled as stuck.
/// Graphs with only self-loops, or no edges, ask for a grid-like layout.
pub fn dot<W: Write>(writer: &mut W, graph: &GraphModel, name: &str) -> io::Result<()> {
    writeln!(writer, "digraph {} {{", quote(name))?;
    if graph.edges().is_empty() || graph.only_self_loops() {
        writeln!(writer, "  layout=circo;")?;
    } else {
        writeln!(writer, "  rankdir=LR;")?;
    }
    writeln!(writer, "  node [shape=box, style=rounded];")?;

    for node in graph.nodes() {
        writeln!(writer, "  {};", quote(node))?;
    }

    let max_weight = graph.edges().iter().map(|e| e.weight).max().unwrap_or(1);
    for edge in graph.edges() {
        // Label lines are joined with a DOT `\n` escape, not a raw newline.
        let mut lines = vec![edge.weight.to_string()];
        if let Some(duration) = edge.duration_secs {
            lines.push(format_duration(duration));
        }
        if let Some(rate) = edge.compliance_rate {
            lines.push(format!("SLA {}", percent(rate)));
        }
        let (label, style) = match edge.kind {
            EdgeKind::Transition => (lines.join("\\n"), ""),
            EdgeKind::SelfLoop => (
                format!("stuck: {}", lines.join("\\n")),
                ", style=dashed, color=red",
            ),
        };
        writeln!(
            writer,
            "  {} -> {} [label=\"{label}\", penwidth={:.1}{style}];",
            quote(&edge.source),
            quote(&edge.target),
            pen_width(edge.weight, max_weight),
        )?;
    }

    writeln!(writer, "}}")
}

/// Edge width between 1 and 5, scaled by weight.
#[allow(clippy::cast_precision_loss)]
fn pen_width(weight: u64, max: u64) -> f64 {
    if max == 0 {
        return 1.0;
    }
    (weight as f64 / max as f64).mul_add(4.0, 1.0)
}

/// A DOT double-quoted string.
fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use pm_core::GraphEdge;

    fn render(graph: &GraphModel, name: &str) -> String {
        let mut output = Vec::new();
        dot(&mut output, graph, name).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(0.666), "67%");
        assert_eq!(percent(1.0), "100%");
    }

    #[test]
    fn dot_renders_transitions_and_self_loops() {
        let mut flow = GraphEdge::transition("Q1", "Q2", 4);
        flow.duration_secs = Some(3661.0);
        flow.compliance_rate = Some(0.5);
        let graph = GraphModel::new(Vec::new(), vec![flow, GraphEdge::self_loop("Q1", 2)]);

        assert_snapshot!(render(&graph, "queues"), @r#"
        digraph "queues" {
          rankdir=LR;
          node [shape=box, style=rounded];
          "Q1";
          "Q2";
          "Q1" -> "Q2" [label="4\n1 hr 1 min 1 sec\nSLA 50%", penwidth=5.0];
          "Q1" -> "Q1" [label="stuck: 2", penwidth=3.0, style=dashed, color=red];
        }
        "#);
    }

    #[test]
    fn dot_draws_repeated_activity_as_plain_edge() {
        let graph = GraphModel::new(Vec::new(), vec![GraphEdge::transition("Assigned", "Assigned", 3)]);

        assert_snapshot!(render(&graph, "dfg"), @r#"
        digraph "dfg" {
          rankdir=LR;
          node [shape=box, style=rounded];
          "Assigned";
          "Assigned" -> "Assigned" [label="3", penwidth=5.0];
        }
        "#);
    }

    #[test]
    fn dot_of_nodes_only_graph() {
        let graph = GraphModel::new(vec!["Say \"hi\"".to_string()], Vec::new());
        assert_snapshot!(render(&graph, "empty"), @r#"
        digraph "empty" {
          layout=circo;
          node [shape=box, style=rounded];
          "Say \"hi\"";
        }
        "#);
    }

    #[test]
    fn quote_escapes_backslashes_and_newlines() {
        assert_eq!(quote(r"C:\queue"), r#""C:\\queue""#);
        assert_eq!(quote("two\nlines"), r#""two\nlines""#);
        assert_eq!(quote("end\\"), r#""end\\""#);
        assert_eq!(quote("crlf\r\n"), r#""crlf\n""#);
    }
}
