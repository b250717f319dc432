//! Queue transition map: where tickets flow and where they get stuck.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use pm_core::queue_map::{self, Diagnostics, QueueMap, QueueMapOptions, QueueMapWarning};
use pm_core::{EdgeKind, QueueId};
use pm_db::Database;

use super::render;
use super::util::{load_log, parse_queues};
use crate::Config;

#[derive(Debug, Args)]
pub struct QueueMapArgs {
    /// Queues to show. Repeatable. Defaults to every queue.
    #[arg(long = "queue", value_name = "QUEUE")]
    pub queues: Vec<String>,

    /// Minimum count for an edge to be shown. Defaults to the configured value.
    #[arg(long)]
    pub min_edge_threshold: Option<u64>,

    /// Also print pipeline diagnostics.
    #[arg(long)]
    pub diagnostics: bool,

    /// Print JSON (graph and diagnostics) instead of text.
    #[arg(long, conflicts_with = "dot")]
    pub json: bool,

    /// Print a Graphviz DOT graph instead of text.
    #[arg(long)]
    pub dot: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config, args: &QueueMapArgs) -> Result<()> {
    // The whole log goes in: queue continuity is judged before selection.
    let log = load_log(db, config)?;
    let options = QueueMapOptions {
        selected_queues: parse_queues(&args.queues)?,
        min_edge_threshold: args
            .min_edge_threshold
            .unwrap_or(config.queue_map.min_edge_threshold),
    };
    let map = queue_map::build(log.events(), &options);

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&map)?)?;
    } else if args.dot {
        render::dot(writer, &map.graph, "queues")?;
    } else {
        write_text(writer, &map)?;
        if args.diagnostics {
            write_diagnostics(writer, &map.diagnostics)?;
        }
    }
    Ok(())
}

fn write_text<W: Write>(writer: &mut W, map: &QueueMap) -> Result<()> {
    writeln!(writer, "QUEUE MAP")?;
    writeln!(writer, "Nodes: {}", map.graph.nodes().join(", "))?;
    if map.graph.edges().is_empty() {
        writeln!(writer, "No transitions or stuck tickets above threshold.")?;
        return Ok(());
    }
    for edge in map.graph.edges() {
        match edge.kind {
            EdgeKind::Transition => {
                writeln!(writer, "  flow   {} -> {}  x{}", edge.source, edge.target, edge.weight)?;
            }
            EdgeKind::SelfLoop => {
                writeln!(writer, "  stuck  {}  x{}", edge.source, edge.weight)?;
            }
        }
    }
    Ok(())
}

fn join(queues: &[QueueId]) -> String {
    queues.iter().map(QueueId::as_str).collect::<Vec<_>>().join(", ")
}

fn write_diagnostics<W: Write>(writer: &mut W, diagnostics: &Diagnostics) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "DIAGNOSTICS")?;
    writeln!(writer, "Distinct queues: {}", join(&diagnostics.distinct_queues))?;
    writeln!(writer, "Selected queues: {}", join(&diagnostics.selected_queues))?;
    writeln!(writer, "Total cases:     {}", diagnostics.total_cases)?;
    writeln!(writer, "Sequence sample:")?;
    for sample in &diagnostics.sequence_sample {
        let path = sample
            .queues
            .iter()
            .map(QueueId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        writeln!(writer, "  {}: {path}", sample.case_id)?;
    }
    writeln!(writer, "Filtered transitions:")?;
    for t in &diagnostics.filtered_transition_counts {
        writeln!(writer, "  {} -> {}: {}", t.source, t.target, t.count)?;
    }
    writeln!(writer, "Self-loops:")?;
    for (queue, count) in &diagnostics.self_loop_counts {
        writeln!(writer, "  {queue}: {count}")?;
    }
    for warning in &diagnostics.warnings {
        let message = match warning {
            QueueMapWarning::EmptyInput => "the event log is empty",
            QueueMapWarning::EmptyResult => "no edges passed the selection and threshold",
        };
        writeln!(writer, "Warning: {message}")?;
    }
    Ok(())
}
