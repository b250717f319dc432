//! Performance directly-follows graph.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use pm_core::{GraphModel, MetricMode, Transition, TransitionScope, directly_follows, format_duration};
use pm_db::Database;

use super::render;
use super::util::{load_log, parse_queues, select_queues};
use crate::Config;

#[derive(Debug, Args)]
pub struct DfgArgs {
    /// Duration statistic per transition: avg, median or total.
    #[arg(long, default_value = "avg")]
    pub metric: MetricMode,

    /// Key transitions by the queue each ticket was opened in.
    #[arg(long)]
    pub per_queue: bool,

    /// Only use events in these queues. Repeatable.
    #[arg(long = "queue", value_name = "QUEUE")]
    pub queues: Vec<String>,

    /// Print JSON instead of a table.
    #[arg(long, conflicts_with = "dot")]
    pub json: bool,

    /// Print a Graphviz DOT graph instead of a table. The graph merges queues.
    #[arg(long)]
    pub dot: bool,

    /// Store the result in the `dfg_edges` table.
    #[arg(long)]
    pub save: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config, args: &DfgArgs) -> Result<()> {
    let log = load_log(db, config)?;
    let events = select_queues(log.events(), &parse_queues(&args.queues)?);
    let scope = if args.per_queue {
        TransitionScope::PerQueue
    } else {
        TransitionScope::Global
    };
    let transitions = directly_follows(&events, args.metric, scope)?;

    if args.save {
        let saved = db.replace_dfg_edges(&transitions)?;
        tracing::info!(saved, "saved dfg edges");
    }

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&transitions)?)?;
    } else if args.dot {
        // The activity graph has no queue dimension; aggregate it globally so
        // medians come from the raw step durations.
        let graph = if args.per_queue {
            let global = directly_follows(&events, args.metric, TransitionScope::Global)?;
            GraphModel::from_transitions(&global)
        } else {
            GraphModel::from_transitions(&transitions)
        };
        render::dot(writer, &graph, "dfg")?;
    } else {
        write_table(writer, &transitions, args.metric)?;
    }
    Ok(())
}

fn write_table<W: Write>(writer: &mut W, transitions: &[Transition], mode: MetricMode) -> Result<()> {
    if transitions.is_empty() {
        writeln!(writer, "No transitions found.")?;
        return Ok(());
    }

    writeln!(writer, "DIRECTLY-FOLLOWS GRAPH ({mode} duration)")?;
    for t in transitions {
        let queue = t
            .queue_id
            .as_ref()
            .map(|q| format!("[{q}] "))
            .unwrap_or_default();
        writeln!(
            writer,
            "{queue}{} -> {}  x{}  {}  SLA {}",
            t.source,
            t.target,
            t.count,
            format_duration(t.duration_secs),
            render::percent(t.compliance_rate),
        )?;
    }
    Ok(())
}
