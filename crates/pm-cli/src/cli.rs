//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::dfg::DfgArgs;
use crate::commands::import::ImportArgs;
use crate::commands::queue_map::QueueMapArgs;
use crate::commands::summary::SummaryArgs;
use crate::commands::variants::VariantsArgs;

/// Ticket flow mining.
///
/// Imports a ticket event log and derives process models from it: a
/// performance-annotated directly-follows graph, a queue transition map and a
/// catalog of workflow variants.
#[derive(Debug, Parser)]
#[command(name = "pm", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import events from JSON Lines (one event object per line).
    Import(ImportArgs),

    /// Show what is stored in the database.
    Status,

    /// Directly-follows graph with durations and compliance.
    Dfg(DfgArgs),

    /// Queue transition map of flowing and stuck tickets.
    QueueMap(QueueMapArgs),

    /// Distinct activity sequences and how many tickets follow each.
    Variants(VariantsArgs),

    /// Per-queue summary and service KPIs.
    Summary(SummaryArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;
    use pm_core::{MetricMode, VariantScope};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dfg_parses_metric_mode() {
        let cli = Cli::parse_from(["pm", "dfg", "--metric", "median", "--per-queue"]);
        let Some(Commands::Dfg(args)) = cli.command else {
            panic!("expected dfg command");
        };
        assert_eq!(args.metric, MetricMode::Median);
        assert!(args.per_queue);
    }

    #[test]
    fn dfg_rejects_unknown_metric_mode() {
        let result = Cli::try_parse_from(["pm", "dfg", "--metric", "p95"]);
        assert!(result.is_err());
    }

    #[test]
    fn variants_scope_defaults_to_per_queue() {
        let cli = Cli::parse_from(["pm", "variants"]);
        let Some(Commands::Variants(args)) = cli.command else {
            panic!("expected variants command");
        };
        assert_eq!(args.scope, VariantScope::PerQueue);
    }

    #[test]
    fn queue_map_collects_repeated_queues() {
        let cli = Cli::parse_from([
            "pm",
            "queue-map",
            "--queue",
            "Q1",
            "--queue",
            "Q2",
            "--min-edge-threshold",
            "3",
        ]);
        let Some(Commands::QueueMap(args)) = cli.command else {
            panic!("expected queue-map command");
        };
        assert_eq!(args.queues, vec!["Q1", "Q2"]);
        assert_eq!(args.min_edge_threshold, Some(3));
    }
}
