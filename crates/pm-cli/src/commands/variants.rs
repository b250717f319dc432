//! Workflow variants.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use pm_core::variant::{self, Variant};
use pm_core::VariantScope;
use pm_db::Database;

use super::util::{load_log, parse_queues, select_queues};
use crate::Config;

#[derive(Debug, Args)]
pub struct VariantsArgs {
    /// Grouping: `global` or `per-queue`.
    #[arg(long, default_value = "per-queue")]
    pub scope: VariantScope,

    /// Only use events in these queues. Repeatable.
    #[arg(long = "queue", value_name = "QUEUE")]
    pub queues: Vec<String>,

    /// Show only the most frequent variants.
    #[arg(long)]
    pub top: Option<usize>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Store the ranked catalog in the `variants` table.
    #[arg(long)]
    pub save: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config, args: &VariantsArgs) -> Result<()> {
    let log = load_log(db, config)?;
    let events = select_queues(log.events(), &parse_queues(&args.queues)?);

    let mut variants = variant::discover(&events, args.scope);
    variant::rank_by_frequency(&mut variants);

    if args.save {
        let saved = db.replace_variants(&variants)?;
        tracing::info!(saved, "saved variants");
    }

    let shown = args.top.map_or(variants.as_slice(), |n| &variants[..n.min(variants.len())]);
    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(shown)?)?;
    } else {
        write_table(writer, shown, variants.len())?;
    }
    Ok(())
}

fn write_table<W: Write>(writer: &mut W, variants: &[Variant], total: usize) -> Result<()> {
    if variants.is_empty() {
        writeln!(writer, "No variants found.")?;
        return Ok(());
    }

    writeln!(writer, "TOP WORKFLOW VARIANTS")?;
    for v in variants {
        let label = match (&v.queue_id, v.variant_id) {
            (Some(queue), Some(id)) => format!("{queue} #{id}"),
            _ => "*".to_string(),
        };
        writeln!(writer, "{:>5}  {label:<10} {}", v.count, v.sequence)?;
    }
    if total > variants.len() {
        writeln!(writer, "... and {} more", total - variants.len())?;
    }
    Ok(())
}
