//! Import command for loading a ticket event log into the local `SQLite` store.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use pm_core::EventLog;
use pm_db::{Database, ImportRecord};

/// Warnings printed individually before the rest are summarized.
const MAX_PRINTED_WARNINGS: usize = 5;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON Lines file to read. Reads stdin when omitted.
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Replace the stored log instead of appending to it.
    #[arg(long)]
    pub replace: bool,
}

/// Result of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub accepted: usize,
    pub inserted: usize,
    pub rejected: usize,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &ImportArgs) -> Result<ImportOutcome> {
    let (rows, source) = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            (parse_rows(BufReader::new(file))?, path.display().to_string())
        }
        None => (parse_rows(io::stdin().lock())?, "-".to_string()),
    };

    let log = EventLog::from_rows(rows).context("event log failed validation")?;
    let events = log.events();
    let inserted = if args.replace {
        db.replace_events(events)?
    } else {
        db.insert_events(events)?
    };

    let outcome = ImportOutcome {
        accepted: events.len(),
        inserted,
        rejected: log.rejected_rows(),
    };
    db.record_import(&ImportRecord::new(
        source,
        outcome.accepted,
        outcome.inserted,
        outcome.rejected,
    ))?;

    writeln!(
        writer,
        "Imported {} events ({} new, {} rows rejected)",
        outcome.accepted, outcome.inserted, outcome.rejected
    )?;
    let warnings = log.warnings();
    for warning in warnings.iter().take(MAX_PRINTED_WARNINGS) {
        writeln!(writer, "warning: {warning}")?;
    }
    if warnings.len() > MAX_PRINTED_WARNINGS {
        writeln!(
            writer,
            "... and {} more warnings",
            warnings.len() - MAX_PRINTED_WARNINGS
        )?;
    }

    Ok(outcome)
}

/// Reads one JSON value per non-blank line.
fn parse_rows<R: BufRead>(reader: R) -> Result<Vec<Value>> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let row: Value = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}
