//! Queue summary and service KPIs.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pm_core::{Kpis, QueueSummary, format_duration, kpis, queue_summary};
use pm_db::Database;

use super::render::percent;
use super::util::load_log;
use crate::Config;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Store the queue summary in the `queue_summary` table.
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
struct SummaryJson<'a> {
    kpis: &'a Kpis,
    queues: &'a [QueueSummary],
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, config: &Config, args: &SummaryArgs) -> Result<()> {
    let log = load_log(db, config)?;
    let queues = queue_summary(log.events());
    let kpis = kpis(log.events(), &config.kpi);

    if args.save {
        let saved = db.replace_queue_summary(&queues)?;
        tracing::info!(saved, "saved queue summary");
    }

    if args.json {
        let report = SummaryJson {
            kpis: &kpis,
            queues: &queues,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    writeln!(writer, "SUMMARY")?;
    writeln!(writer, "───────")?;
    writeln!(writer, "Tickets:          {}", kpis.total_cases)?;
    writeln!(writer, "SLA compliance:   {}", or_dash(kpis.compliance_rate.map(percent)))?;
    writeln!(
        writer,
        "MTTR (hours):     {}",
        or_dash(kpis.mttr_hours.map(|h| format!("{h:.2}")))
    )?;
    writeln!(
        writer,
        "MTTA (minutes):   {}",
        or_dash(kpis.mtta_minutes.map(|m| format!("{m:.2}")))
    )?;

    if queues.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "BY QUEUE")?;
    writeln!(writer, "────────")?;
    for q in &queues {
        writeln!(
            writer,
            "{:<10} tickets {:>4}  events {:>5}  SLA {:>4}  avg step {}",
            q.queue_id.as_str(),
            q.cases,
            q.events,
            percent(q.compliance_rate),
            or_dash(q.avg_step_secs.map(format_duration)),
        )?;
    }
    Ok(())
}
