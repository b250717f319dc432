//! Status command for showing the stored event log.

use std::io::Write;

use anyhow::Result;

use pm_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let stats = db.log_stats()?;

    writeln!(writer, "Ticket flow status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    if stats.events == 0 {
        writeln!(writer, "No events recorded.")?;
        writeln!(writer, "Hint: Run 'pm import --file <events.jsonl>' to load a log.")?;
        return Ok(());
    }

    writeln!(writer, "Events: {}", stats.events)?;
    writeln!(writer, "Cases:  {}", stats.cases)?;
    writeln!(writer, "Queues: {}", stats.queues)?;
    if let (Some(first), Some(last)) = (stats.first_event, stats.last_event) {
        writeln!(writer, "Span:   {} .. {}", first.to_rfc3339(), last.to_rfc3339())?;
    }
    if let Some(import) = db.last_import()? {
        writeln!(
            writer,
            "Last import: {} from {} ({} accepted, {} new, {} rejected)",
            import.imported_at.format("%Y-%m-%d %H:%M:%S UTC"),
            import.source,
            import.accepted,
            import.inserted,
            import.rejected
        )?;
    }

    Ok(())
}
