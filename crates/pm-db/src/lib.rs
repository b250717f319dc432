//! Storage layer for ticket flow mining.
//!
//! Persists the event log and derived summaries using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Use one `Database` per thread or wrap it in a `Mutex`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 with millisecond precision and a
//! `Z` suffix (e.g., `2025-03-01T09:30:00.000Z`), so lexicographic order is
//! chronological order.
//!
//! ## Event Order
//!
//! `events.seq` is the insertion order. It is loaded back as
//! [`Event::position`] so timestamp ties sort the way they were imported.
//!
//! ## Duplicate Events
//!
//! `events.occurrence` numbers identical rows within one batch (0, 1, ...).
//! Repeats inside a batch are kept; a batch that is already stored inserts
//! nothing.
//!
//! ## Derived Tables
//!
//! `dfg_edges`, `queue_summary` and `variants` are snapshots. Each save
//! replaces the whole table.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use pm_core::{
    CaseId, Event, MetricMode, QueueId, QueueSummary, Transition, ValidationError, Variant,
};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for event {seq}: {timestamp}")]
    TimestampParse {
        seq: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored event has an invalid identifier.
    #[error("invalid event data for event {seq}")]
    InvalidEventData {
        seq: i64,
        #[source]
        source: ValidationError,
    },
    /// A derived-table row could not be decoded.
    #[error("invalid row in {table}: {message}")]
    InvalidRow {
        table: &'static str,
        message: String,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// One completed import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub id: String,
    pub imported_at: DateTime<Utc>,
    /// File path, or `-` for stdin.
    pub source: String,
    pub accepted: usize,
    pub inserted: usize,
    pub rejected: usize,
}

impl ImportRecord {
    pub fn new(source: impl Into<String>, accepted: usize, inserted: usize, rejected: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            imported_at: Utc::now(),
            source: source.into(),
            accepted,
            inserted,
            rejected,
        }
    }
}

/// Size of the stored event log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    pub events: usize,
    pub cases: usize,
    pub queues: usize,
    pub first_event: Option<DateTime<Utc>>,
    pub last_event: Option<DateTime<Utc>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: the ticket event log
            -- timestamp: RFC 3339, millisecond precision, UTC
            -- sla_met: 1, 0 or NULL when unknown
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                case_id TEXT NOT NULL,
                activity TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                queue_id TEXT NOT NULL,
                sla_met INTEGER,
                occurrence INTEGER NOT NULL DEFAULT 0,
                UNIQUE (case_id, activity, timestamp, queue_id, occurrence)
            );

            CREATE INDEX IF NOT EXISTS idx_events_case ON events(case_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_queue ON events(queue_id);

            CREATE TABLE IF NOT EXISTS imports (
                id TEXT PRIMARY KEY,
                imported_at TEXT NOT NULL,
                source TEXT NOT NULL,
                accepted INTEGER NOT NULL,
                inserted INTEGER NOT NULL,
                rejected INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dfg_edges (
                queue_id TEXT,
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                count INTEGER NOT NULL,
                duration_secs REAL NOT NULL,
                compliance_rate REAL NOT NULL,
                mode TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS queue_summary (
                queue_id TEXT PRIMARY KEY,
                cases INTEGER NOT NULL,
                events INTEGER NOT NULL,
                compliance_rate REAL NOT NULL,
                avg_step_secs REAL
            );

            CREATE TABLE IF NOT EXISTS variants (
                queue_id TEXT,
                variant_id INTEGER,
                sequence TEXT NOT NULL,
                count INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Appends events, skipping rows that are already stored.
    ///
    /// Identical rows within `events` are all kept. Returns the number of rows
    /// inserted.
    pub fn insert_events(&mut self, events: &[Event]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let inserted = insert_event_rows(&tx, events)?;
        tx.commit()?;
        tracing::debug!(inserted, total = events.len(), "inserted events");
        Ok(inserted)
    }

    /// Replaces the whole event log and drops derived snapshots.
    pub fn replace_events(&mut self, events: &[Event]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            DELETE FROM events;
            DELETE FROM dfg_edges;
            DELETE FROM queue_summary;
            DELETE FROM variants;
            ",
        )?;
        let inserted = insert_event_rows(&tx, events)?;
        tx.commit()?;
        tracing::debug!(inserted, "replaced event log");
        Ok(inserted)
    }

    /// Lists all events in insertion order.
    pub fn list_events(&self) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT seq, case_id, activity, timestamp, queue_id, sla_met
            FROM events
            ORDER BY seq ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredEvent {
                seq: row.get(0)?,
                case_id: row.get(1)?,
                activity: row.get(2)?,
                timestamp: row.get(3)?,
                queue_id: row.get(4)?,
                sla_met: row.get(5)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    /// Counts stored events, distinct cases and queues, and the time span.
    pub fn log_stats(&self) -> Result<LogStats, DbError> {
        let (events, cases, queues, first, last): (i64, i64, i64, Option<String>, Option<String>) =
            self.conn.query_row(
                "
                SELECT COUNT(*), COUNT(DISTINCT case_id), COUNT(DISTINCT queue_id),
                       MIN(timestamp), MAX(timestamp)
                FROM events
                ",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )?;
        Ok(LogStats {
            events: to_usize(events),
            cases: to_usize(cases),
            queues: to_usize(queues),
            first_event: first.map(|ts| parse_timestamp(&ts, 0)).transpose()?,
            last_event: last.map(|ts| parse_timestamp(&ts, 0)).transpose()?,
        })
    }

    pub fn record_import(&self, record: &ImportRecord) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO imports (id, imported_at, source, accepted, inserted, rejected)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                record.id,
                format_timestamp(record.imported_at),
                record.source,
                to_i64(record.accepted),
                to_i64(record.inserted),
                to_i64(record.rejected),
            ],
        )?;
        Ok(())
    }

    /// The most recent import, if any.
    pub fn last_import(&self) -> Result<Option<ImportRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, imported_at, source, accepted, inserted, rejected
                FROM imports
                ORDER BY imported_at DESC, rowid DESC
                LIMIT 1
                ",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?;
        row.map(
            |(id, imported_at, source, accepted, inserted, rejected)| -> Result<_, DbError> {
                Ok(ImportRecord {
                    id,
                    imported_at: parse_timestamp(&imported_at, 0)?,
                    source,
                    accepted: to_usize(accepted),
                    inserted: to_usize(inserted),
                    rejected: to_usize(rejected),
                })
            },
        )
        .transpose()
    }

    /// Replaces the stored DFG snapshot.
    pub fn replace_dfg_edges(&mut self, transitions: &[Transition]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM dfg_edges", [])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO dfg_edges
                (queue_id, source, target, count, duration_secs, compliance_rate, mode)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for t in transitions {
                stmt.execute(params![
                    t.queue_id.as_ref().map(QueueId::as_str),
                    t.source,
                    t.target,
                    u64_to_i64(t.count),
                    t.duration_secs,
                    t.compliance_rate,
                    t.mode.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(transitions.len())
    }

    pub fn list_dfg_edges(&self) -> Result<Vec<Transition>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT queue_id, source, target, count, duration_secs, compliance_rate, mode
            FROM dfg_edges
            ORDER BY queue_id, source, target
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut transitions = Vec::new();
        for row in rows {
            let (queue_id, source, target, count, duration_secs, compliance_rate, mode) = row?;
            transitions.push(Transition {
                queue_id: optional_queue("dfg_edges", queue_id)?,
                source,
                target,
                count: i64_to_u64(count),
                duration_secs,
                compliance_rate,
                mode: MetricMode::from_str(&mode).map_err(|err| DbError::InvalidRow {
                    table: "dfg_edges",
                    message: err.to_string(),
                })?,
            });
        }
        Ok(transitions)
    }

    /// Replaces the stored queue summary.
    pub fn replace_queue_summary(&mut self, summary: &[QueueSummary]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM queue_summary", [])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO queue_summary (queue_id, cases, events, compliance_rate, avg_step_secs)
                VALUES (?, ?, ?, ?, ?)
                ",
            )?;
            for q in summary {
                stmt.execute(params![
                    q.queue_id.as_str(),
                    to_i64(q.cases),
                    to_i64(q.events),
                    q.compliance_rate,
                    q.avg_step_secs,
                ])?;
            }
        }
        tx.commit()?;
        Ok(summary.len())
    }

    pub fn list_queue_summary(&self) -> Result<Vec<QueueSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT queue_id, cases, events, compliance_rate, avg_step_secs
            FROM queue_summary
            ORDER BY queue_id
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        })?;
        let mut summary = Vec::new();
        for row in rows {
            let (queue_id, cases, events, compliance_rate, avg_step_secs) = row?;
            summary.push(QueueSummary {
                queue_id: queue("queue_summary", queue_id)?,
                cases: to_usize(cases),
                events: to_usize(events),
                compliance_rate,
                avg_step_secs,
            });
        }
        Ok(summary)
    }

    /// Replaces the stored variant catalog. Member case lists are not stored.
    pub fn replace_variants(&mut self, variants: &[Variant]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM variants", [])?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO variants (queue_id, variant_id, sequence, count)
                VALUES (?, ?, ?, ?)
                ",
            )?;
            for v in variants {
                stmt.execute(params![
                    v.queue_id.as_ref().map(QueueId::as_str),
                    v.variant_id,
                    v.sequence,
                    u64_to_i64(v.count),
                ])?;
            }
        }
        tx.commit()?;
        Ok(variants.len())
    }

    /// Lists stored variants in save order.
    pub fn list_variants(&self) -> Result<Vec<Variant>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT queue_id, variant_id, sequence, count
            FROM variants
            ORDER BY rowid
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<u32>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut variants = Vec::new();
        for row in rows {
            let (queue_id, variant_id, sequence, count) = row?;
            variants.push(Variant {
                queue_id: optional_queue("variants", queue_id)?,
                variant_id,
                sequence,
                count: i64_to_u64(count),
                cases: Vec::new(),
            });
        }
        Ok(variants)
    }
}

/// An `events` row before validation.
struct StoredEvent {
    seq: i64,
    case_id: String,
    activity: String,
    timestamp: String,
    queue_id: String,
    sla_met: Option<bool>,
}

impl StoredEvent {
    fn into_event(self) -> Result<Event, DbError> {
        let invalid = |source| DbError::InvalidEventData {
            seq: self.seq,
            source,
        };
        let case_id = CaseId::new(self.case_id.as_str()).map_err(invalid)?;
        let queue_id = QueueId::new(self.queue_id.as_str()).map_err(invalid)?;
        let timestamp = parse_timestamp(&self.timestamp, self.seq)?;
        Ok(
            Event::new(case_id, self.activity, timestamp, queue_id, i64_to_u64(self.seq))
                .with_sla(self.sla_met),
        )
    }
}

fn insert_event_rows(conn: &Connection, events: &[Event]) -> Result<usize, DbError> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO events (case_id, activity, timestamp, queue_id, sla_met, occurrence)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )?;
    let mut seen: HashMap<(&str, &str, String, &str), i64> = HashMap::new();
    let mut inserted = 0;
    for event in events {
        let timestamp = format_timestamp(event.timestamp);
        let occurrence = seen
            .entry((
                event.case_id.as_str(),
                event.activity.as_str(),
                timestamp.clone(),
                event.queue_id.as_str(),
            ))
            .or_insert(-1);
        *occurrence += 1;
        inserted += stmt.execute(params![
            event.case_id.as_str(),
            event.activity,
            timestamp,
            event.queue_id.as_str(),
            event.sla_met,
            *occurrence,
        ])?;
    }
    Ok(inserted)
}

fn queue(table: &'static str, value: String) -> Result<QueueId, DbError> {
    QueueId::new(value).map_err(|err| DbError::InvalidRow {
        table,
        message: err.to_string(),
    })
}

fn optional_queue(table: &'static str, value: Option<String>) -> Result<Option<QueueId>, DbError> {
    value.map(|v| queue(table, v)).transpose()
}

fn parse_timestamp(timestamp: &str, seq: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            seq,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn i64_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pm_core::{TransitionScope, VariantScope, directly_follows, variant};
    use std::collections::HashSet;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn event(case: &str, activity: &str, minutes: i64, queue: &str) -> Event {
        Event::new(
            CaseId::new(case).unwrap(),
            activity,
            at(minutes),
            QueueId::new(queue).unwrap(),
            0,
        )
    }

    fn sample_events() -> Vec<Event> {
        vec![
            event("C1", "Open", 0, "Q1").with_sla(Some(true)),
            event("C1", "Assigned", 10, "Q1").with_sla(Some(false)),
            event("C1", "Resolved", 40, "Q2"),
            event("C2", "Open", 5, "Q2"),
        ]
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "events"),
            vec![
                "seq",
                "case_id",
                "activity",
                "timestamp",
                "queue_id",
                "sla_met",
                "occurrence",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "imports"),
            vec!["id", "imported_at", "source", "accepted", "inserted", "rejected"]
        );
        assert_eq!(
            table_columns(&db.conn, "dfg_edges"),
            vec![
                "queue_id",
                "source",
                "target",
                "count",
                "duration_secs",
                "compliance_rate",
                "mode",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "queue_summary"),
            vec!["queue_id", "cases", "events", "compliance_rate", "avg_step_secs"]
        );
        assert_eq!(
            table_columns(&db.conn, "variants"),
            vec!["queue_id", "variant_id", "sequence", "count"]
        );

        let event_indexes = index_names(&db.conn, "events");
        assert!(event_indexes.contains("idx_events_case"));
        assert!(event_indexes.contains("idx_events_queue"));
    }

    #[test]
    fn insert_events_is_idempotent() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let events = sample_events();

        assert_eq!(db.insert_events(&events).unwrap(), 4);
        assert_eq!(db.insert_events(&events).unwrap(), 0);

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn repeated_rows_within_a_batch_are_kept() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let events = vec![
            event("C1", "Open", 0, "Q1"),
            event("C1", "Reassigned", 5, "Q1"),
            event("C1", "Reassigned", 5, "Q1"),
            event("C1", "Closed", 9, "Q1"),
        ];

        assert_eq!(db.insert_events(&events).unwrap(), 4);
        assert_eq!(db.insert_events(&events).unwrap(), 0);
        assert_eq!(db.insert_events(&events[..2]).unwrap(), 0);

        let stored = db.list_events().unwrap();
        assert_eq!(stored.len(), 4);
        let transitions =
            directly_follows(&stored, MetricMode::Total, TransitionScope::Global).unwrap();
        let steps: u64 = transitions.iter().map(|t| t.count).sum();
        assert_eq!(steps, 3);
    }

    #[test]
    fn list_events_round_trips_in_insertion_order() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_events(&sample_events()).unwrap();

        let events = db.list_events().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].case_id.as_str(), "C1");
        assert_eq!(events[0].timestamp, at(0));
        assert_eq!(events[0].sla_met, Some(true));
        assert_eq!(events[1].sla_met, Some(false));
        assert_eq!(events[2].sla_met, None);
        assert_eq!(events[2].queue_id.as_str(), "Q2");

        let positions: Vec<u64> = events.iter().map(|e| e.position).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let flag: Option<bool> = db
            .conn
            .query_row("SELECT sla_met FROM events WHERE seq = 2", [], |row| row.get(0))
            .unwrap();
        assert_eq!(flag, Some(false));
    }

    #[test]
    fn invalid_stored_timestamp_is_reported() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.conn
            .execute(
                "INSERT INTO events (case_id, activity, timestamp, queue_id) VALUES ('C1', 'Open', 'nope', 'Q1')",
                [],
            )
            .unwrap();

        let err = db.list_events().unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { seq: 1, .. }));
    }

    #[test]
    fn replace_events_clears_derived_tables() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let events = sample_events();
        db.insert_events(&events).unwrap();
        let transitions =
            directly_follows(&events, MetricMode::Avg, TransitionScope::Global).unwrap();
        db.replace_dfg_edges(&transitions).unwrap();

        let inserted = db.replace_events(&events[..2]).unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.list_events().unwrap().len(), 2);
        assert!(db.list_dfg_edges().unwrap().is_empty());
    }

    #[test]
    fn log_stats_counts_distinct_values() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(db.log_stats().unwrap(), LogStats::default());

        db.insert_events(&sample_events()).unwrap();
        let stats = db.log_stats().unwrap();
        assert_eq!(stats.events, 4);
        assert_eq!(stats.cases, 2);
        assert_eq!(stats.queues, 2);
        assert_eq!(stats.first_event, Some(at(0)));
        assert_eq!(stats.last_event, Some(at(40)));
    }

    #[test]
    fn last_import_returns_latest() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert!(db.last_import().unwrap().is_none());

        let mut first = ImportRecord::new("a.jsonl", 3, 3, 0);
        first.imported_at = at(0);
        let mut second = ImportRecord::new("-", 5, 4, 1);
        second.imported_at = at(60);
        db.record_import(&first).unwrap();
        db.record_import(&second).unwrap();

        let last = db.last_import().unwrap().unwrap();
        assert_eq!(last, second);
    }

    #[test]
    fn dfg_edges_round_trip() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let events = sample_events();
        let transitions =
            directly_follows(&events, MetricMode::Median, TransitionScope::PerQueue).unwrap();

        assert_eq!(db.replace_dfg_edges(&transitions).unwrap(), 2);
        assert_eq!(db.list_dfg_edges().unwrap(), transitions);

        db.replace_dfg_edges(&transitions[..1]).unwrap();
        assert_eq!(db.list_dfg_edges().unwrap().len(), 1);
    }

    #[test]
    fn queue_summary_round_trip() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let summary = pm_core::queue_summary(&sample_events());

        db.replace_queue_summary(&summary).unwrap();
        assert_eq!(db.list_queue_summary().unwrap(), summary);
    }

    #[test]
    fn variants_keep_save_order() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let mut variants = variant::discover(&sample_events(), VariantScope::PerQueue);
        variant::rank_by_frequency(&mut variants);

        db.replace_variants(&variants).unwrap();
        let stored = db.list_variants().unwrap();
        assert_eq!(stored.len(), variants.len());
        for (stored, original) in stored.iter().zip(&variants) {
            assert_eq!(stored.queue_id, original.queue_id);
            assert_eq!(stored.variant_id, original.variant_id);
            assert_eq!(stored.sequence, original.sequence);
            assert_eq!(stored.count, original.count);
            assert!(stored.cases.is_empty());
        }
    }

    #[test]
    fn open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pm.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_events(&sample_events()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_events().unwrap().len(), 4);
    }
}
