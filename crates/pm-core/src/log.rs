//! Event log ingestion.
//!
//! Rows arrive from the log source as loosely-typed JSON objects keyed by
//! column name. They are validated exactly once here and turned into typed
//! [`Event`]s; nothing downstream touches raw rows.
//!
//! # Rejection policy
//!
//! - A required column absent from the whole table is a [`CoreError::Schema`].
//!   No partial log is returned.
//! - A row with an empty required value or an unparseable timestamp is
//!   rejected with a recorded [`IngestWarning`]. The rest of the log is kept.
//! - An unrecognised `sla_met` value keeps the row and drops the flag.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::event::Event;
use crate::types::{CaseId, QueueId};

/// Column holding the case identifier.
pub const CASE_ID: &str = "case_id";
/// Legacy name for [`CASE_ID`] used by ticket exports.
pub const TICKET_ID: &str = "ticket_id";
/// Column holding the activity label.
pub const ACTIVITY: &str = "activity";
/// Column holding the event time.
pub const TIMESTAMP: &str = "timestamp";
/// Column holding the queue identifier.
pub const QUEUE_ID: &str = "queue_id";
/// Optional column holding the SLA flag.
pub const SLA_MET: &str = "sla_met";

/// Naive timestamp layouts accepted in addition to RFC 3339. Interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A non-fatal problem found while ingesting the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestWarning {
    /// The log source had no rows.
    EmptyInput,
    /// A row was not a JSON object and was rejected.
    NotAnObject { row: usize },
    /// A row had no value for a required column and was rejected.
    MissingValue { row: usize, column: &'static str },
    /// A row's timestamp could not be parsed and was rejected.
    MalformedTimestamp { row: usize, value: String },
    /// A row's SLA flag was not recognised. The row was kept without a flag.
    InvalidSlaFlag { row: usize, value: String },
}

impl IngestWarning {
    /// Whether the row this warning refers to was dropped.
    pub const fn rejects_row(&self) -> bool {
        matches!(
            self,
            Self::NotAnObject { .. } | Self::MissingValue { .. } | Self::MalformedTimestamp { .. }
        )
    }
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "event log has no rows"),
            Self::NotAnObject { row } => write!(f, "row {row}: expected a JSON object"),
            Self::MissingValue { row, column } => write!(f, "row {row}: missing value for {column}"),
            Self::MalformedTimestamp { row, value } => {
                write!(f, "row {row}: malformed timestamp {value:?}")
            }
            Self::InvalidSlaFlag { row, value } => {
                write!(f, "row {row}: unrecognised sla_met value {value:?}")
            }
        }
    }
}

/// A validated snapshot of the event log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
    warnings: Vec<IngestWarning>,
    has_sla_column: bool,
}

impl EventLog {
    /// Validates rows from the log source.
    ///
    /// Row numbers in warnings are 1-based. Accepted events keep their 0-based
    /// input index as [`Event::position`].
    pub fn from_rows<I>(rows: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = Value>,
    {
        let rows: Vec<Value> = rows.into_iter().collect();
        if rows.is_empty() {
            tracing::warn!("event log has no rows");
            return Ok(Self {
                warnings: vec![IngestWarning::EmptyInput],
                ..Self::default()
            });
        }

        let columns: BTreeSet<&str> = rows
            .iter()
            .filter_map(Value::as_object)
            .flat_map(Map::keys)
            .map(String::as_str)
            .collect();
        check_schema(&columns)?;
        let has_sla_column = columns.contains(SLA_MET);

        let mut events = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            let before = warnings.len();
            let parsed = parse_row(idx, row, &mut warnings);
            for warning in &warnings[before..] {
                if parsed.is_some() {
                    tracing::warn!(%warning, "keeping event row");
                } else {
                    tracing::warn!(%warning, "rejecting event row");
                }
            }
            events.extend(parsed);
        }

        tracing::debug!(
            rows = rows.len(),
            accepted = events.len(),
            warnings = warnings.len(),
            "ingested event log"
        );

        Ok(Self {
            events,
            warnings,
            has_sla_column,
        })
    }

    /// Wraps events that were validated earlier, e.g. reloaded from storage.
    pub fn from_events(events: Vec<Event>) -> Self {
        let has_sla_column = events.iter().any(|e| e.sla_met.is_some());
        let warnings = if events.is_empty() {
            vec![IngestWarning::EmptyInput]
        } else {
            Vec::new()
        };
        Self {
            events,
            warnings,
            has_sla_column,
        }
    }

    /// The accepted events, in input order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Mutable access for enrichment passes such as SLA derivation.
    pub fn events_mut(&mut self) -> &mut [Event] {
        &mut self.events
    }

    /// Consumes the log, returning its events.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Warnings recorded during ingestion.
    pub fn warnings(&self) -> &[IngestWarning] {
        &self.warnings
    }

    /// Number of rows dropped during ingestion.
    pub fn rejected_rows(&self) -> usize {
        self.warnings.iter().filter(|w| w.rejects_row()).count()
    }

    /// Whether the source carried an `sla_met` column at all.
    pub const fn has_sla_column(&self) -> bool {
        self.has_sla_column
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Restricts events to the given queues. An empty selection keeps everything.
pub fn filter_queues(events: &[Event], queues: &[QueueId]) -> Vec<Event> {
    if queues.is_empty() {
        return events.to_vec();
    }
    let selected: BTreeSet<&QueueId> = queues.iter().collect();
    events
        .iter()
        .filter(|e| selected.contains(&e.queue_id))
        .cloned()
        .collect()
}

/// Parses an event timestamp.
///
/// Accepts RFC 3339, or `YYYY-MM-DD HH:MM:SS[.fff]` (space or `T` separated)
/// which is taken to be UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn check_schema(columns: &BTreeSet<&str>) -> Result<(), CoreError> {
    let mut missing = Vec::new();
    if !columns.contains(CASE_ID) && !columns.contains(TICKET_ID) {
        missing.push(CASE_ID);
    }
    for column in [ACTIVITY, TIMESTAMP, QUEUE_ID] {
        if !columns.contains(column) {
            missing.push(column);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Schema { missing })
    }
}

fn parse_row(idx: usize, row: &Value, warnings: &mut Vec<IngestWarning>) -> Option<Event> {
    let row_number = idx + 1;
    let Some(fields) = row.as_object() else {
        warnings.push(IngestWarning::NotAnObject { row: row_number });
        return None;
    };

    let mut required = |column: &'static str, value: Option<&Value>| {
        let text = value.and_then(text_value);
        if text.is_none() {
            warnings.push(IngestWarning::MissingValue {
                row: row_number,
                column,
            });
        }
        text
    };

    let case_id = required(CASE_ID, fields.get(CASE_ID).or_else(|| fields.get(TICKET_ID)))?;
    let activity = required(ACTIVITY, fields.get(ACTIVITY))?;
    let raw_timestamp = required(TIMESTAMP, fields.get(TIMESTAMP))?;
    let queue_id = required(QUEUE_ID, fields.get(QUEUE_ID))?;

    let Some(timestamp) = parse_timestamp(&raw_timestamp) else {
        warnings.push(IngestWarning::MalformedTimestamp {
            row: row_number,
            value: raw_timestamp,
        });
        return None;
    };

    let sla_met = match fields.get(SLA_MET) {
        None => None,
        Some(value) => parse_sla_flag(value).unwrap_or_else(|| {
            warnings.push(IngestWarning::InvalidSlaFlag {
                row: row_number,
                value: value.to_string(),
            });
            None
        }),
    };

    // Non-empty by construction of text_value.
    let case_id = CaseId::new(case_id).ok()?;
    let queue_id = QueueId::new(queue_id).ok()?;

    Some(Event {
        case_id,
        activity,
        timestamp,
        queue_id,
        sla_met,
        position: idx as u64,
    })
}

/// Extracts a trimmed, non-empty string from a scalar JSON value.
fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// Parses an SLA flag.
///
/// Returns `Some(None)` for an explicit null or blank value and `None` when the
/// value is not recognised.
fn parse_sla_flag(value: &Value) -> Option<Option<bool>> {
    match value {
        Value::Null => Some(None),
        Value::Bool(b) => Some(Some(*b)),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x.abs() < f64::EPSILON => Some(Some(false)),
            Some(x) if (x - 1.0).abs() < f64::EPSILON => Some(Some(true)),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Some(None),
            "true" | "t" | "yes" | "y" | "1" => Some(Some(true)),
            "false" | "f" | "no" | "n" | "0" => Some(Some(false)),
            _ => None,
        },
        Value::Array(_) | Value::Object(_) => None,
    }
}
