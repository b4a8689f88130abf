//! Recent results history
//!
//! Persisted under a single storage key as a JSON array, most recent first,
//! capped at [`RECENT_RESULTS_LIMIT`] entries. Reads never fail: missing or
//! corrupt data is an empty history, and malformed fields are coerced.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{RECENT_RESULTS_LIMIT, RESULTS_STORAGE_KEY};
use crate::persistence::{KeyValueStore, StorageError};
use crate::sim::SessionMetrics;

/// Summary of one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    /// Rounded final score
    pub score: i64,
    pub kills: u32,
    /// Percent, 2 decimals
    pub accuracy: f64,
    /// Milliseconds, 2 decimals
    pub avg_ttk: f64,
    pub max_combo: u32,
    pub misses: u32,
    pub difficulty: String,
    /// ISO-8601 UTC, millisecond precision
    pub played_at: String,
}

impl SessionRecord {
    pub fn from_metrics(
        id: String,
        metrics: &SessionMetrics,
        difficulty: &str,
        played_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            score: metrics.score.round() as i64,
            kills: metrics.kills,
            accuracy: round2(metrics.accuracy()),
            avg_ttk: round2(metrics.avg_ttk()),
            max_combo: metrics.max_combo,
            misses: metrics.misses,
            difficulty: if difficulty.is_empty() {
                "unknown".to_string()
            } else {
                difficulty.to_string()
            },
            played_at: format_timestamp(played_at),
        }
    }

    /// Coerce one stored entry, filling defaults for anything malformed
    pub fn coerce(entry: &Value, now: DateTime<Utc>) -> Self {
        let field = |name: &str| entry.get(name).unwrap_or(&Value::Null);
        Self {
            id: coerce_string(field("id")).unwrap_or_default(),
            score: coerce_number(field("score")).round() as i64,
            kills: coerce_count(field("kills")),
            accuracy: coerce_number(field("accuracy")),
            avg_ttk: coerce_number(field("avg_ttk")),
            max_combo: coerce_count(field("max_combo")),
            misses: coerce_count(field("misses")),
            difficulty: coerce_string(field("difficulty")).unwrap_or_else(|| "unknown".to_string()),
            played_at: coerce_string(field("played_at")).unwrap_or_else(|| format_timestamp(now)),
        }
    }

    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.played_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Cells for the recent results table, in column order
    pub fn table_cells(&self) -> [String; RESULTS_TABLE_COLUMNS] {
        let played = self.played_at().map_or_else(
            || self.played_at.clone(),
            |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        [
            played,
            self.difficulty.clone(),
            self.score.to_string(),
            self.kills.to_string(),
            format!("{:.1}%", self.accuracy),
            format!("{:.0} ms", self.avg_ttk),
            self.max_combo.to_string(),
            self.misses.to_string(),
        ]
    }
}

/// Columns in the recent results table
pub const RESULTS_TABLE_COLUMNS: usize = 8;

/// Placeholder row text for an empty history
pub const EMPTY_HISTORY_MESSAGE: &str = "No games played yet.";

/// Same shape as JavaScript's `Date.prototype.toISOString`
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lenient numeric read: numbers, numeric strings and booleans; else 0
fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn coerce_count(value: &Value) -> u32 {
    coerce_number(value).round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Non-empty strings as-is, numbers stringified, else absent
fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a stored history blob, newest first
pub fn parse_history(raw: &str, now: DateTime<Utc>) -> Result<Vec<SessionRecord>, StorageError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = value else {
        log::warn!("Stored results are not an array, ignoring them");
        return Ok(Vec::new());
    };
    let mut records: Vec<SessionRecord> = entries
        .iter()
        .map(|entry| SessionRecord::coerce(entry, now))
        .collect();
    // Unparseable timestamps sort last
    records.sort_by(|a, b| b.played_at().cmp(&a.played_at()));
    Ok(records)
}

/// Prepend and trim from the tail
pub fn push_bounded(history: &mut Vec<SessionRecord>, record: SessionRecord, limit: usize) {
    history.insert(0, record);
    history.truncate(limit);
}

/// Bounded session history over a key/value store
pub struct ResultArchive {
    store: Box<dyn KeyValueStore>,
    limit: usize,
}

impl ResultArchive {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            limit: RECENT_RESULTS_LIMIT,
        }
    }

    /// Load the stored history; storage problems yield an empty history
    pub fn load(&self, now: DateTime<Utc>) -> Vec<SessionRecord> {
        let raw = match self.store.get(RESULTS_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("Failed to read stored results: {e}");
                return Vec::new();
            }
        };
        match parse_history(&raw, now) {
            Ok(records) => {
                log::debug!("Loaded {} stored results", records.len());
                records
            }
            Err(e) => {
                log::warn!("Stored results are corrupt, starting fresh: {e}");
                Vec::new()
            }
        }
    }

    /// Persist the history; failures are logged and dropped
    pub fn save(&mut self, records: &[SessionRecord]) -> bool {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to encode results: {e}");
                return false;
            }
        };
        match self.store.set(RESULTS_STORAGE_KEY, &json) {
            Ok(()) => {
                log::info!("Results saved ({} entries)", records.len());
                true
            }
            Err(e) => {
                log::error!("Failed to save results: {e}");
                false
            }
        }
    }

    /// Read-modify-write: prepend `record`, trim, save. Returns the new history.
    pub fn record(&mut self, record: SessionRecord, now: DateTime<Utc>) -> Vec<SessionRecord> {
        let mut history = self.load(now);
        push_bounded(&mut history, record, self.limit);
        self.save(&history);
        history
    }
}
