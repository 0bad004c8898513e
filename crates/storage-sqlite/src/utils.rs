//! Helpers shared by the SQLite repositories: `IN (...)` chunking, timestamp
//! text columns and JSON paths into locale maps.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::error;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite caps the number of bound parameters per statement (typically 999),
/// so id lists are split into chunks of this size.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Current time as stored in the text timestamp columns.
pub fn now_text() -> String {
    Utc::now().to_rfc3339()
}

/// Parses an RFC3339 timestamp column. Unparseable values are logged and
/// replaced by the current time.
pub fn text_to_datetime(s: &str) -> NaiveDateTime {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(|e| {
            error!("Failed to parse datetime '{}': {}", s, e);
            Utc::now().naive_utc()
        })
}

/// JSON path selecting one locale of a locale map column, e.g. `$."en"`.
pub fn locale_path(locale: &str) -> String {
    format!("$.\"{}\"", locale.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `LIKE` pattern matching `fragment` anywhere, with `\` as escape character.
pub fn contains_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
