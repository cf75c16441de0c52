//! Utility functions for SQLite storage operations.

/// Maximum number of bound parameters used in one statement.
///
/// SQLite's compile-time limit (SQLITE_MAX_VARIABLE_NUMBER) is typically 999;
/// 500 leaves room for other parameters in the query.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits rows into batches that fit a multi-row INSERT, given how many
/// columns each row binds.
pub fn chunk_rows_for_sqlite<T>(rows: &[T], columns_per_row: usize) -> impl Iterator<Item = &[T]> {
    let per_chunk = (SQLITE_MAX_PARAMS_CHUNK / columns_per_row.max(1)).max(1);
    rows.chunks(per_chunk)
}

/// Parses a stored RFC3339 timestamp.
pub fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
}

pub fn format_timestamp(ts: chrono::NaiveDateTime) -> String {
    ts.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
