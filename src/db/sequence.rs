//! Per-year project code allocation.

use super::Database;
use crate::error::ApiError;
use anyhow::Result;
use rusqlite::{params, Connection};

/// Attempts before a persistently busy store surfaces as a conflict.
const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Format a project code from its year and sequence number.
pub fn format_project_code(year: i32, seq: i64) -> String {
    format!("PRJ-{}-{:04}", year, seq)
}

/// Allocate the next sequence number for `year` on an open connection.
///
/// A single upsert statement: the first allocation for a year creates the
/// row with `next_sequence = 2` and yields 1; later allocations increment
/// and yield the pre-increment value. There is no create-then-read window
/// for racing creators to slip through.
pub(crate) fn allocate_sequence(conn: &Connection, year: i32) -> rusqlite::Result<i64> {
    let next: i64 = conn.query_row(
        "INSERT INTO project_code_sequences (year, next_sequence) VALUES (?1, 2)
         ON CONFLICT(year) DO UPDATE SET next_sequence = next_sequence + 1
         RETURNING next_sequence",
        params![year],
        |row| row.get(0),
    )?;
    Ok(next - 1)
}

/// Allocate and format the next project code for `year`.
pub(crate) fn allocate_code(conn: &Connection, year: i32) -> rusqlite::Result<String> {
    Ok(format_project_code(year, allocate_sequence(conn, year)?))
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

impl Database {
    /// Allocate the next project code for `year`.
    ///
    /// Retries busy-store conflicts up to `MAX_ALLOCATION_ATTEMPTS` before
    /// surfacing `RESOURCE_CONFLICT`. Successful calls for one year return
    /// strictly increasing sequence numbers with no duplicates.
    pub fn next_project_code(&self, year: i32) -> Result<String> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let allocated = self.with_conn(|conn| match allocate_code(conn, year) {
                Ok(code) => Ok(Some(code)),
                Err(e) if is_busy(&e) => {
                    tracing::debug!(year, attempt, "code allocation hit busy store, retrying");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            })?;

            if let Some(code) = allocated {
                return Ok(code);
            }
        }

        Err(ApiError::conflict(format!(
            "could not allocate a project code for {} after {} attempts",
            year, MAX_ALLOCATION_ATTEMPTS
        ))
        .into())
    }
}
