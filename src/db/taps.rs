use crate::db::db_utils::{get_enum, get_timestamp};
use crate::errors::AppResult;
use crate::models::direction::Direction;
use crate::models::tap::{TapLogEntry, TapOutcome, TapSource};
use crate::utils::time::format_timestamp;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub fn map_tap(row: &Row) -> Result<TapLogEntry> {
    Ok(TapLogEntry {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        actor_id: row.get("actor_id")?,
        direction: get_enum(row, "direction", Direction::from_db_str)?,
        source: get_enum(row, "source", TapSource::from_db_str)?,
        outcome: get_enum(row, "outcome", TapOutcome::from_db_str)?,
        remark: row.get("remark")?,
        tapped_at: get_timestamp(row, "tapped_at")?,
    })
}

/// Append-only: tap log rows are never updated or deleted.
pub fn append_tap(conn: &Connection, entry: &TapLogEntry) -> AppResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO tap_logs (student_id, actor_id, direction, source, outcome, remark, tapped_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    stmt.execute(params![
        entry.student_id,
        entry.actor_id,
        entry.direction.to_db_str(),
        entry.source.to_db_str(),
        entry.outcome.to_db_str(),
        entry.remark,
        format_timestamp(entry.tapped_at),
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Latest accepted gate tap of the student on `date`; this is the sequencing state.
pub fn latest_gate_tap_on(
    conn: &Connection,
    student_id: &str,
    date: NaiveDate,
) -> AppResult<Option<TapLogEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM tap_logs
         WHERE student_id = ?1
           AND source = 'gate'
           AND outcome = 'ok'
           AND substr(tapped_at, 1, 10) = ?2
         ORDER BY tapped_at DESC, id DESC
         LIMIT 1",
    )?;
    let date_str = date.format("%Y-%m-%d").to_string();
    Ok(stmt.query_row(params![student_id, date_str], map_tap).optional()?)
}

pub fn load_taps_for_student(conn: &Connection, student_id: &str) -> AppResult<Vec<TapLogEntry>> {
    let mut stmt =
        conn.prepare_cached("SELECT * FROM tap_logs WHERE student_id = ?1 ORDER BY id ASC")?;
    let rows = stmt.query_map([student_id], map_tap)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
