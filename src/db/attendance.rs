use crate::db::db_utils::{get_date, get_enum, get_opt_enum, get_opt_timestamp};
use crate::errors::AppResult;
use crate::models::attendance::{ArrivalStatus, DepartureStatus, HomeroomAttendanceRecord};
use crate::utils::date::date_str;
use crate::utils::time::format_timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub fn map_record(row: &Row) -> Result<HomeroomAttendanceRecord> {
    Ok(HomeroomAttendanceRecord {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        date: get_date(row, "date")?,
        time_in: get_opt_timestamp(row, "time_in")?,
        time_out: get_opt_timestamp(row, "time_out")?,
        status: get_enum(row, "status", ArrivalStatus::from_db_str)?,
        departure: get_opt_enum(row, "departure", DepartureStatus::from_db_str)?,
    })
}

/// Record a tap-in on the (student, date) row.
///
/// Conflicts on the unique key update in place; the first arrival of the day
/// keeps its time and classification.
pub fn upsert_tap_in(
    conn: &Connection,
    student_id: &str,
    date: NaiveDate,
    at: NaiveDateTime,
    status: ArrivalStatus,
) -> AppResult<()> {
    conn.execute(
        r#"
        INSERT INTO homeroom_attendance (student_id, date, time_in, status)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(student_id, date) DO UPDATE SET
            status  = CASE WHEN time_in IS NULL THEN excluded.status ELSE status END,
            time_in = COALESCE(time_in, excluded.time_in)
        "#,
        params![student_id, date_str(date), format_timestamp(at), status.to_db_str()],
    )?;
    Ok(())
}

/// Record a tap-out: update the same-day row if present, otherwise insert one.
pub fn upsert_tap_out(
    conn: &Connection,
    student_id: &str,
    date: NaiveDate,
    at: NaiveDateTime,
    departure: DepartureStatus,
) -> AppResult<()> {
    conn.execute(
        r#"
        INSERT INTO homeroom_attendance (student_id, date, time_out, status, departure)
        VALUES (?1, ?2, ?3, 'absent', ?4)
        ON CONFLICT(student_id, date) DO UPDATE SET
            time_out  = excluded.time_out,
            departure = excluded.departure
        "#,
        params![student_id, date_str(date), format_timestamp(at), departure.to_db_str()],
    )?;
    Ok(())
}

pub fn find_record(
    conn: &Connection,
    student_id: &str,
    date: NaiveDate,
) -> AppResult<Option<HomeroomAttendanceRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM homeroom_attendance WHERE student_id = ?1 AND date = ?2",
    )?;
    Ok(stmt
        .query_row(params![student_id, date_str(date)], map_record)
        .optional()?)
}

pub fn load_records_by_date(
    conn: &Connection,
    date: NaiveDate,
) -> AppResult<Vec<HomeroomAttendanceRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM homeroom_attendance WHERE date = ?1 ORDER BY student_id ASC",
    )?;
    let rows = stmt.query_map([date_str(date)], map_record)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_records(conn: &Connection, student_id: &str, date: NaiveDate) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM homeroom_attendance WHERE student_id = ?1 AND date = ?2",
        params![student_id, date_str(date)],
        |row| row.get(0),
    )?;
    Ok(n)
}
