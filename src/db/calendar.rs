use crate::db::db_utils::{get_date, get_enum};
use crate::errors::AppResult;
use crate::models::calendar::{CalendarKind, SchoolCalendarEvent};
use crate::utils::date::date_str;
use chrono::NaiveDate;
use rusqlite::{Connection, Result, Row, params};

pub fn map_event(row: &Row) -> Result<SchoolCalendarEvent> {
    Ok(SchoolCalendarEvent {
        id: row.get("id")?,
        start_date: get_date(row, "start_date")?,
        end_date: get_date(row, "end_date")?,
        scope: row.get("scope")?,
        kind: get_enum(row, "kind", CalendarKind::from_db_str)?,
        title: row.get("title")?,
    })
}

/// Events whose date range contains `date`, regardless of scope.
pub fn events_covering(conn: &Connection, date: NaiveDate) -> AppResult<Vec<SchoolCalendarEvent>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM calendar_events
         WHERE start_date <= ?1 AND end_date >= ?1
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([date_str(date)], map_event)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn insert_event(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    scope: &str,
    kind: CalendarKind,
    title: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO calendar_events (start_date, end_date, scope, kind, title)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![date_str(start), date_str(end), scope, kind.to_db_str(), title],
    )?;
    Ok(conn.last_insert_rowid())
}
