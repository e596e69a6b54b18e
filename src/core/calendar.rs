use crate::db::calendar::events_covering;
use crate::errors::AppResult;
use crate::models::calendar::SchoolCalendarEvent;
use chrono::NaiveDate;
use rusqlite::Connection;

/// Blackout-day lookup consumed by the tap processor.
pub trait Calendar {
    /// First event covering `date` scoped to `"all"` or to `grade`.
    fn find_blackout_event(
        &self,
        date: NaiveDate,
        grade: &str,
    ) -> AppResult<Option<SchoolCalendarEvent>>;
}

pub struct SqliteCalendar<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCalendar<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl Calendar for SqliteCalendar<'_> {
    fn find_blackout_event(
        &self,
        date: NaiveDate,
        grade: &str,
    ) -> AppResult<Option<SchoolCalendarEvent>> {
        let events = events_covering(self.conn, date)?;
        Ok(events
            .into_iter()
            .find(|e| e.covers(date) && e.applies_to_grade(grade)))
    }
}
