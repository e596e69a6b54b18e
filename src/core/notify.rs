//! Notification dispatch.
//!
//! Staff are always addressed before parents: `send_staff_then_parent` issues
//! the staff call first and the parent call second, and the parent call is
//! made whether or not the staff call succeeded.

use crate::db::notifications::insert_notification;
use crate::errors::AppResult;
use crate::models::notification::NotificationEvent;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{debug, warn};

/// Where notification rows are appended.
pub trait NotificationSink {
    fn append(
        &self,
        recipient_id: &str,
        actor_id: &str,
        event: &NotificationEvent,
        at: NaiveDateTime,
    ) -> AppResult<i64>;
}

pub struct SqliteSink<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSink<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl NotificationSink for SqliteSink<'_> {
    fn append(
        &self,
        recipient_id: &str,
        actor_id: &str,
        event: &NotificationEvent,
        at: NaiveDateTime,
    ) -> AppResult<i64> {
        insert_notification(self.conn, recipient_id, actor_id, event, at)
    }
}

/// Outcome of a staff + parent fan-out. Failures are independent.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub staff: Option<i64>,
    pub parent: Option<i64>,
    pub errors: Vec<String>,
}

impl DispatchReport {
    pub fn sent(&self) -> usize {
        self.staff.is_some() as usize + self.parent.is_some() as usize
    }
}

pub struct Dispatcher<'a> {
    sink: Box<dyn NotificationSink + 'a>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(sink: impl NotificationSink + 'a) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Append one notification. An absent or blank recipient is a no-op.
    pub fn send(
        &self,
        recipient: Option<&str>,
        actor: &str,
        event: &NotificationEvent,
        at: NaiveDateTime,
    ) -> AppResult<Option<i64>> {
        let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) else {
            debug!(verb = event.verb(), "no recipient linked, notification skipped");
            return Ok(None);
        };
        let id = self.sink.append(recipient, actor, event, at)?;
        Ok(Some(id))
    }

    pub fn send_staff_then_parent(
        &self,
        staff: Option<&str>,
        parent: Option<&str>,
        actor: &str,
        event: &NotificationEvent,
        at: NaiveDateTime,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        match self.send(staff, actor, event, at) {
            Ok(id) => report.staff = id,
            Err(e) => {
                warn!(verb = event.verb(), error = %e, "staff notification failed");
                report.errors.push(format!("staff: {e}"));
            }
        }

        match self.send(parent, actor, event, at) {
            Ok(id) => report.parent = id,
            Err(e) => {
                warn!(verb = event.verb(), error = %e, "parent notification failed");
                report.errors.push(format!("parent: {e}"));
            }
        }

        report
    }
}
