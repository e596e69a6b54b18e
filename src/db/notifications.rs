use crate::db::db_utils::{conversion_error, get_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::notification::{Notification, NotificationEvent};
use crate::utils::time::format_timestamp;
use chrono::NaiveDateTime;
use rusqlite::{Connection, Result, Row, params};
use serde_json::{Value, json};

/// Rebuild the tagged event from the split `verb` / `payload` columns.
fn decode_event(verb: &str, payload: &str) -> AppResult<NotificationEvent> {
    let payload: Value = serde_json::from_str(payload)?;
    Ok(serde_json::from_value(json!({ "verb": verb, "payload": payload }))?)
}

pub fn map_notification(row: &Row) -> Result<Notification> {
    let verb: String = row.get("verb")?;
    let payload: String = row.get("payload")?;
    let event = decode_event(&verb, &payload).map_err(|e| conversion_error("payload", e))?;

    Ok(Notification {
        id: row.get("id")?,
        recipient_id: row.get("recipient_id")?,
        actor_id: row.get("actor_id")?,
        event,
        is_read: row.get::<_, i32>("is_read")? == 1,
        created_at: get_timestamp(row, "created_at")?,
    })
}

pub fn insert_notification(
    conn: &Connection,
    recipient_id: &str,
    actor_id: &str,
    event: &NotificationEvent,
    at: NaiveDateTime,
) -> AppResult<i64> {
    let mut tagged = serde_json::to_value(event)?;
    let payload = tagged
        .get_mut("payload")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let mut stmt = conn.prepare_cached(
        "INSERT INTO notifications (recipient_id, actor_id, verb, payload, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
    )?;
    stmt.execute(params![
        recipient_id,
        actor_id,
        event.verb(),
        payload.to_string(),
        format_timestamp(at),
    ])?;
    Ok(conn.last_insert_rowid())
}

pub fn load_for_recipient(
    conn: &Connection,
    recipient_id: &str,
    unread_only: bool,
) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM notifications
         WHERE recipient_id = ?1 AND (?2 = 0 OR is_read = 0)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![recipient_id, unread_only as i32], map_notification)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_all(conn: &Connection) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM notifications ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_notification)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Only the recipient may flip its own read flag.
pub fn mark_read(conn: &Connection, id: i64, recipient_id: &str) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
        params![id, recipient_id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("notification", id));
    }
    Ok(())
}
