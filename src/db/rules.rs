use crate::db::db_utils::conversion_error;
use crate::errors::AppResult;
use crate::models::rule::{AttendanceRule, GlobalRule};
use crate::utils::time::hhmm_to_minutes;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

fn minutes_col(row: &Row, column: &str) -> Result<i64> {
    let raw: String = row.get(column)?;
    hhmm_to_minutes(&raw).map_err(|e| conversion_error(column, e))
}

pub fn map_rule(row: &Row) -> Result<AttendanceRule> {
    Ok(AttendanceRule {
        grade_level: row.get("grade_level")?,
        entry_time: minutes_col(row, "entry_time")?,
        grace_until: minutes_col(row, "grace_until")?,
        late_until: minutes_col(row, "late_until")?,
    })
}

pub fn load_grade_rules(conn: &Connection) -> AppResult<Vec<AttendanceRule>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM attendance_rules")?;
    let rows = stmt.query_map([], map_rule)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// The authored global rule, if an admin has saved one.
pub fn load_global_rule(conn: &Connection) -> AppResult<Option<GlobalRule>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM global_rule WHERE id = 1")?;
    let rule = stmt
        .query_row([], |row| {
            Ok(GlobalRule {
                school_start: minutes_col(row, "school_start")?,
                late_threshold_minutes: row.get("late_threshold_minutes")?,
                absent_threshold_minutes: row.get("absent_threshold_minutes")?,
                dismissal_time: minutes_col(row, "dismissal_time")?,
                early_exit_minutes: row.get("early_exit_minutes")?,
                late_exit_minutes: row.get("late_exit_minutes")?,
            })
        })
        .optional()?;
    Ok(rule)
}

pub fn save_grade_rule(
    conn: &Connection,
    grade_level: &str,
    entry_time: &str,
    grace_until: &str,
    late_until: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO attendance_rules (grade_level, entry_time, grace_until, late_until)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(grade_level) DO UPDATE SET
            entry_time = excluded.entry_time,
            grace_until = excluded.grace_until,
            late_until = excluded.late_until",
        params![grade_level, entry_time, grace_until, late_until],
    )?;
    Ok(())
}

pub fn save_global_rule(
    conn: &Connection,
    school_start: &str,
    late_threshold_minutes: i64,
    absent_threshold_minutes: i64,
    dismissal_time: &str,
    early_exit_minutes: i64,
    late_exit_minutes: i64,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO global_rule (id, school_start, late_threshold_minutes, absent_threshold_minutes,
                                  dismissal_time, early_exit_minutes, late_exit_minutes)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            school_start = excluded.school_start,
            late_threshold_minutes = excluded.late_threshold_minutes,
            absent_threshold_minutes = excluded.absent_threshold_minutes,
            dismissal_time = excluded.dismissal_time,
            early_exit_minutes = excluded.early_exit_minutes,
            late_exit_minutes = excluded.late_exit_minutes",
        params![
            school_start,
            late_threshold_minutes,
            absent_threshold_minutes,
            dismissal_time,
            early_exit_minutes,
            late_exit_minutes
        ],
    )?;
    Ok(())
}
