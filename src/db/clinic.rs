use crate::db::db_utils::{get_enum, get_opt_timestamp, get_timestamp};
use crate::errors::{AppError, AppResult};
use crate::models::clinic::{ClinicPass, ClinicVisit, Findings, PassStatus, VisitStatus};
use crate::utils::time::format_timestamp;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

// ------------------------------------------------
// Passes
// ------------------------------------------------

pub fn map_pass(row: &Row) -> Result<ClinicPass> {
    Ok(ClinicPass {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        issued_by: row.get("issued_by")?,
        reason: row.get("reason")?,
        status: get_enum(row, "status", PassStatus::from_db_str)?,
        visit_id: row.get("visit_id")?,
        rejection_reason: row.get("rejection_reason")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

pub fn insert_pass(
    conn: &Connection,
    student_id: &str,
    issued_by: &str,
    reason: &str,
    at: NaiveDateTime,
) -> AppResult<i64> {
    let ts = format_timestamp(at);
    conn.execute(
        "INSERT INTO clinic_passes (student_id, issued_by, reason, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', ?4, ?4)",
        params![student_id, issued_by, reason, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_pass(conn: &Connection, id: i64) -> AppResult<ClinicPass> {
    let mut stmt = conn.prepare_cached("SELECT * FROM clinic_passes WHERE id = ?1")?;
    stmt.query_row([id], map_pass)
        .optional()?
        .ok_or_else(|| AppError::not_found("clinic pass", id))
}

/// Most recent `pending` / `approved` pass of the student.
pub fn find_open_pass(conn: &Connection, student_id: &str) -> AppResult<Option<ClinicPass>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM clinic_passes
         WHERE student_id = ?1 AND status IN ('pending', 'approved')
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
    )?;
    Ok(stmt.query_row([student_id], map_pass).optional()?)
}

pub fn update_pass_status(
    conn: &Connection,
    id: i64,
    status: PassStatus,
    visit_id: Option<i64>,
    rejection_reason: Option<&str>,
    at: NaiveDateTime,
) -> AppResult<()> {
    conn.execute(
        "UPDATE clinic_passes
         SET status = ?1,
             visit_id = COALESCE(?2, visit_id),
             rejection_reason = COALESCE(?3, rejection_reason),
             updated_at = ?4
         WHERE id = ?5",
        params![status.to_db_str(), visit_id, rejection_reason, format_timestamp(at), id],
    )?;
    Ok(())
}

/// Latest pass linked to `visit_id`.
pub fn find_pass_for_visit(conn: &Connection, visit_id: i64) -> AppResult<Option<ClinicPass>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM clinic_passes WHERE visit_id = ?1 ORDER BY id DESC LIMIT 1",
    )?;
    Ok(stmt.query_row([visit_id], map_pass).optional()?)
}

/// Mark every still-open pass linked to `visit_id` as `done`.
pub fn finish_passes_for_visit(conn: &Connection, visit_id: i64, at: NaiveDateTime) -> AppResult<()> {
    conn.execute(
        "UPDATE clinic_passes SET status = 'done', updated_at = ?1
         WHERE visit_id = ?2 AND status IN ('pending', 'approved')",
        params![format_timestamp(at), visit_id],
    )?;
    Ok(())
}

// ------------------------------------------------
// Visits
// ------------------------------------------------

pub fn map_visit(row: &Row) -> Result<ClinicVisit> {
    Ok(ClinicVisit {
        id: row.get("id")?,
        student_id: row.get("student_id")?,
        staff_id: row.get("staff_id")?,
        pass_id: row.get("pass_id")?,
        status: get_enum(row, "status", VisitStatus::from_db_str)?,
        notes: row.get("notes")?,
        findings: Findings {
            diagnosis: row.get("diagnosis")?,
            treatment: row.get("treatment")?,
            action: row.get("action")?,
        },
        entered_at: get_timestamp(row, "entered_at")?,
        exited_at: get_opt_timestamp(row, "exited_at")?,
        teacher_approved_by: row.get("teacher_approved_by")?,
        teacher_approved_at: get_opt_timestamp(row, "teacher_approved_at")?,
    })
}

pub fn insert_visit(
    conn: &Connection,
    student_id: &str,
    staff_id: &str,
    pass_id: Option<i64>,
    notes: &str,
    at: NaiveDateTime,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO clinic_visits (student_id, staff_id, pass_id, status, notes, entered_at)
         VALUES (?1, ?2, ?3, 'in_clinic', ?4, ?5)",
        params![student_id, staff_id, pass_id, notes, format_timestamp(at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn load_visit(conn: &Connection, id: i64) -> AppResult<ClinicVisit> {
    let mut stmt = conn.prepare_cached("SELECT * FROM clinic_visits WHERE id = ?1")?;
    stmt.query_row([id], map_visit)
        .optional()?
        .ok_or_else(|| AppError::not_found("clinic visit", id))
}

/// Latest visit of the student still physically in the clinic.
pub fn find_open_visit(conn: &Connection, student_id: &str) -> AppResult<Option<ClinicVisit>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM clinic_visits
         WHERE student_id = ?1 AND status = 'in_clinic'
         ORDER BY entered_at DESC, id DESC
         LIMIT 1",
    )?;
    Ok(stmt.query_row([student_id], map_visit).optional()?)
}

/// Latest visit of the student that has not reached a terminal status.
pub fn find_active_visit(conn: &Connection, student_id: &str) -> AppResult<Option<ClinicVisit>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM clinic_visits
         WHERE student_id = ?1 AND status NOT IN ('completed', 'sent_home')
         ORDER BY entered_at DESC, id DESC
         LIMIT 1",
    )?;
    Ok(stmt.query_row([student_id], map_visit).optional()?)
}

pub fn count_open_visits(conn: &Connection, student_id: &str) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM clinic_visits
         WHERE student_id = ?1 AND status NOT IN ('completed', 'sent_home')",
        [student_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// Move a visit to `next`, but only from `expected`.
///
/// The status guard in the WHERE clause turns a concurrent, already-applied
/// transition into zero affected rows, reported as `InvalidState`.
pub fn transition_visit(
    conn: &Connection,
    id: i64,
    expected: VisitStatus,
    next: VisitStatus,
) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE clinic_visits SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![next.to_db_str(), id, expected.to_db_str()],
    )?;
    if changed == 0 {
        return Err(AppError::InvalidState(format!(
            "visit {id} is no longer '{}'",
            expected.to_db_str()
        )));
    }
    Ok(())
}

pub fn save_findings(conn: &Connection, id: i64, findings: &Findings) -> AppResult<()> {
    conn.execute(
        "UPDATE clinic_visits SET diagnosis = ?1, treatment = ?2, action = ?3 WHERE id = ?4",
        params![findings.diagnosis, findings.treatment, findings.action, id],
    )?;
    Ok(())
}

pub fn stamp_teacher_approval(
    conn: &Connection,
    id: i64,
    teacher_id: &str,
    at: NaiveDateTime,
) -> AppResult<()> {
    conn.execute(
        "UPDATE clinic_visits SET teacher_approved_by = ?1, teacher_approved_at = ?2 WHERE id = ?3",
        params![teacher_id, format_timestamp(at), id],
    )?;
    Ok(())
}

pub fn close_visit(
    conn: &Connection,
    id: i64,
    from: VisitStatus,
    status: VisitStatus,
    notes: &str,
    at: NaiveDateTime,
) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE clinic_visits
         SET status = ?1,
             exited_at = ?2,
             notes = CASE WHEN ?3 = '' THEN notes
                          WHEN notes = '' THEN ?3
                          ELSE notes || char(10) || ?3 END
         WHERE id = ?4 AND status = ?5",
        params![status.to_db_str(), format_timestamp(at), notes, id, from.to_db_str()],
    )?;
    if changed == 0 {
        return Err(AppError::InvalidState(format!(
            "visit {id} is no longer '{}'",
            from.to_db_str()
        )));
    }
    Ok(())
}
