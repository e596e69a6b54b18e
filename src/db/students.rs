use crate::db::db_utils::get_enum;
use crate::errors::{AppError, AppResult};
use crate::models::student::{Student, StudentStatus};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub fn map_student(row: &Row) -> Result<Student> {
    Ok(Student {
        id: row.get("id")?,
        full_name: row.get("full_name")?,
        grade_level: row.get("grade_level")?,
        class_id: row.get("class_id")?,
        parent_id: row.get("parent_id")?,
        status: get_enum(row, "status", StudentStatus::from_db_str)?,
    })
}

pub fn find_student(conn: &Connection, id: &str) -> AppResult<Option<Student>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM students WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_student).optional()?)
}

pub fn load_student(conn: &Connection, id: &str) -> AppResult<Student> {
    find_student(conn, id)?.ok_or_else(|| AppError::not_found("student", id))
}

/// Resolve an issued code; inactive (revoked / reprinted) codes never match.
pub fn find_by_active_code(conn: &Connection, code: &str) -> AppResult<Option<Student>> {
    let mut stmt = conn.prepare_cached(
        "SELECT s.* FROM students s
         JOIN issued_ids i ON i.student_id = s.id
         WHERE i.code = ?1 AND i.active = 1",
    )?;
    Ok(stmt.query_row([code], map_student).optional()?)
}

pub fn set_status(conn: &Connection, id: &str, status: StudentStatus) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE students SET status = ?1 WHERE id = ?2",
        params![status.to_db_str(), id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("student", id));
    }
    Ok(())
}

pub fn insert_student(conn: &Connection, s: &Student) -> AppResult<()> {
    conn.execute(
        "INSERT INTO students (id, full_name, grade_level, class_id, parent_id, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            s.id,
            s.full_name,
            s.grade_level,
            s.class_id,
            s.parent_id,
            s.status.to_db_str(),
        ],
    )?;
    Ok(())
}

pub fn insert_class(
    conn: &Connection,
    id: &str,
    grade_level: &str,
    homeroom_teacher_id: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO classes (id, grade_level, homeroom_teacher_id) VALUES (?1, ?2, ?3)",
        params![id, grade_level, homeroom_teacher_id],
    )?;
    Ok(())
}

pub fn issue_code(conn: &Connection, code: &str, student_id: &str, active: bool) -> AppResult<()> {
    conn.execute(
        "INSERT INTO issued_ids (code, student_id, active) VALUES (?1, ?2, ?3)",
        params![code, student_id, active as i32],
    )?;
    Ok(())
}
