use crate::errors::AppResult;
use rusqlite::{Connection, OptionalExtension};

/// Profile linkage lookups (homeroom teacher of a class).
pub trait Directory {
    fn homeroom_teacher_id(&self, class_id: &str) -> AppResult<Option<String>>;
}

pub struct SqliteDirectory<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDirectory<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl Directory for SqliteDirectory<'_> {
    fn homeroom_teacher_id(&self, class_id: &str) -> AppResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT homeroom_teacher_id FROM classes WHERE id = ?1")?;
        let teacher: Option<Option<String>> = stmt
            .query_row([class_id], |row| row.get(0))
            .optional()?;
        Ok(teacher.flatten().filter(|t| !t.trim().is_empty()))
    }
}

/// Homeroom teacher of an optional class assignment.
pub fn teacher_for(directory: &dyn Directory, class_id: Option<&str>) -> AppResult<Option<String>> {
    match class_id {
        Some(id) => directory.homeroom_teacher_id(id),
        None => Ok(None),
    }
}
