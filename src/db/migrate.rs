use crate::errors::AppResult;
use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

/// Ensure that the `log` table exists. Migration bookkeeping lives there too.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

/// Directory, ledger and rule tables.
const CORE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS classes (
        id                   TEXT PRIMARY KEY,
        grade_level          TEXT NOT NULL,
        homeroom_teacher_id  TEXT
    );

    CREATE TABLE IF NOT EXISTS students (
        id           TEXT PRIMARY KEY,
        full_name    TEXT NOT NULL,
        grade_level  TEXT NOT NULL,
        class_id     TEXT REFERENCES classes(id),
        parent_id    TEXT,
        status       TEXT NOT NULL DEFAULT 'out'
                     CHECK(status IN ('in','out','in_clinic'))
    );

    CREATE TABLE IF NOT EXISTS issued_ids (
        code        TEXT PRIMARY KEY,
        student_id  TEXT NOT NULL REFERENCES students(id),
        active      INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS tap_logs (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id  TEXT NOT NULL,
        actor_id    TEXT NOT NULL,
        direction   TEXT NOT NULL CHECK(direction IN ('in','out')),
        source      TEXT NOT NULL DEFAULT 'gate' CHECK(source IN ('gate','clinic')),
        outcome     TEXT NOT NULL CHECK(outcome IN ('ok','duplicate','rejected','blocked')),
        remark      TEXT NOT NULL DEFAULT '',
        tapped_at   TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tap_logs_student_time ON tap_logs(student_id, tapped_at);

    CREATE TABLE IF NOT EXISTS homeroom_attendance (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id  TEXT NOT NULL,
        date        TEXT NOT NULL,
        time_in     TEXT,
        time_out    TEXT,
        status      TEXT NOT NULL CHECK(status IN ('present','late','absent')),
        departure   TEXT CHECK(departure IN ('early','normal','late_exit')),
        UNIQUE(student_id, date)
    );

    CREATE TABLE IF NOT EXISTS attendance_rules (
        grade_level  TEXT PRIMARY KEY,
        entry_time   TEXT NOT NULL,
        grace_until  TEXT NOT NULL,
        late_until   TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS global_rule (
        id                        INTEGER PRIMARY KEY CHECK(id = 1),
        school_start              TEXT NOT NULL,
        late_threshold_minutes    INTEGER NOT NULL,
        absent_threshold_minutes  INTEGER NOT NULL,
        dismissal_time            TEXT NOT NULL,
        early_exit_minutes        INTEGER NOT NULL,
        late_exit_minutes         INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS calendar_events (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        start_date  TEXT NOT NULL,
        end_date    TEXT NOT NULL,
        scope       TEXT NOT NULL DEFAULT 'all',
        kind        TEXT NOT NULL CHECK(kind IN ('holiday','break','emergency')),
        title       TEXT NOT NULL DEFAULT ''
    );
"#;

const CLINIC_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS clinic_passes (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id        TEXT NOT NULL,
        issued_by         TEXT NOT NULL,
        reason            TEXT NOT NULL,
        status            TEXT NOT NULL DEFAULT 'pending'
                          CHECK(status IN ('pending','approved','done','rejected')),
        visit_id          INTEGER,
        rejection_reason  TEXT,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_clinic_passes_student ON clinic_passes(student_id, status);

    CREATE TABLE IF NOT EXISTS clinic_visits (
        id                   INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id           TEXT NOT NULL,
        staff_id             TEXT NOT NULL,
        pass_id              INTEGER,
        status               TEXT NOT NULL DEFAULT 'in_clinic',
        notes                TEXT NOT NULL DEFAULT '',
        diagnosis            TEXT NOT NULL DEFAULT '',
        treatment            TEXT NOT NULL DEFAULT '',
        action               TEXT NOT NULL DEFAULT '',
        entered_at           TEXT NOT NULL,
        exited_at            TEXT,
        teacher_approved_by  TEXT,
        teacher_approved_at  TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_clinic_visits_student ON clinic_visits(student_id, status);
"#;

const NOTIFICATION_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        recipient_id  TEXT NOT NULL,
        actor_id      TEXT NOT NULL,
        verb          TEXT NOT NULL,
        payload       TEXT NOT NULL,
        is_read       INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, is_read);
"#;

const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("20260901_0001_core_schema", CORE_SCHEMA, "Created directory, ledger and rule tables"),
    ("20260901_0002_clinic_schema", CLINIC_SCHEMA, "Created clinic pass and visit tables"),
    ("20260901_0003_notifications", NOTIFICATION_SCHEMA, "Created notifications table"),
];

/// Public entry point: run all pending migrations.
///
/// Invoked by `db::initialize::init_db()`.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    ensure_log_table(conn)?;

    for (version, sql, message) in MIGRATIONS {
        if is_applied(conn, version)? {
            continue;
        }
        conn.execute_batch(sql)?;
        mark_applied(conn, version, message)?;
        info!(version, "migration applied");
    }

    Ok(())
}
