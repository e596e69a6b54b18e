#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use campustap::config::Config;
use campustap::db::initialize::init_db;
use campustap::db::pool::DbPool;
use campustap::db::{rules, students};
use campustap::models::student::{Student, StudentStatus};
use chrono::NaiveDateTime;
use tempfile::TempDir;

pub const TEACHER: &str = "T-100";
pub const PARENT: &str = "P-001";
pub const GATE: &str = "G-01";
pub const NURSE: &str = "N-01";
pub const STUDENT: &str = "S-001";
pub const CLASS: &str = "7-A";
pub const CODE: &str = "SCH-2026-000001-0001";

pub fn cta() -> Command {
    cargo_bin_cmd!("campustap")
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid test timestamp")
}

/// Temp database with schema applied. Keep `dir` alive for the test's duration.
pub struct TestDb {
    pub dir: TempDir,
    pub path: String,
    pub pool: DbPool,
    pub cfg: Config,
}

pub fn setup_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir
        .path()
        .join("campustap.sqlite")
        .to_string_lossy()
        .to_string();
    let pool = DbPool::new(&path).expect("open db");
    init_db(&pool.conn).expect("init db");
    let cfg = Config {
        database: path.clone(),
        ..Config::default()
    };
    TestDb {
        dir,
        path,
        pool,
        cfg,
    }
}

pub fn student(id: &str, grade: &str, class_id: Option<&str>, parent: Option<&str>) -> Student {
    Student {
        id: id.to_string(),
        full_name: format!("Student {id}"),
        grade_level: grade.to_string(),
        class_id: class_id.map(str::to_string),
        parent_id: parent.map(str::to_string),
        status: StudentStatus::Out,
    }
}

/// Standard school: class 7-A (homeroom T-100), student S-001 (parent P-001),
/// active code SCH-2026-000001-0001, grade 7 rule 07:30 / 07:45 / 08:15.
pub fn seeded() -> TestDb {
    let db = setup_test_db();
    let conn = &db.pool.conn;
    students::insert_class(conn, CLASS, "7", Some(TEACHER)).expect("class");
    students::insert_student(conn, &student(STUDENT, "7", Some(CLASS), Some(PARENT)))
        .expect("student");
    students::issue_code(conn, CODE, STUDENT, true).expect("code");
    rules::save_grade_rule(conn, "7", "07:30", "07:45", "08:15").expect("rule");
    db
}

pub fn reload(db: &TestDb, id: &str) -> Student {
    students::load_student(&db.pool.conn, id).expect("student exists")
}
