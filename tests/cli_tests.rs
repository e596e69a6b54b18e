use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

mod common;
use common::{CODE, GATE, NURSE, PARENT, STUDENT, TEACHER, TestDb, cta, seeded, setup_test_db};

/// Command bound to the test database, with HOME pointed at the temp dir so
/// no real config file is read or written.
fn cmd(db: &TestDb) -> Command {
    let mut c = cta();
    c.env("HOME", db.dir.path()).args(["--db", &db.path]);
    c
}

#[test]
fn test_init_creates_database_in_test_mode() {
    let db = setup_test_db();

    cmd(&db)
        .args(["--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));

    cmd(&db)
        .args(["log", "--print"])
        .assert()
        .success()
        .stdout(contains("init"));
}

#[test]
fn test_decode_prints_student() {
    let db = seeded();

    cmd(&db)
        .args(["--at", "2026-10-19 07:00:00", "decode", " sch-2026-000001-0001 "])
        .assert()
        .success()
        .stdout(contains(STUDENT));

    cmd(&db)
        .args(["--at", "2026-10-19 07:00:00", "decode", "SCH-2026-1-1"])
        .assert()
        .failure()
        .stderr(contains("invalid"));
}

#[test]
fn test_scan_day_through_the_cli() {
    let db = seeded();

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 08:00:00",
            "scan",
            "in",
            "--code",
            CODE,
            "--actor",
            GATE,
        ])
        .assert()
        .success()
        .stdout(contains("in: ok (late)"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 08:00:01",
            "scan",
            "in",
            "--code",
            CODE,
            "--actor",
            GATE,
        ])
        .assert()
        .success()
        .stdout(contains("duplicate"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 16:00:00",
            "scan",
            "out",
            "--student",
            STUDENT,
            "--actor",
            GATE,
        ])
        .assert()
        .success()
        .stdout(contains("out: ok (normal)"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 16:10:00",
            "scan",
            "out",
            "--student",
            STUDENT,
            "--actor",
            GATE,
        ])
        .assert()
        .success()
        .stderr(contains("rejected").and(contains("no_in")));

    cmd(&db)
        .args(["attendance", "--date", "2026-10-19"])
        .assert()
        .success()
        .stdout(contains("08:00:00").and(contains("late")).and(contains("normal")));

    cmd(&db)
        .args(["notify", "--recipient", PARENT])
        .assert()
        .success()
        .stdout(contains("late_arrival").and(contains("departure")));
}

#[test]
fn test_scan_rejects_bad_input() {
    let db = seeded();

    // invalid code never reaches the tap pipeline
    cmd(&db)
        .args(["scan", "in", "--code", "NOPE", "--actor", GATE])
        .assert()
        .failure()
        .stderr(contains("invalid code"));

    cmd(&db)
        .args(["scan", "up", "--student", STUDENT, "--actor", GATE])
        .assert()
        .failure()
        .stderr(contains("direction"));

    // exactly one of --code / --student
    cmd(&db)
        .args(["scan", "in", "--actor", GATE])
        .assert()
        .failure();
}

#[test]
fn test_clinic_flow_through_the_cli() {
    let db = seeded();

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 10:00:00",
            "clinic",
            "issue",
            "--teacher",
            TEACHER,
            "--student",
            STUDENT,
            "--reason",
            "fever",
        ])
        .assert()
        .success()
        .stdout(contains("Clinic pass #1"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 10:05:00",
            "clinic",
            "arrive",
            "--staff",
            NURSE,
            "--code",
            CODE,
        ])
        .assert()
        .success()
        .stdout(contains("visit #1"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 10:20:00",
            "clinic",
            "findings",
            "--staff",
            NURSE,
            "--visit",
            "1",
            "--diagnosis",
            "fever",
        ])
        .assert()
        .success()
        .stdout(contains("teacher_approval"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 10:30:00",
            "clinic",
            "teacher-approve",
            "--teacher",
            TEACHER,
            "--visit",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("parent_notified"));

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 10:40:00",
            "clinic",
            "complete",
            "--staff",
            NURSE,
            "--visit",
            "1",
            "--outcome",
            "sent_home",
        ])
        .assert()
        .success()
        .stdout(contains("sent_home"));

    // already closed
    cmd(&db)
        .args(["clinic", "complete", "--staff", NURSE, "--visit", "1"])
        .assert()
        .failure();

    cmd(&db)
        .args(["notify", "--recipient", PARENT, "--unread"])
        .assert()
        .success()
        .stdout(contains("clinic_summary").and(contains("sent_home")));
}

#[test]
fn test_notify_read_only_by_recipient() {
    let db = seeded();

    cmd(&db)
        .args([
            "--at",
            "2026-10-19 07:40:00",
            "scan",
            "in",
            "--student",
            STUDENT,
            "--actor",
            GATE,
        ])
        .assert()
        .success();

    // notification #1 went to the teacher
    cmd(&db)
        .args(["notify", "--recipient", PARENT, "--read", "1"])
        .assert()
        .failure();

    cmd(&db)
        .args(["notify", "--recipient", TEACHER, "--read", "1"])
        .assert()
        .success()
        .stdout(contains("marked as read"));

    cmd(&db)
        .args(["notify", "--recipient", TEACHER, "--unread"])
        .assert()
        .success()
        .stdout(contains("No notifications"));
}

#[test]
fn test_config_check_reports_defaults_as_valid() {
    let db = setup_test_db();

    cmd(&db)
        .args(["config", "--check"])
        .assert()
        .success();

    cmd(&db)
        .args(["config", "--print"])
        .assert()
        .success()
        .stdout(contains("debounce_ms"));
}
