mod common;

use campustap::core::clinic::ClinicCoordinator;
use campustap::core::clock::FixedClock;
use campustap::core::directory::Directory;
use campustap::db::{clinic, notifications, students, taps};
use campustap::errors::{AppError, AppResult};
use campustap::models::clinic::{Findings, PassStatus, VisitOutcome, VisitStatus};
use campustap::models::notification::NotificationEvent;
use campustap::models::student::StudentStatus;
use campustap::models::tap::TapSource;
use chrono::Duration;
use common::{NURSE, PARENT, STUDENT, TEACHER, TestDb, at, reload, seeded, student};

fn findings() -> Findings {
    Findings {
        diagnosis: "mild fever".into(),
        treatment: "paracetamol, rest".into(),
        action: "observe".into(),
    }
}

/// Make every matching write fail until `allow` drops the trigger.
fn refuse(db: &TestDb, trigger: &str, on: &str) {
    db.pool
        .conn
        .execute_batch(&format!(
            "CREATE TRIGGER {trigger} BEFORE UPDATE OF {on}
             BEGIN SELECT RAISE(ABORT, 'write refused'); END;"
        ))
        .unwrap();
}

fn allow(db: &TestDb, trigger: &str) {
    db.pool
        .conn
        .execute_batch(&format!("DROP TRIGGER {trigger};"))
        .unwrap();
}

fn clinic_tap_count(db: &TestDb) -> usize {
    taps::load_taps_for_student(&db.pool.conn, STUDENT)
        .unwrap()
        .into_iter()
        .filter(|t| t.source == TapSource::Clinic)
        .count()
}

fn verbs_for(db: &TestDb, recipient: &str) -> Vec<&'static str> {
    notifications::load_for_recipient(&db.pool.conn, recipient, false)
        .unwrap()
        .iter()
        .map(|n| n.event.verb())
        .collect()
}

#[test]
fn test_pass_arrival_and_completion() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clock = FixedClock::new(at("2026-10-19 10:00:00"));
    let clinic_flow = ClinicCoordinator::new(conn).with_clock(&clock);

    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "fever").unwrap();
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Pending);

    clock.advance(Duration::minutes(5));
    let arrived = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "walked in")
        .unwrap();
    let visit_id = arrived.visit_id.unwrap();
    assert_eq!(arrived.pass_id, Some(pass_id));
    assert_eq!(arrived.notified, 2);

    let pass = clinic::load_pass(conn, pass_id).unwrap();
    assert_eq!(pass.status, PassStatus::Approved);
    assert_eq!(pass.visit_id, Some(visit_id));
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::InClinic);

    clock.advance(Duration::minutes(30));
    let done = clinic_flow
        .complete_visit(NURSE, visit_id, VisitOutcome::Completed, "back to class")
        .unwrap();
    assert_eq!(done.visit_status, Some(VisitStatus::Completed));

    let visit = clinic::load_visit(conn, visit_id).unwrap();
    assert_eq!(visit.status, VisitStatus::Completed);
    assert_eq!(visit.exited_at, Some(at("2026-10-19 10:35:00")));
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Done);
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::In);

    assert_eq!(verbs_for(&db, TEACHER), vec!["clinic_entry", "visit_completed"]);
    assert_eq!(verbs_for(&db, PARENT), vec!["clinic_entry", "visit_completed"]);

    let clinic_taps: Vec<_> = taps::load_taps_for_student(conn, STUDENT)
        .unwrap()
        .into_iter()
        .filter(|t| t.source == TapSource::Clinic)
        .collect();
    assert_eq!(clinic_taps.len(), 1);
}

#[test]
fn test_issue_pass_requires_reason_and_known_student() {
    let db = seeded();
    let clinic_flow = ClinicCoordinator::new(&db.pool.conn);

    assert!(matches!(
        clinic_flow.issue_pass(TEACHER, STUDENT, "   "),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        clinic_flow.issue_pass(TEACHER, "S-404", "fever"),
        Err(AppError::NotFound { .. })
    ));
}

#[test]
fn test_reject_requires_reason_and_pending_pass() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "headache").unwrap();

    assert!(matches!(
        clinic_flow.reject_pass(NURSE, pass_id, ""),
        Err(AppError::Validation(_))
    ));
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Pending);

    let out = clinic_flow.reject_pass(NURSE, pass_id, "clinic full").unwrap();
    assert_eq!(out.notified, 2);
    let pass = clinic::load_pass(conn, pass_id).unwrap();
    assert_eq!(pass.status, PassStatus::Rejected);
    assert_eq!(pass.rejection_reason.as_deref(), Some("clinic full"));
    assert_eq!(verbs_for(&db, TEACHER), vec!["pass_rejected"]);

    // terminal: neither decision can be repeated
    assert!(matches!(
        clinic_flow.reject_pass(NURSE, pass_id, "again"),
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        clinic_flow.approve_pass(NURSE, pass_id, ""),
        Err(AppError::InvalidState(_))
    ));
}

#[test]
fn test_approve_then_arrival_reuses_visit() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "cough").unwrap();

    let approved = clinic_flow.approve_pass(NURSE, pass_id, "send now").unwrap();
    let visit_id = approved.visit_id.unwrap();
    assert_eq!(verbs_for(&db, PARENT), vec!["pass_approved"]);

    let arrived = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap();
    assert_eq!(arrived.visit_id, Some(visit_id));
    assert_eq!(clinic::count_open_visits(conn, STUDENT).unwrap(), 1);
}

#[test]
fn test_walk_in_never_opens_a_second_visit() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 11:00:00")));
    let s = reload(&db, STUDENT);

    let first = clinic_flow.record_arrival(NURSE, &s, "walk-in").unwrap();
    assert_eq!(first.pass_id, None);
    // no pass issuer: only the parent hears about a walk-in
    assert_eq!(first.notified, 1);

    let second = clinic_flow.record_arrival(NURSE, &s, "scanned again").unwrap();
    assert_eq!(second.visit_id, first.visit_id);
    assert_eq!(clinic::count_open_visits(conn, STUDENT).unwrap(), 1);

    // still reused once treatment has started
    clinic_flow
        .record_findings(NURSE, first.visit_id.unwrap(), &findings())
        .unwrap();
    let third = clinic_flow.record_arrival(NURSE, &s, "").unwrap();
    assert_eq!(third.visit_id, first.visit_id);
    assert_eq!(third.visit_status, Some(VisitStatus::TeacherApproval));
    assert_eq!(clinic::count_open_visits(conn, STUDENT).unwrap(), 1);
}

#[test]
fn test_findings_route_through_homeroom_teacher() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();

    let out = clinic_flow.record_findings(NURSE, visit_id, &findings()).unwrap();
    assert_eq!(out.visit_status, Some(VisitStatus::TeacherApproval));

    let teacher_msgs = notifications::load_for_recipient(conn, TEACHER, false).unwrap();
    let Some(NotificationEvent::FindingsRecorded(payload)) = teacher_msgs.last().map(|n| &n.event)
    else {
        panic!("teacher should get findings_recorded");
    };
    assert!(payload.requires_approval);
    assert_eq!(payload.findings, findings());
    // the parent hears nothing until the teacher signs off
    assert_eq!(verbs_for(&db, PARENT), vec!["clinic_entry"]);

    let approved = clinic_flow.teacher_approve(TEACHER, visit_id).unwrap();
    assert_eq!(approved.visit_status, Some(VisitStatus::ParentNotified));

    let visit = clinic::load_visit(conn, visit_id).unwrap();
    assert_eq!(visit.status, VisitStatus::ParentNotified);
    assert_eq!(visit.teacher_approved_by.as_deref(), Some(TEACHER));
    assert_eq!(verbs_for(&db, NURSE), vec!["clinic_confirmed"]);
    assert_eq!(verbs_for(&db, PARENT), vec!["clinic_entry", "clinic_summary"]);

    // clinic staff are notified before the parent
    let all = notifications::load_all(conn).unwrap();
    let nurse_pos = all.iter().position(|n| n.recipient_id == NURSE).unwrap();
    let summary_pos = all
        .iter()
        .position(|n| n.event.verb() == "clinic_summary")
        .unwrap();
    assert!(nurse_pos < summary_pos);

    // approval cannot be repeated
    assert!(matches!(
        clinic_flow.teacher_approve(TEACHER, visit_id),
        Err(AppError::InvalidState(_))
    ));
}

#[test]
fn test_findings_without_homeroom_go_to_parent() {
    let db = seeded();
    let conn = &db.pool.conn;
    students::insert_student(conn, &student("S-002", "7", None, Some("P-002"))).unwrap();
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, "S-002"), "")
        .unwrap()
        .visit_id
        .unwrap();

    let out = clinic_flow.record_findings(NURSE, visit_id, &findings()).unwrap();
    assert_eq!(out.visit_status, Some(VisitStatus::ParentNotified));
    assert_eq!(verbs_for(&db, "P-002"), vec!["clinic_entry", "clinic_summary"]);
    assert!(verbs_for(&db, TEACHER).is_empty());

    assert!(matches!(
        clinic_flow.teacher_approve(TEACHER, visit_id),
        Err(AppError::InvalidState(_))
    ));
}

#[test]
fn test_sent_home_marks_student_out() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 13:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();
    clinic_flow.record_findings(NURSE, visit_id, &findings()).unwrap();

    let out = clinic_flow
        .complete_visit(NURSE, visit_id, VisitOutcome::SentHome, "picked up by parent")
        .unwrap();
    assert_eq!(out.visit_status, Some(VisitStatus::SentHome));
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::Out);
    assert_eq!(verbs_for(&db, PARENT).last(), Some(&"sent_home"));
    assert!(
        clinic::load_visit(conn, visit_id)
            .unwrap()
            .notes
            .contains("picked up by parent")
    );
}

#[test]
fn test_second_completion_loses_the_race() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();

    clinic_flow
        .complete_visit(NURSE, visit_id, VisitOutcome::Completed, "")
        .unwrap();
    let err = clinic_flow
        .complete_visit("N-02", visit_id, VisitOutcome::SentHome, "")
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(
        clinic::load_visit(conn, visit_id).unwrap().status,
        VisitStatus::Completed
    );
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::In);
}

#[test]
fn test_stale_transition_is_refused_in_storage() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();
    clinic_flow.record_findings(NURSE, visit_id, &findings()).unwrap();

    // another terminal already moved it on from in_clinic
    let err = clinic::transition_visit(conn, visit_id, VisitStatus::InClinic, VisitStatus::Treated)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[test]
fn test_departure_closes_open_visit() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clock = FixedClock::new(at("2026-10-19 09:00:00"));
    let clinic_flow = ClinicCoordinator::new(conn).with_clock(&clock);
    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "dizzy").unwrap();
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();

    clock.advance(Duration::minutes(20));
    let out = clinic_flow
        .record_departure(NURSE, &reload(&db, STUDENT), "feeling better")
        .unwrap();
    assert_eq!(out.visit_id, Some(visit_id));
    assert_eq!(
        clinic::load_visit(conn, visit_id).unwrap().status,
        VisitStatus::Completed
    );
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Done);
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::In);
    assert_eq!(verbs_for(&db, TEACHER).last(), Some(&"clinic_exit"));

    // nothing left to close: only the tap is logged
    let again = clinic_flow
        .record_departure(NURSE, &reload(&db, STUDENT), "")
        .unwrap();
    assert_eq!(again.visit_id, None);
    assert_eq!(again.notified, 0);
}

#[test]
fn test_approve_after_walk_in_keeps_one_visit() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));

    let walk_in = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "walk-in")
        .unwrap();
    let visit_id = walk_in.visit_id.unwrap();

    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "headache").unwrap();
    let approved = clinic_flow.approve_pass(NURSE, pass_id, "already here").unwrap();
    assert_eq!(approved.visit_id, Some(visit_id));
    assert_eq!(approved.visit_status, Some(VisitStatus::InClinic));
    assert_eq!(clinic::count_open_visits(conn, STUDENT).unwrap(), 1);
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().visit_id, Some(visit_id));

    // closing the shared visit finishes the pass attached to it
    clinic_flow
        .complete_visit(NURSE, visit_id, VisitOutcome::Completed, "")
        .unwrap();
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Done);
    assert_eq!(clinic::count_open_visits(conn, STUDENT).unwrap(), 0);
}

#[test]
fn test_failed_completion_rolls_back_and_can_be_retried() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let pass_id = clinic_flow.issue_pass(TEACHER, STUDENT, "fever").unwrap();
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();

    refuse(&db, "hold_student", "status ON students");
    assert!(
        clinic_flow
            .complete_visit(NURSE, visit_id, VisitOutcome::SentHome, "")
            .is_err()
    );
    assert_eq!(clinic::load_visit(conn, visit_id).unwrap().status, VisitStatus::InClinic);
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Approved);
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::InClinic);
    assert!(!verbs_for(&db, PARENT).contains(&"sent_home"));

    allow(&db, "hold_student");
    let done = clinic_flow
        .complete_visit(NURSE, visit_id, VisitOutcome::SentHome, "")
        .unwrap();
    assert_eq!(done.visit_status, Some(VisitStatus::SentHome));
    assert_eq!(clinic::load_pass(conn, pass_id).unwrap().status, PassStatus::Done);
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::Out);
}

#[test]
fn test_failed_departure_rolls_back_and_can_be_retried() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 09:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();
    assert_eq!(clinic_tap_count(&db), 1);

    refuse(&db, "hold_student", "status ON students");
    assert!(
        clinic_flow
            .record_departure(NURSE, &reload(&db, STUDENT), "")
            .is_err()
    );
    assert_eq!(clinic::load_visit(conn, visit_id).unwrap().status, VisitStatus::InClinic);
    assert_eq!(clinic_tap_count(&db), 1);

    allow(&db, "hold_student");
    let out = clinic_flow
        .record_departure(NURSE, &reload(&db, STUDENT), "")
        .unwrap();
    assert_eq!(out.visit_id, Some(visit_id));
    assert_eq!(clinic_tap_count(&db), 2);
    assert_eq!(reload(&db, STUDENT).status, StudentStatus::In);
}

#[test]
fn test_failed_teacher_stamp_keeps_visit_awaiting_approval() {
    let db = seeded();
    let conn = &db.pool.conn;
    let clinic_flow =
        ClinicCoordinator::new(conn).with_clock(FixedClock::new(at("2026-10-19 10:00:00")));
    let visit_id = clinic_flow
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();
    clinic_flow.record_findings(NURSE, visit_id, &findings()).unwrap();

    refuse(&db, "hold_stamp", "teacher_approved_by ON clinic_visits");
    assert!(clinic_flow.teacher_approve(TEACHER, visit_id).is_err());
    let visit = clinic::load_visit(conn, visit_id).unwrap();
    assert_eq!(visit.status, VisitStatus::TeacherApproval);
    assert_eq!(visit.teacher_approved_by, None);

    allow(&db, "hold_stamp");
    clinic_flow.teacher_approve(TEACHER, visit_id).unwrap();
    let visit = clinic::load_visit(conn, visit_id).unwrap();
    assert_eq!(visit.status, VisitStatus::ParentNotified);
    assert_eq!(visit.teacher_approved_by.as_deref(), Some(TEACHER));
    assert_eq!(verbs_for(&db, PARENT).last(), Some(&"clinic_summary"));
}

/// Directory whose lookups always fail.
struct OfflineDirectory;

impl Directory for OfflineDirectory {
    fn homeroom_teacher_id(&self, class_id: &str) -> AppResult<Option<String>> {
        Err(AppError::Other(format!("directory offline for {class_id}")))
    }
}

#[test]
fn test_directory_outage_during_findings_changes_nothing() {
    let db = seeded();
    let conn = &db.pool.conn;
    let visit_id = ClinicCoordinator::new(conn)
        .with_clock(FixedClock::new(at("2026-10-19 10:00:00")))
        .record_arrival(NURSE, &reload(&db, STUDENT), "")
        .unwrap()
        .visit_id
        .unwrap();

    let offline = ClinicCoordinator::new(conn)
        .with_directory(OfflineDirectory)
        .with_clock(FixedClock::new(at("2026-10-19 10:15:00")));
    assert!(offline.record_findings(NURSE, visit_id, &findings()).is_err());
    let visit = clinic::load_visit(conn, visit_id).unwrap();
    assert_eq!(visit.status, VisitStatus::InClinic);
    assert!(visit.findings.diagnosis.is_empty());

    // closing still works; the teacher is skipped and the parent is told
    let done = offline
        .complete_visit(NURSE, visit_id, VisitOutcome::Completed, "")
        .unwrap();
    assert_eq!(done.visit_status, Some(VisitStatus::Completed));
    assert_eq!(done.notified, 1);
    assert!(done.notify_errors[0].starts_with("teacher lookup"));
    assert_eq!(verbs_for(&db, PARENT).last(), Some(&"visit_completed"));
}
