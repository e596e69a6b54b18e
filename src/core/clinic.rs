//! Clinic pass / visit workflow.
//!
//! Pass:  pending → approved → done, or pending → rejected
//! Visit: in_clinic → treated → teacher_approval → parent_notified → completed | sent_home
//!
//! No lock spans two calls. Every step re-reads the rows it touches inside one
//! IMMEDIATE transaction and the status transitions are guarded in SQL, so a
//! step that lost a race against another clinic terminal fails with
//! `InvalidState` instead of overwriting, and a step that failed halfway
//! leaves nothing behind. Notifications go out after commit.

use crate::core::clock::{Clock, SystemClock};
use crate::core::directory::{Directory, SqliteDirectory, teacher_for};
use crate::core::notify::{DispatchReport, Dispatcher, NotificationSink, SqliteSink};
use crate::db::{clinic, students, taps};
use crate::errors::{AppError, AppResult};
use crate::models::clinic::{ClinicPass, ClinicVisit, Findings, PassStatus, VisitOutcome, VisitStatus};
use crate::models::direction::Direction;
use crate::models::notification::{
    ClinicMovePayload, NotificationEvent, PassPayload, TapPayload, VisitClosedPayload,
    VisitPayload,
};
use crate::models::student::{Student, StudentStatus};
use crate::models::tap::{TapLogEntry, TapOutcome, TapSource};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::info;

/// What a clinic step changed, plus its notification fan-out.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClinicOutcome {
    pub pass_id: Option<i64>,
    pub visit_id: Option<i64>,
    pub visit_status: Option<VisitStatus>,
    pub notified: usize,
    pub notify_errors: Vec<String>,
}

impl ClinicOutcome {
    fn absorb(&mut self, report: DispatchReport) {
        self.notified += report.sent();
        self.notify_errors.extend(report.errors);
    }
}

fn require_text(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn clinic_tap(
    conn: &Connection,
    staff_id: &str,
    student: &Student,
    direction: Direction,
    remark: String,
    now: NaiveDateTime,
) -> AppResult<i64> {
    let entry = TapLogEntry::new(
        &student.id,
        staff_id,
        direction,
        TapSource::Clinic,
        TapOutcome::Ok,
        remark,
        now,
    );
    taps::append_tap(conn, &entry)
}

/// Reuse the student's non-terminal visit, or open a new one.
fn visit_for(
    conn: &Connection,
    student_id: &str,
    staff_id: &str,
    pass_id: Option<i64>,
    notes: &str,
    now: NaiveDateTime,
) -> AppResult<(i64, VisitStatus)> {
    match clinic::find_active_visit(conn, student_id)? {
        Some(v) => Ok((v.id, v.status)),
        None => Ok((
            clinic::insert_visit(conn, student_id, staff_id, pass_id, notes, now)?,
            VisitStatus::InClinic,
        )),
    }
}

pub struct ClinicCoordinator<'a> {
    conn: &'a Connection,
    directory: Box<dyn Directory + 'a>,
    dispatcher: Dispatcher<'a>,
    clock: Box<dyn Clock + 'a>,
}

impl<'a> ClinicCoordinator<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            directory: Box::new(SqliteDirectory::new(conn)),
            dispatcher: Dispatcher::new(SqliteSink::new(conn)),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_directory(mut self, directory: impl Directory + 'a) -> Self {
        self.directory = Box::new(directory);
        self
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'a) -> Self {
        self.dispatcher = Dispatcher::new(sink);
        self
    }

    fn homeroom_teacher(&self, student: &Student) -> AppResult<Option<String>> {
        teacher_for(self.directory.as_ref(), student.class_id.as_deref())
    }

    /// Run one step's reads and writes in a single IMMEDIATE transaction.
    /// Nothing is kept when `func` fails, so the step can simply be retried.
    fn atomically<T>(&self, func: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let value = func(&*tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn pass_payload(pass: &ClinicPass, student: &Student, notes: &str) -> PassPayload {
        PassPayload {
            pass_id: pass.id,
            student_id: student.id.clone(),
            student_name: student.full_name.clone(),
            visit_id: pass.visit_id,
            notes: notes.to_string(),
        }
    }

    fn visit_payload(visit: &ClinicVisit, student: &Student, requires_approval: bool) -> VisitPayload {
        VisitPayload {
            visit_id: visit.id,
            student_id: student.id.clone(),
            student_name: student.full_name.clone(),
            findings: visit.findings.clone(),
            requires_approval,
        }
    }

    /// Teacher sends a student to the clinic.
    pub fn issue_pass(&self, teacher_id: &str, student_id: &str, reason: &str) -> AppResult<i64> {
        require_text(teacher_id, "teacher id")?;
        require_text(reason, "reason")?;
        let student = students::load_student(self.conn, student_id)?;

        let id = clinic::insert_pass(
            self.conn,
            &student.id,
            teacher_id,
            reason.trim(),
            self.clock.now(),
        )?;
        info!(pass = id, student = %student.id, "clinic pass issued");
        Ok(id)
    }

    /// Clinic staff scan a student in, with or without a pass.
    pub fn record_arrival(
        &self,
        staff_id: &str,
        student: &Student,
        notes: &str,
    ) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        let now = self.clock.now();

        let (pass, visit_id, visit_status) = self.atomically(|conn| {
            let pass = clinic::find_open_pass(conn, &student.id)?;

            // The pass's own visit first, then any open visit of the student,
            // so one student never holds two concurrent visits.
            let linked = match pass.as_ref().and_then(|p| p.visit_id) {
                Some(id) => Some(clinic::load_visit(conn, id)?).filter(|v| !v.status.is_terminal()),
                None => None,
            };
            let (visit_id, visit_status) = match linked {
                Some(v) => (v.id, v.status),
                None => visit_for(conn, &student.id, staff_id, pass.as_ref().map(|p| p.id), notes, now)?,
            };

            if let Some(p) = &pass {
                clinic::update_pass_status(conn, p.id, PassStatus::Approved, Some(visit_id), None, now)?;
            }
            clinic_tap(conn, staff_id, student, Direction::In, format!("clinic arrival: {notes}"), now)?;
            students::set_status(conn, &student.id, StudentStatus::InClinic)?;
            Ok((pass, visit_id, visit_status))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: pass.as_ref().map(|p| p.id),
            visit_id: Some(visit_id),
            visit_status: Some(visit_status),
            ..Default::default()
        };

        let event = NotificationEvent::ClinicEntry(ClinicMovePayload {
            tap: TapPayload {
                student_id: student.id.clone(),
                student_name: student.full_name.clone(),
                at: now,
            },
            visit_id: Some(visit_id),
            pass_id: outcome.pass_id,
            notes: notes.to_string(),
        });
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            pass.as_ref().map(|p| p.issued_by.as_str()),
            student.parent_id.as_deref(),
            staff_id,
            &event,
            now,
        ));

        info!(student = %student.id, visit = visit_id, "clinic arrival recorded");
        Ok(outcome)
    }

    /// Student leaves the clinic on their own; closes the latest open visit.
    pub fn record_departure(
        &self,
        staff_id: &str,
        student: &Student,
        notes: &str,
    ) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        let now = self.clock.now();

        let closed = self.atomically(|conn| {
            let Some(visit) = clinic::find_open_visit(conn, &student.id)? else {
                clinic_tap(
                    conn,
                    staff_id,
                    student,
                    Direction::Out,
                    format!("clinic departure without open visit: {notes}"),
                    now,
                )?;
                return Ok(None);
            };

            clinic::close_visit(conn, visit.id, visit.status, VisitStatus::Completed, notes, now)?;
            clinic::finish_passes_for_visit(conn, visit.id, now)?;
            let pass = clinic::find_pass_for_visit(conn, visit.id)?;
            clinic_tap(conn, staff_id, student, Direction::Out, format!("clinic departure: {notes}"), now)?;
            students::set_status(conn, &student.id, StudentStatus::In)?;
            Ok(Some((visit, pass)))
        })?;
        let Some((visit, pass)) = closed else {
            return Ok(ClinicOutcome::default());
        };

        let mut outcome = ClinicOutcome {
            pass_id: pass.as_ref().map(|p| p.id),
            visit_id: Some(visit.id),
            visit_status: Some(VisitStatus::Completed),
            ..Default::default()
        };

        let event = NotificationEvent::ClinicExit(ClinicMovePayload {
            tap: TapPayload {
                student_id: student.id.clone(),
                student_name: student.full_name.clone(),
                at: now,
            },
            visit_id: Some(visit.id),
            pass_id: outcome.pass_id,
            notes: notes.to_string(),
        });
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            pass.as_ref().map(|p| p.issued_by.as_str()),
            student.parent_id.as_deref(),
            staff_id,
            &event,
            now,
        ));

        info!(student = %student.id, visit = visit.id, "clinic departure recorded");
        Ok(outcome)
    }

    /// Clinic accepts a pending pass before the student has been scanned in.
    /// A student already in the clinic keeps their open visit.
    pub fn approve_pass(&self, staff_id: &str, pass_id: i64, notes: &str) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        let now = self.clock.now();

        let (pass, student, visit_id, visit_status) = self.atomically(|conn| {
            let pass = clinic::load_pass(conn, pass_id)?;
            if pass.status != PassStatus::Pending {
                return Err(AppError::InvalidState(format!(
                    "pass {pass_id} is '{}', only pending passes can be approved",
                    pass.status.to_db_str()
                )));
            }
            let student = students::load_student(conn, &pass.student_id)?;
            let (visit_id, visit_status) =
                visit_for(conn, &student.id, staff_id, Some(pass.id), notes, now)?;
            clinic::update_pass_status(conn, pass.id, PassStatus::Approved, Some(visit_id), None, now)?;
            let pass = clinic::load_pass(conn, pass.id)?;
            Ok((pass, student, visit_id, visit_status))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: Some(pass.id),
            visit_id: Some(visit_id),
            visit_status: Some(visit_status),
            ..Default::default()
        };
        let event = NotificationEvent::PassApproved(Self::pass_payload(&pass, &student, notes));
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            Some(&pass.issued_by),
            student.parent_id.as_deref(),
            staff_id,
            &event,
            now,
        ));

        info!(pass = pass.id, visit = visit_id, "clinic pass approved");
        Ok(outcome)
    }

    pub fn reject_pass(&self, staff_id: &str, pass_id: i64, reason: &str) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        require_text(reason, "rejection reason")?;
        let now = self.clock.now();

        let (pass, student) = self.atomically(|conn| {
            let pass = clinic::load_pass(conn, pass_id)?;
            if pass.status != PassStatus::Pending {
                return Err(AppError::InvalidState(format!(
                    "pass {pass_id} is '{}', only pending passes can be rejected",
                    pass.status.to_db_str()
                )));
            }
            let student = students::load_student(conn, &pass.student_id)?;
            clinic::update_pass_status(
                conn,
                pass.id,
                PassStatus::Rejected,
                None,
                Some(reason.trim()),
                now,
            )?;
            Ok((pass, student))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: Some(pass.id),
            ..Default::default()
        };
        let event =
            NotificationEvent::PassRejected(Self::pass_payload(&pass, &student, reason.trim()));
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            Some(&pass.issued_by),
            student.parent_id.as_deref(),
            staff_id,
            &event,
            now,
        ));

        info!(pass = pass.id, "clinic pass rejected");
        Ok(outcome)
    }

    /// Attach findings; route to the homeroom teacher for approval when one
    /// exists, otherwise straight to the parent.
    pub fn record_findings(
        &self,
        staff_id: &str,
        visit_id: i64,
        findings: &Findings,
    ) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        let now = self.clock.now();

        let (visit, student, teacher) = self.atomically(|conn| {
            let visit = clinic::load_visit(conn, visit_id)?;
            match visit.status {
                VisitStatus::InClinic => {
                    clinic::transition_visit(conn, visit.id, VisitStatus::InClinic, VisitStatus::Treated)?
                }
                // Left behind by a step that stopped before routing.
                VisitStatus::Treated => {}
                other => {
                    return Err(AppError::InvalidState(format!(
                        "visit {visit_id} is '{}', findings can no longer be recorded",
                        other.to_db_str()
                    )));
                }
            }
            clinic::save_findings(conn, visit.id, findings)?;

            let visit = clinic::load_visit(conn, visit.id)?;
            let student = students::load_student(conn, &visit.student_id)?;
            let teacher = self.homeroom_teacher(&student)?;
            let next = match teacher {
                Some(_) => VisitStatus::TeacherApproval,
                None => VisitStatus::ParentNotified,
            };
            clinic::transition_visit(conn, visit.id, VisitStatus::Treated, next)?;
            Ok((visit, student, teacher))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: visit.pass_id,
            visit_id: Some(visit.id),
            ..Default::default()
        };

        match teacher {
            Some(teacher_id) => {
                let event =
                    NotificationEvent::FindingsRecorded(Self::visit_payload(&visit, &student, true));
                outcome.absorb(self.dispatcher.send_staff_then_parent(
                    Some(&teacher_id),
                    None,
                    staff_id,
                    &event,
                    now,
                ));
                outcome.visit_status = Some(VisitStatus::TeacherApproval);
            }
            None => {
                let event =
                    NotificationEvent::ClinicSummary(Self::visit_payload(&visit, &student, false));
                outcome.absorb(self.dispatcher.send_staff_then_parent(
                    None,
                    student.parent_id.as_deref(),
                    staff_id,
                    &event,
                    now,
                ));
                outcome.visit_status = Some(VisitStatus::ParentNotified);
            }
        }

        info!(visit = visit.id, status = ?outcome.visit_status, "clinic findings recorded");
        Ok(outcome)
    }

    /// Homeroom teacher signs off on the findings; the parent gets the summary.
    pub fn teacher_approve(&self, teacher_id: &str, visit_id: i64) -> AppResult<ClinicOutcome> {
        require_text(teacher_id, "teacher id")?;
        let now = self.clock.now();

        let (visit, student) = self.atomically(|conn| {
            let visit = clinic::load_visit(conn, visit_id)?;
            if visit.status != VisitStatus::TeacherApproval {
                return Err(AppError::InvalidState(format!(
                    "visit {visit_id} is '{}', not awaiting teacher approval",
                    visit.status.to_db_str()
                )));
            }
            let student = students::load_student(conn, &visit.student_id)?;
            clinic::transition_visit(
                conn,
                visit.id,
                VisitStatus::TeacherApproval,
                VisitStatus::ParentNotified,
            )?;
            clinic::stamp_teacher_approval(conn, visit.id, teacher_id, now)?;
            Ok((visit, student))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: visit.pass_id,
            visit_id: Some(visit.id),
            visit_status: Some(VisitStatus::ParentNotified),
            ..Default::default()
        };

        // Clinic staff are told first; the parent follows with the summary.
        let confirmed = NotificationEvent::ClinicConfirmed(Self::visit_payload(&visit, &student, false));
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            Some(&visit.staff_id),
            None,
            teacher_id,
            &confirmed,
            now,
        ));
        let summary = NotificationEvent::ClinicSummary(Self::visit_payload(&visit, &student, false));
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            None,
            student.parent_id.as_deref(),
            teacher_id,
            &summary,
            now,
        ));

        info!(visit = visit.id, teacher = teacher_id, "clinic visit approved by teacher");
        Ok(outcome)
    }

    /// Close a visit as `completed` (back to class) or `sent_home`.
    pub fn complete_visit(
        &self,
        staff_id: &str,
        visit_id: i64,
        how: VisitOutcome,
        notes: &str,
    ) -> AppResult<ClinicOutcome> {
        require_text(staff_id, "clinic staff id")?;
        let now = self.clock.now();
        let target = how.status();

        let (visit, student) = self.atomically(|conn| {
            let visit = clinic::load_visit(conn, visit_id)?;
            if !visit.status.can_advance_to(target) {
                return Err(AppError::InvalidState(format!(
                    "visit {visit_id} is '{}' and cannot move to '{}'",
                    visit.status.to_db_str(),
                    target.to_db_str()
                )));
            }
            let student = students::load_student(conn, &visit.student_id)?;

            clinic::close_visit(conn, visit.id, visit.status, target, notes, now)?;
            clinic::finish_passes_for_visit(conn, visit.id, now)?;
            let live = match how {
                VisitOutcome::Completed => StudentStatus::In,
                VisitOutcome::SentHome => StudentStatus::Out,
            };
            students::set_status(conn, &student.id, live)?;
            Ok((visit, student))
        })?;

        let mut outcome = ClinicOutcome {
            pass_id: visit.pass_id,
            visit_id: Some(visit.id),
            visit_status: Some(target),
            ..Default::default()
        };

        let payload = VisitClosedPayload {
            visit_id: visit.id,
            student_id: student.id.clone(),
            student_name: student.full_name.clone(),
            exited_at: now,
            notes: notes.to_string(),
        };
        let event = match how {
            VisitOutcome::Completed => NotificationEvent::VisitCompleted(payload),
            VisitOutcome::SentHome => NotificationEvent::SentHome(payload),
        };

        let teacher = match self.homeroom_teacher(&student) {
            Ok(t) => t,
            Err(e) => {
                outcome.notify_errors.push(format!("teacher lookup: {e}"));
                None
            }
        };
        outcome.absorb(self.dispatcher.send_staff_then_parent(
            teacher.as_deref(),
            student.parent_id.as_deref(),
            staff_id,
            &event,
            now,
        ));

        info!(visit = visit.id, status = target.to_db_str(), "clinic visit closed");
        Ok(outcome)
    }
}
