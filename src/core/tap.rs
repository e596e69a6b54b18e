//! Gate tap processing.
//!
//! Per student and day the accepted gate taps alternate `in → out → in …`.
//! Each scan runs as a short pipeline; every stage either lets the scan
//! through or stops it with a structured outcome that is also written to the
//! tap log:
//!
//! 1. direction must be `in` / `out` (validation error, nothing written)
//! 2. blackout day for the student's grade → `blocked`
//! 3. same direction as the latest accepted tap inside the debounce window → `duplicate`
//! 4. `out` without a preceding `in` → `rejected` (`no_in`)
//! 5. `in` right after `in` → `rejected` (`already_in`)
//! 6. accepted: ledger row, live status, tap log, teacher then parent notified

use crate::config::Config;
use crate::core::calendar::{Calendar, SqliteCalendar};
use crate::core::clock::{Clock, SystemClock};
use crate::core::directory::{Directory, SqliteDirectory, teacher_for};
use crate::core::locks::StudentLocks;
use crate::core::notify::{Dispatcher, NotificationSink, SqliteSink};
use crate::core::rules::RuleCache;
use crate::db::{attendance, students, taps};
use crate::errors::{AppError, AppResult};
use crate::models::attendance::Classification;
use crate::models::direction::Direction;
use crate::models::notification::{
    ArrivalPayload, DeparturePayload, NotificationEvent, TapPayload,
};
use crate::models::student::{Student, StudentStatus};
use crate::models::tap::{TapLogEntry, TapOutcome, TapSource};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

pub const REASON_BLACKOUT: &str = "blackout";
pub const REASON_DUPLICATE: &str = "duplicate_scan";
pub const REASON_NO_IN: &str = "no_in";
pub const REASON_ALREADY_IN: &str = "already_in";

#[derive(Debug, Clone, Serialize)]
pub struct TapResult {
    pub outcome: TapOutcome,
    pub classification: Option<Classification>,
    pub reason: Option<String>,
    pub log_id: i64,
    /// Notification failures; the tap itself is already recorded.
    pub notify_errors: Vec<String>,
    pub notified: usize,
}

impl TapResult {
    fn stopped(outcome: TapOutcome, reason: &str, log_id: i64) -> Self {
        Self {
            outcome,
            classification: None,
            reason: Some(reason.to_string()),
            log_id,
            notify_errors: Vec::new(),
            notified: 0,
        }
    }
}

/// Accepted tap waiting for notification fan-out after commit.
struct Accepted {
    log_id: i64,
    classification: Classification,
    event: NotificationEvent,
}

enum Stage {
    Stopped(TapResult),
    Accepted(Accepted),
}

pub struct TapProcessor<'a> {
    conn: &'a Connection,
    debounce_ms: i64,
    rules: &'a RuleCache,
    locks: &'a StudentLocks,
    calendar: Box<dyn Calendar + 'a>,
    directory: Box<dyn Directory + 'a>,
    dispatcher: Dispatcher<'a>,
    clock: Box<dyn Clock + 'a>,
}

impl<'a> TapProcessor<'a> {
    pub fn new(
        conn: &'a Connection,
        cfg: &Config,
        rules: &'a RuleCache,
        locks: &'a StudentLocks,
    ) -> Self {
        Self {
            conn,
            debounce_ms: cfg.debounce_ms,
            rules,
            locks,
            calendar: Box::new(SqliteCalendar::new(conn)),
            directory: Box::new(SqliteDirectory::new(conn)),
            dispatcher: Dispatcher::new(SqliteSink::new(conn)),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_calendar(mut self, calendar: impl Calendar + 'a) -> Self {
        self.calendar = Box::new(calendar);
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

    /// Process one scan of `student` in `direction` (`"in"` / `"out"`).
    pub fn process_tap(
        &self,
        actor_id: &str,
        student: &Student,
        direction: &str,
    ) -> AppResult<TapResult> {
        let direction = Direction::parse(direction).ok_or_else(|| {
            AppError::Validation(format!(
                "direction must be 'in' or 'out', got '{}'",
                direction.trim()
            ))
        })?;
        if actor_id.trim().is_empty() {
            return Err(AppError::Validation("actor id is required".into()));
        }

        self.locks.with_student(&student.id, || -> AppResult<TapResult> {
            let now = self.clock.now();

            // IMMEDIATE takes the write lock up front so other connections
            // cannot slip a tap in between our read and our write.
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let stage = self.evaluate(&tx, actor_id, student, direction, now)?;
            tx.commit()?;

            match stage {
                Stage::Stopped(result) => {
                    debug!(
                        student = %student.id,
                        outcome = result.outcome.to_db_str(),
                        reason = result.reason.as_deref().unwrap_or(""),
                        "tap stopped"
                    );
                    Ok(result)
                }
                Stage::Accepted(accepted) => self.notify(actor_id, student, accepted, now),
            }
        })
    }

    fn evaluate(
        &self,
        conn: &Connection,
        actor_id: &str,
        student: &Student,
        direction: Direction,
        now: NaiveDateTime,
    ) -> AppResult<Stage> {
        let today = now.date();
        let log = |outcome: TapOutcome, remark: String| {
            let entry = TapLogEntry::new(
                &student.id,
                actor_id,
                direction,
                TapSource::Gate,
                outcome,
                remark,
                now,
            );
            taps::append_tap(conn, &entry)
        };

        // 2) blackout
        if let Some(event) = self
            .calendar
            .find_blackout_event(today, &student.grade_level)?
        {
            let id = log(
                TapOutcome::Blocked,
                format!("{}: {}", event.kind.to_db_str(), event.title),
            )?;
            return Ok(Stage::Stopped(TapResult::stopped(
                TapOutcome::Blocked,
                REASON_BLACKOUT,
                id,
            )));
        }

        let latest = taps::latest_gate_tap_on(conn, &student.id, today)?;
        let latest_direction = latest.as_ref().map(|t| t.direction);

        // 3) debounce
        if let Some(last) = &latest
            && last.direction == direction
            && (now - last.tapped_at).num_milliseconds() < self.debounce_ms
        {
            let id = log(
                TapOutcome::Duplicate,
                format!("repeat of tap #{} within {} ms", last.id, self.debounce_ms),
            )?;
            return Ok(Stage::Stopped(TapResult::stopped(
                TapOutcome::Duplicate,
                REASON_DUPLICATE,
                id,
            )));
        }

        // 4) / 5) sequencing
        match (direction, latest_direction) {
            (Direction::Out, None | Some(Direction::Out)) => {
                let id = log(TapOutcome::Rejected, "tap-out without tap-in".into())?;
                return Ok(Stage::Stopped(TapResult::stopped(
                    TapOutcome::Rejected,
                    REASON_NO_IN,
                    id,
                )));
            }
            (Direction::In, Some(Direction::In)) => {
                let id = log(TapOutcome::Rejected, "double tap-in".into())?;
                return Ok(Stage::Stopped(TapResult::stopped(
                    TapOutcome::Rejected,
                    REASON_ALREADY_IN,
                    id,
                )));
            }
            _ => {}
        }

        // 6) / 7) accepted
        let rules = self.rules.snapshot(conn)?;
        let payload = TapPayload {
            student_id: student.id.clone(),
            student_name: student.full_name.clone(),
            at: now,
        };

        let (classification, event, status) = match direction {
            Direction::In => {
                let arrival = rules.classify_arrival(&student.grade_level, now.time());
                attendance::upsert_tap_in(conn, &student.id, today, now, arrival)?;
                (
                    Classification::Arrival(arrival),
                    NotificationEvent::for_arrival(ArrivalPayload {
                        tap: payload,
                        status: arrival,
                    }),
                    StudentStatus::In,
                )
            }
            Direction::Out => {
                let departure = rules.classify_departure(now.time());
                attendance::upsert_tap_out(conn, &student.id, today, now, departure)?;
                (
                    Classification::Departure(departure),
                    NotificationEvent::for_departure(DeparturePayload {
                        tap: payload,
                        status: departure,
                    }),
                    StudentStatus::Out,
                )
            }
        };

        students::set_status(conn, &student.id, status)?;
        let log_id = log(TapOutcome::Ok, classification.as_str().to_string())?;

        info!(
            student = %student.id,
            direction = direction.to_db_str(),
            classification = classification.as_str(),
            "tap accepted"
        );

        Ok(Stage::Accepted(Accepted {
            log_id,
            classification,
            event,
        }))
    }

    fn notify(
        &self,
        actor_id: &str,
        student: &Student,
        accepted: Accepted,
        now: NaiveDateTime,
    ) -> AppResult<TapResult> {
        let mut notify_errors = Vec::new();

        // A failed teacher lookup must not stop the parent notification.
        let teacher = match teacher_for(self.directory.as_ref(), student.class_id.as_deref()) {
            Ok(t) => t,
            Err(e) => {
                notify_errors.push(format!("teacher lookup: {e}"));
                None
            }
        };

        let report = self.dispatcher.send_staff_then_parent(
            teacher.as_deref(),
            student.parent_id.as_deref(),
            actor_id,
            &accepted.event,
            now,
        );
        notify_errors.extend(report.errors.iter().cloned());

        Ok(TapResult {
            outcome: TapOutcome::Ok,
            classification: Some(accepted.classification),
            reason: None,
            log_id: accepted.log_id,
            notify_errors,
            notified: report.sent(),
        })
    }
}
