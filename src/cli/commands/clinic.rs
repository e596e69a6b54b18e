use crate::cli::commands::{clock, open_db, resolve_student};
use crate::cli::parser::{ClinicCommand, Cli, Commands};
use crate::config::Config;
use crate::core::clinic::{ClinicCoordinator, ClinicOutcome};
use crate::core::clock::Clock;
use crate::db::log::ttlog;
use crate::errors::{AppError, AppResult};
use crate::models::clinic::{Findings, VisitOutcome};
use crate::ui::messages::{success, warning};

fn report(action: &str, outcome: &ClinicOutcome) {
    let mut parts = Vec::new();
    if let Some(p) = outcome.pass_id {
        parts.push(format!("pass #{p}"));
    }
    if let Some(v) = outcome.visit_id {
        parts.push(format!("visit #{v}"));
    }
    if let Some(s) = outcome.visit_status {
        parts.push(format!("status {}", s.to_db_str()));
    }
    parts.push(format!("{} notification(s)", outcome.notified));

    success(format!("{action}: {}", parts.join(", ")));
    for e in &outcome.notify_errors {
        warning(format!("notification not delivered: {e}"));
    }
}

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    let Commands::Clinic { action } = &cli.command else {
        return Ok(());
    };

    let pool = open_db(cfg)?;
    let clock = clock(cli)?;
    let coordinator = ClinicCoordinator::new(&pool.conn).with_clock(&clock);

    let (operation, target) = match action {
        ClinicCommand::Issue {
            teacher,
            student,
            reason,
        } => {
            let id = coordinator.issue_pass(teacher, student, reason)?;
            success(format!("Clinic pass #{id} issued for {student}"));
            ("clinic_issue", format!("pass {id}"))
        }
        ClinicCommand::Arrive { staff, who, notes } => {
            let student = resolve_student(&pool, cfg, who, clock.now())?;
            let outcome = coordinator.record_arrival(staff, &student, notes)?;
            report("Clinic arrival", &outcome);
            ("clinic_arrive", student.id)
        }
        ClinicCommand::Depart { staff, who, notes } => {
            let student = resolve_student(&pool, cfg, who, clock.now())?;
            let outcome = coordinator.record_departure(staff, &student, notes)?;
            if outcome.visit_id.is_none() {
                warning(format!("{} had no open clinic visit", student.id));
            } else {
                report("Clinic departure", &outcome);
            }
            ("clinic_depart", student.id)
        }
        ClinicCommand::Approve { staff, pass, notes } => {
            let outcome = coordinator.approve_pass(staff, *pass, notes)?;
            report("Pass approved", &outcome);
            ("clinic_approve", format!("pass {pass}"))
        }
        ClinicCommand::Reject {
            staff,
            pass,
            reason,
        } => {
            let outcome = coordinator.reject_pass(staff, *pass, reason)?;
            report("Pass rejected", &outcome);
            ("clinic_reject", format!("pass {pass}"))
        }
        ClinicCommand::Findings {
            staff,
            visit,
            diagnosis,
            treatment,
            action,
        } => {
            let findings = Findings {
                diagnosis: diagnosis.clone(),
                treatment: treatment.clone(),
                action: action.clone(),
            };
            let outcome = coordinator.record_findings(staff, *visit, &findings)?;
            report("Findings recorded", &outcome);
            ("clinic_findings", format!("visit {visit}"))
        }
        ClinicCommand::TeacherApprove { teacher, visit } => {
            let outcome = coordinator.teacher_approve(teacher, *visit)?;
            report("Teacher approval", &outcome);
            ("clinic_teacher_approve", format!("visit {visit}"))
        }
        ClinicCommand::Complete {
            staff,
            visit,
            outcome,
            notes,
        } => {
            let how = VisitOutcome::parse(outcome).ok_or_else(|| {
                AppError::Validation(format!(
                    "outcome must be 'completed' or 'sent_home', got '{outcome}'"
                ))
            })?;
            let result = coordinator.complete_visit(staff, *visit, how, notes)?;
            report("Visit closed", &result);
            ("clinic_complete", format!("visit {visit}"))
        }
    };

    if let Err(e) = ttlog(&pool.conn, operation, &target, "clinic workflow step") {
        warning(format!("Failed to write internal log: {}", e));
    }

    Ok(())
}
