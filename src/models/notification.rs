//! Notification rows and their closed event vocabulary.
//!
//! Every verb carries its own payload struct so readers of the
//! `notifications.payload` column never have to guess the shape.

use super::attendance::{ArrivalStatus, DepartureStatus};
use super::clinic::Findings;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapPayload {
    pub student_id: String,
    pub student_name: String,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalPayload {
    #[serde(flatten)]
    pub tap: TapPayload,
    pub status: ArrivalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeparturePayload {
    #[serde(flatten)]
    pub tap: TapPayload,
    pub status: DepartureStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicMovePayload {
    #[serde(flatten)]
    pub tap: TapPayload,
    pub visit_id: Option<i64>,
    pub pass_id: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassPayload {
    pub pass_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub visit_id: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitPayload {
    pub visit_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub findings: Findings,
    pub requires_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitClosedPayload {
    pub visit_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub exited_at: NaiveDateTime,
    pub notes: String,
}

/// Closed vocabulary of notification verbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verb", content = "payload", rename_all = "snake_case")]
pub enum NotificationEvent {
    Arrival(ArrivalPayload),
    LateArrival(ArrivalPayload),
    Departure(DeparturePayload),
    EarlyDeparture(DeparturePayload),
    ClinicEntry(ClinicMovePayload),
    ClinicExit(ClinicMovePayload),
    PassApproved(PassPayload),
    PassRejected(PassPayload),
    FindingsRecorded(VisitPayload),
    ClinicSummary(VisitPayload),
    ClinicConfirmed(VisitPayload),
    VisitCompleted(VisitClosedPayload),
    SentHome(VisitClosedPayload),
}

impl NotificationEvent {
    pub fn verb(&self) -> &'static str {
        match self {
            NotificationEvent::Arrival(_) => "arrival",
            NotificationEvent::LateArrival(_) => "late_arrival",
            NotificationEvent::Departure(_) => "departure",
            NotificationEvent::EarlyDeparture(_) => "early_departure",
            NotificationEvent::ClinicEntry(_) => "clinic_entry",
            NotificationEvent::ClinicExit(_) => "clinic_exit",
            NotificationEvent::PassApproved(_) => "pass_approved",
            NotificationEvent::PassRejected(_) => "pass_rejected",
            NotificationEvent::FindingsRecorded(_) => "findings_recorded",
            NotificationEvent::ClinicSummary(_) => "clinic_summary",
            NotificationEvent::ClinicConfirmed(_) => "clinic_confirmed",
            NotificationEvent::VisitCompleted(_) => "visit_completed",
            NotificationEvent::SentHome(_) => "sent_home",
        }
    }

    /// Arrival verb for a classification: anything but `present` is reported as late.
    pub fn for_arrival(payload: ArrivalPayload) -> Self {
        match payload.status {
            ArrivalStatus::Present => NotificationEvent::Arrival(payload),
            ArrivalStatus::Late | ArrivalStatus::Absent => NotificationEvent::LateArrival(payload),
        }
    }

    pub fn for_departure(payload: DeparturePayload) -> Self {
        match payload.status {
            DepartureStatus::Early => NotificationEvent::EarlyDeparture(payload),
            DepartureStatus::Normal | DepartureStatus::LateExit => {
                NotificationEvent::Departure(payload)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    pub actor_id: String,
    pub event: NotificationEvent,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}
