use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    Pending,
    Approved,
    Done,
    Rejected,
}

impl PassStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PassStatus::Pending => "pending",
            PassStatus::Approved => "approved",
            PassStatus::Done => "done",
            PassStatus::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PassStatus::Pending),
            "approved" => Some(PassStatus::Approved),
            "done" => Some(PassStatus::Done),
            "rejected" => Some(PassStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicPass {
    pub id: i64,
    pub student_id: String,
    pub issued_by: String,
    pub reason: String,
    pub status: PassStatus,
    pub visit_id: Option<i64>,
    pub rejection_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Visit lifecycle. Ordering of the variants is the allowed direction of travel.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    InClinic,
    Treated,
    TeacherApproval,
    ParentNotified,
    Completed,
    SentHome,
}

impl VisitStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            VisitStatus::InClinic => "in_clinic",
            VisitStatus::Treated => "treated",
            VisitStatus::TeacherApproval => "teacher_approval",
            VisitStatus::ParentNotified => "parent_notified",
            VisitStatus::Completed => "completed",
            VisitStatus::SentHome => "sent_home",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "in_clinic" => Some(VisitStatus::InClinic),
            "treated" => Some(VisitStatus::Treated),
            "teacher_approval" => Some(VisitStatus::TeacherApproval),
            "parent_notified" => Some(VisitStatus::ParentNotified),
            "completed" => Some(VisitStatus::Completed),
            "sent_home" => Some(VisitStatus::SentHome),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            VisitStatus::InClinic => 0,
            VisitStatus::Treated => 1,
            VisitStatus::TeacherApproval => 2,
            VisitStatus::ParentNotified => 3,
            VisitStatus::Completed | VisitStatus::SentHome => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }

    /// Forward-only: a visit never returns to an earlier stage and
    /// terminal visits never move again.
    pub fn can_advance_to(&self, next: VisitStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// How a visit ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
    Completed,
    SentHome,
}

impl VisitOutcome {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Some(VisitOutcome::Completed),
            "sent_home" | "sent-home" => Some(VisitOutcome::SentHome),
            _ => None,
        }
    }

    pub fn status(&self) -> VisitStatus {
        match self {
            VisitOutcome::Completed => VisitStatus::Completed,
            VisitOutcome::SentHome => VisitStatus::SentHome,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub diagnosis: String,
    pub treatment: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicVisit {
    pub id: i64,
    pub student_id: String,
    pub staff_id: String,
    pub pass_id: Option<i64>,
    pub status: VisitStatus,
    pub notes: String,
    pub findings: Findings,
    pub entered_at: NaiveDateTime,
    pub exited_at: Option<NaiveDateTime>,
    pub teacher_approved_by: Option<String>,
    pub teacher_approved_at: Option<NaiveDateTime>,
}
