use super::direction::Direction;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Where a tap was recorded. Gate taps drive the in/out state machine,
/// clinic taps are audit-only.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TapSource {
    Gate,
    Clinic,
}

impl TapSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TapSource::Gate => "gate",
            TapSource::Clinic => "clinic",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "gate" => Some(TapSource::Gate),
            "clinic" => Some(TapSource::Clinic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TapOutcome {
    Ok,
    Duplicate,
    Rejected,
    Blocked,
}

impl TapOutcome {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TapOutcome::Ok => "ok",
            TapOutcome::Duplicate => "duplicate",
            TapOutcome::Rejected => "rejected",
            TapOutcome::Blocked => "blocked",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(TapOutcome::Ok),
            "duplicate" => Some(TapOutcome::Duplicate),
            "rejected" => Some(TapOutcome::Rejected),
            "blocked" => Some(TapOutcome::Blocked),
            _ => None,
        }
    }
}

/// Immutable audit row, one per processed scan attempt.
#[derive(Debug, Clone, Serialize)]
pub struct TapLogEntry {
    pub id: i64,
    pub student_id: String,
    pub actor_id: String,
    pub direction: Direction,
    pub source: TapSource,
    pub outcome: TapOutcome,
    pub remark: String,
    pub tapped_at: NaiveDateTime,
}

impl TapLogEntry {
    /// Build a not-yet-persisted entry (`id = 0`).
    pub fn new(
        student_id: &str,
        actor_id: &str,
        direction: Direction,
        source: TapSource,
        outcome: TapOutcome,
        remark: impl Into<String>,
        tapped_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: 0,
            student_id: student_id.to_string(),
            actor_id: actor_id.to_string(),
            direction,
            source,
            outcome,
            remark: remark.into(),
            tapped_at,
        }
    }
}
