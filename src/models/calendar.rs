use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    Holiday,
    Break,
    Emergency,
}

impl CalendarKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CalendarKind::Holiday => "holiday",
            CalendarKind::Break => "break",
            CalendarKind::Emergency => "emergency",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "holiday" => Some(CalendarKind::Holiday),
            "break" => Some(CalendarKind::Break),
            "emergency" => Some(CalendarKind::Emergency),
            _ => None,
        }
    }
}

/// Scope value that applies an event to every grade.
pub const SCOPE_ALL: &str = "all";

#[derive(Debug, Clone, Serialize)]
pub struct SchoolCalendarEvent {
    pub id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `"all"` or a grade level.
    pub scope: String,
    pub kind: CalendarKind,
    pub title: String,
}

impl SchoolCalendarEvent {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn applies_to_grade(&self, grade: &str) -> bool {
        self.scope.eq_ignore_ascii_case(SCOPE_ALL) || self.scope.eq_ignore_ascii_case(grade.trim())
    }
}
