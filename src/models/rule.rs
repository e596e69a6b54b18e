use serde::Serialize;

/// Per-grade arrival window, all values in minutes since midnight.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AttendanceRule {
    pub grade_level: String,
    /// Gate opening time as authored by the admin. Stored and reported only;
    /// classification reads `grace_until` and `late_until`.
    pub entry_time: i64,
    pub grace_until: i64,
    pub late_until: i64,
}

/// School-wide fallback rule plus the dismissal window used for departures.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GlobalRule {
    pub school_start: i64,
    pub late_threshold_minutes: i64,
    pub absent_threshold_minutes: i64,
    pub dismissal_time: i64,
    pub early_exit_minutes: i64,
    pub late_exit_minutes: i64,
}

impl GlobalRule {
    pub fn grace_until(&self) -> i64 {
        self.school_start + self.late_threshold_minutes
    }

    pub fn late_until(&self) -> i64 {
        self.school_start + self.absent_threshold_minutes
    }
}
