//! Arrival / departure classification and the read-through rule cache.

use crate::config::Config;
use crate::db::rules::{load_global_rule, load_grade_rules};
use crate::errors::AppResult;
use crate::models::attendance::{ArrivalStatus, DepartureStatus};
use crate::models::rule::{AttendanceRule, GlobalRule};
use crate::utils::time::{hhmm_to_minutes, minutes_of_day};
use chrono::NaiveTime;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Boundaries actually used for one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrivalWindow {
    pub grace_until: i64,
    pub late_until: i64,
}

pub fn classify_arrival(window: ArrivalWindow, minute: i64) -> ArrivalStatus {
    if minute <= window.grace_until {
        ArrivalStatus::Present
    } else if minute <= window.late_until {
        ArrivalStatus::Late
    } else {
        ArrivalStatus::Absent
    }
}

pub fn classify_departure(global: &GlobalRule, minute: i64) -> DepartureStatus {
    if minute < global.dismissal_time - global.early_exit_minutes {
        DepartureStatus::Early
    } else if minute > global.dismissal_time + global.late_exit_minutes {
        DepartureStatus::LateExit
    } else {
        DepartureStatus::Normal
    }
}

fn grade_key(grade: &str) -> String {
    grade.trim().to_lowercase()
}

/// Immutable view of all rules at one point in time.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    grade_rules: HashMap<String, AttendanceRule>,
    global: GlobalRule,
}

impl RuleSnapshot {
    pub fn new(grade_rules: Vec<AttendanceRule>, global: GlobalRule) -> Self {
        let grade_rules = grade_rules
            .into_iter()
            .map(|r| (grade_key(&r.grade_level), r))
            .collect();
        Self {
            grade_rules,
            global,
        }
    }

    pub fn global(&self) -> &GlobalRule {
        &self.global
    }

    /// The grade rule wins whenever one exists; the global rule is only a fallback.
    pub fn arrival_window(&self, grade: &str) -> ArrivalWindow {
        match self.grade_rules.get(&grade_key(grade)) {
            Some(rule) => ArrivalWindow {
                grace_until: rule.grace_until,
                late_until: rule.late_until,
            },
            None => ArrivalWindow {
                grace_until: self.global.grace_until(),
                late_until: self.global.late_until(),
            },
        }
    }

    pub fn classify_arrival(&self, grade: &str, at: NaiveTime) -> ArrivalStatus {
        classify_arrival(self.arrival_window(grade), minutes_of_day(at))
    }

    pub fn classify_departure(&self, at: NaiveTime) -> DepartureStatus {
        classify_departure(&self.global, minutes_of_day(at))
    }
}

struct Cached {
    loaded_at: Instant,
    snapshot: Arc<RuleSnapshot>,
}

/// Read-through cache over `attendance_rules` + `global_rule`.
///
/// Entries expire after `ttl`; `refresh()` drops the current snapshot so the
/// next read goes back to storage.
pub struct RuleCache {
    ttl: Duration,
    fallback: GlobalRule,
    slot: Mutex<Option<Cached>>,
}

impl RuleCache {
    pub fn new(ttl: Duration, fallback: GlobalRule) -> Self {
        Self {
            ttl,
            fallback,
            slot: Mutex::new(None),
        }
    }

    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let fallback = GlobalRule {
            school_start: hhmm_to_minutes(&cfg.school_start)?,
            late_threshold_minutes: cfg.late_threshold_minutes,
            absent_threshold_minutes: cfg.absent_threshold_minutes,
            dismissal_time: hhmm_to_minutes(&cfg.dismissal_time)?,
            early_exit_minutes: cfg.early_exit_minutes,
            late_exit_minutes: cfg.late_exit_minutes,
        };
        Ok(Self::new(
            Duration::from_secs(cfg.rule_cache_ttl_secs),
            fallback,
        ))
    }

    pub fn snapshot(&self, conn: &Connection) -> AppResult<Arc<RuleSnapshot>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = slot.as_ref()
            && cached.loaded_at.elapsed() < self.ttl
        {
            return Ok(Arc::clone(&cached.snapshot));
        }

        let grade_rules = load_grade_rules(conn)?;
        let global = load_global_rule(conn)?.unwrap_or_else(|| self.fallback.clone());
        debug!(grades = grade_rules.len(), "attendance rules loaded");

        let snapshot = Arc::new(RuleSnapshot::new(grade_rules, global));
        *slot = Some(Cached {
            loaded_at: Instant::now(),
            snapshot: Arc::clone(&snapshot),
        });
        Ok(snapshot)
    }

    pub fn refresh(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}
