//! Time utilities: HH:MM parsing, minutes since midnight and stored timestamps.

use crate::errors::{AppError, AppResult};
use chrono::{NaiveDateTime, NaiveTime, Timelike};

pub fn parse_time(t: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(t.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(t.trim(), "%H:%M:%S"))
        .ok()
}

pub fn parse_time_strict(t: &str) -> AppResult<NaiveTime> {
    parse_time(t).ok_or_else(|| AppError::InvalidTime(t.to_string()))
}

/// Minutes elapsed since local midnight (seconds are truncated).
pub fn minutes_of_day(t: NaiveTime) -> i64 {
    (t.hour() * 60 + t.minute()) as i64
}

pub fn hhmm_to_minutes(s: &str) -> AppResult<i64> {
    parse_time_strict(s).map(minutes_of_day)
}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| AppError::InvalidTime(s.to_string()))
}
