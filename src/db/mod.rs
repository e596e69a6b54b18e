pub mod attendance;
pub mod calendar;
pub mod clinic;
pub mod db_utils;
pub mod initialize;
pub mod log;
pub mod migrate;
pub mod notifications;
pub mod pool;
pub mod rules;
pub mod students;
pub mod taps;
