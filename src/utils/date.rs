use chrono::{Local, NaiveDate, NaiveDateTime};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local wall-clock "now". No timezone conversion is ever applied downstream.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

pub fn date_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
