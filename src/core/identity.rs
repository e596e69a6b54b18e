//! Strict decoding of printed badge / QR codes.
//!
//! Layout: `<PREFIX>-<YYYY>-<SSSSSS>-<NNNN>`
//! - PREFIX: constant school prefix (config `id_prefix`)
//! - YYYY:   issue year, within one year of the current year
//! - SSSSSS: six-digit suffix of the student number
//! - NNNN:   four-digit print sequence
//!
//! Anything else is refused before storage is consulted.

use crate::db::students::find_by_active_code;
use crate::errors::{AppError, AppResult};
use crate::models::student::Student;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rusqlite::Connection;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCode {
    pub year: i32,
    pub suffix: String,
    pub sequence: String,
}

#[derive(Debug)]
pub enum Decoded {
    Student(Box<Student>),
    Invalid(String),
}

pub struct IdentityDecoder {
    prefix: String,
    pattern: Regex,
}

impl IdentityDecoder {
    pub fn new(prefix: &str) -> AppResult<Self> {
        let prefix = prefix.trim().to_uppercase();
        if prefix.is_empty() {
            return Err(AppError::Config("id_prefix must not be empty".into()));
        }
        let pattern = Regex::new(&format!(
            r"^{}-([0-9]{{4}})-([0-9]{{6}})-([0-9]{{4}})$",
            regex::escape(&prefix)
        ))
        .map_err(|e| AppError::Config(format!("invalid id_prefix: {e}")))?;

        Ok(Self { prefix, pattern })
    }

    /// Structural check only; `today` anchors the accepted year window.
    pub fn parse(&self, raw: &str, today: NaiveDate) -> Result<IdentityCode, String> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Err("empty code".to_string());
        }

        let caps = self
            .pattern
            .captures(&code)
            .ok_or_else(|| format!("code does not match {}-YYYY-NNNNNN-NNNN", self.prefix))?;

        let year: i32 = caps[1]
            .parse()
            .map_err(|_| "year is not numeric".to_string())?;
        if (year - today.year()).abs() > 1 {
            return Err(format!("year {year} is outside the accepted range"));
        }

        Ok(IdentityCode {
            year,
            suffix: caps[2].to_string(),
            sequence: caps[3].to_string(),
        })
    }

    pub fn canonical(&self, code: &IdentityCode) -> String {
        format!(
            "{}-{:04}-{}-{}",
            self.prefix, code.year, code.suffix, code.sequence
        )
    }

    /// Decode `raw` and resolve it against active issued identifiers.
    pub fn decode_and_resolve(
        &self,
        conn: &Connection,
        raw: &str,
        today: NaiveDate,
    ) -> AppResult<Decoded> {
        let code = match self.parse(raw, today) {
            Ok(c) => c,
            Err(reason) => {
                debug!(%reason, "rejected scanned code");
                return Ok(Decoded::Invalid(reason));
            }
        };

        let canonical = self.canonical(&code);
        match find_by_active_code(conn, &canonical)? {
            Some(student) => Ok(Decoded::Student(Box::new(student))),
            None => Ok(Decoded::Invalid(format!(
                "unknown or inactive identifier {canonical}"
            ))),
        }
    }
}
