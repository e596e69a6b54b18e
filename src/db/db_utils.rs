//! Row decoding helpers shared by the query modules.

use crate::errors::AppError;
use crate::utils::time::parse_timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Row;
use rusqlite::types::Type;

/// Wrap a decoding problem in the error type rusqlite expects from row mappers.
pub fn conversion_error(column: &str, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(AppError::Other(format!("column '{column}': {err}"))),
    )
}

pub fn get_timestamp(row: &Row, column: &str) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(column, e))
}

pub fn get_opt_timestamp(row: &Row, column: &str) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| parse_timestamp(&s).map_err(|e| conversion_error(column, e)))
        .transpose()
}

pub fn get_date(row: &Row, column: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(column)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| conversion_error(column, AppError::InvalidDate(raw.clone())))
}

/// Decode a closed-vocabulary TEXT column through the enum's `from_db_str`.
pub fn get_enum<T>(row: &Row, column: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    parse(&raw).ok_or_else(|| {
        conversion_error(column, AppError::Other(format!("unexpected value '{raw}'")))
    })
}

pub fn get_opt_enum<T>(
    row: &Row,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(None),
        Some(s) => parse(&s).map(Some).ok_or_else(|| {
            conversion_error(column, AppError::Other(format!("unexpected value '{s}'")))
        }),
    }
}
