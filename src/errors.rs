//! Unified application error type.
//! All modules (db, core, cli) return AppError so that callers see one
//! taxonomy: validation, not-found and state errors are typed, storage
//! failures are passed through untouched.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Input validation
    // ---------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    // ---------------------------
    // Lookup / workflow errors
    // ---------------------------
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ---------------------------
    // Serialization
    // ---------------------------
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
