pub mod attendance;
pub mod clinic;
pub mod config;
pub mod decode;
pub mod init;
pub mod log;
pub mod notify;
pub mod scan;

use crate::cli::parser::{Cli, StudentRef};
use crate::config::Config;
use crate::core::clock::FixedClock;
use crate::core::identity::{Decoded, IdentityDecoder};
use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::db::students::load_student;
use crate::errors::{AppError, AppResult};
use crate::models::student::Student;
use crate::utils::date;
use crate::utils::time::parse_timestamp;
use chrono::NaiveDateTime;

/// Open the configured database, applying pending migrations.
pub(crate) fn open_db(cfg: &Config) -> AppResult<DbPool> {
    let pool = DbPool::new(&cfg.database)?;
    init_db(&pool.conn)?;
    Ok(pool)
}

/// Local time the command runs at: `--at` when given, else the system clock.
pub(crate) fn effective_now(cli: &Cli) -> AppResult<NaiveDateTime> {
    match &cli.at {
        Some(raw) => parse_timestamp(raw),
        None => Ok(date::now()),
    }
}

pub(crate) fn clock(cli: &Cli) -> AppResult<FixedClock> {
    effective_now(cli).map(FixedClock::new)
}

/// Resolve `--code` strictly through the decoder, or `--student` by id.
pub(crate) fn resolve_student(
    pool: &DbPool,
    cfg: &Config,
    who: &StudentRef,
    now: NaiveDateTime,
) -> AppResult<Student> {
    if let Some(code) = &who.code {
        let decoder = IdentityDecoder::new(&cfg.id_prefix)?;
        return match decoder.decode_and_resolve(&pool.conn, code, now.date())? {
            Decoded::Student(s) => Ok(*s),
            Decoded::Invalid(reason) => Err(AppError::Validation(format!(
                "invalid code '{code}': {reason}"
            ))),
        };
    }
    match &who.student {
        Some(id) => load_student(&pool.conn, id),
        None => Err(AppError::Validation(
            "either --code or --student is required".into(),
        )),
    }
}
