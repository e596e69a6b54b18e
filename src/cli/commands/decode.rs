use crate::cli::commands::{effective_now, open_db};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::identity::{Decoded, IdentityDecoder};
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{error, success};

pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Decode { code } = &cli.command {
        let pool = open_db(cfg)?;
        let now = effective_now(cli)?;
        let decoder = IdentityDecoder::new(&cfg.id_prefix)?;

        match decoder.decode_and_resolve(&pool.conn, code, now.date())? {
            Decoded::Student(s) => {
                success(format!(
                    "{} → {} ({}, grade {}, status {})",
                    code.trim(),
                    s.id,
                    s.full_name,
                    s.grade_level,
                    s.status.to_db_str()
                ));
            }
            Decoded::Invalid(reason) => {
                error(format!("invalid: {reason}"));
                return Err(AppError::Validation(reason));
            }
        }
    }
    Ok(())
}
