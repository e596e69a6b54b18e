use crate::cli::commands::open_db;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::errors::AppResult;
use ansi_term::Colour;

/// Colour of an operation in the log listing
fn color_for_operation(op: &str) -> Colour {
    match op {
        "scan" => Colour::Green,
        "init" => Colour::RGB(255, 153, 51),
        "migration_applied" => Colour::Purple,
        other if other.starts_with("clinic_") => Colour::Cyan,
        _ => Colour::White,
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if matches!(cmd, Commands::Log { print: true }) {
        let pool = open_db(cfg)?;

        for (id, raw_date, operation, target, message) in load_log(&pool.conn)? {
            let date = chrono::DateTime::parse_from_rfc3339(&raw_date)
                .map(|dt| dt.format("%FT%T%:z").to_string())
                .unwrap_or(raw_date);

            let op_target = if target.is_empty() {
                operation.clone()
            } else {
                format!("{operation} ({target})")
            };

            println!(
                "{:>4}  {:<25}  {}  {}",
                id,
                date,
                color_for_operation(&operation).paint(format!("{op_target:<32}")),
                message
            );
        }
    }

    Ok(())
}
