use crate::cli::commands::open_db;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::attendance::load_records_by_date;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{header, info};
use crate::utils::date;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Attendance { date: day } = cmd {
        let d = match day {
            Some(s) => date::parse_date(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))?,
            None => date::today(),
        };

        let pool = open_db(cfg)?;
        let rows = load_records_by_date(&pool.conn, d)?;

        header(format!("Homeroom attendance {}", date::date_str(d)));
        if rows.is_empty() {
            info("No attendance recorded.");
            return Ok(());
        }

        println!(
            "{:<12} {:<9} {:<9} {:<8} {:<9}",
            "STUDENT", "IN", "OUT", "STATUS", "DEPARTURE"
        );
        for r in rows {
            println!(
                "{:<12} {:<9} {:<9} {:<8} {:<9}",
                r.student_id,
                r.time_in
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "--".into()),
                r.time_out
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "--".into()),
                r.status.to_db_str(),
                r.departure.map(|d| d.to_db_str()).unwrap_or("--"),
            );
        }
    }
    Ok(())
}
