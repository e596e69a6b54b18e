use crate::cli::commands::{clock, open_db, resolve_student};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::core::clock::Clock;
use crate::core::locks::StudentLocks;
use crate::core::rules::RuleCache;
use crate::core::tap::TapProcessor;
use crate::db::log::ttlog;
use crate::errors::AppResult;
use crate::models::tap::TapOutcome;
use crate::ui::messages::{error, success, warning};

/// Process one gate scan and print its outcome.
pub fn handle(cli: &Cli, cfg: &Config) -> AppResult<()> {
    if let Commands::Scan {
        direction,
        who,
        actor,
    } = &cli.command
    {
        let pool = open_db(cfg)?;
        let clock = clock(cli)?;
        let student = resolve_student(&pool, cfg, who, clock.now())?;

        let rules = RuleCache::from_config(cfg)?;
        let locks = StudentLocks::new();
        let processor = TapProcessor::new(&pool.conn, cfg, &rules, &locks).with_clock(&clock);

        let result = processor.process_tap(actor, &student, direction)?;

        let detail = result
            .classification
            .map(|c| c.as_str().to_string())
            .or_else(|| result.reason.clone())
            .unwrap_or_default();
        let line = format!(
            "{} {} {}: {} ({})",
            student.id,
            student.full_name,
            direction.trim().to_lowercase(),
            result.outcome.to_db_str(),
            detail
        );

        match result.outcome {
            TapOutcome::Ok => success(line),
            TapOutcome::Duplicate | TapOutcome::Blocked => warning(line),
            TapOutcome::Rejected => error(line),
        }
        for e in &result.notify_errors {
            warning(format!("notification not delivered: {e}"));
        }

        if let Err(e) = ttlog(
            &pool.conn,
            "scan",
            &student.id,
            &format!("{} by {} → {}", direction.trim(), actor, result.outcome.to_db_str()),
        ) {
            warning(format!("Failed to write internal log: {}", e));
        }
    }
    Ok(())
}
