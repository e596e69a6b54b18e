//! campustap library root.
//! Exposes the CLI parser, the high-level run() function and the engine
//! modules (identity decoding, rules, tap processing, clinic workflow).

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
        Commands::Decode { .. } => cli::commands::decode::handle(cli, cfg),
        Commands::Scan { .. } => cli::commands::scan::handle(cli, cfg),
        Commands::Clinic { .. } => cli::commands::clinic::handle(cli, cfg),
        Commands::Notify { .. } => cli::commands::notify::handle(&cli.command, cfg),
        Commands::Attendance { .. } => cli::commands::attendance::handle(&cli.command, cfg),
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the configured filter.
fn init_tracing(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_filter.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load()?;

    if let Some(custom_db) = &cli.db {
        cfg.database = custom_db.clone();
    }

    init_tracing(&cfg);

    dispatch(&cli, &cfg)
}
