#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use treadlog_core::config::resolve_config;
use treadlog_core::error::ErrorCode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tread: gear mileage and weekly run history",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides TREADLOG_DB and the config file).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Gear",
        about = "Manage gear",
        after_help = "EXAMPLES:\n    # Track a new pair with 40 km already on it\n    tread gear add --name \"Daily trainer\" --start-distance 40\n\n    # List active gear\n    tread gear list\n\n    # Retire gear\n    tread gear retire 3"
    )]
    Gear {
        #[command(subcommand)]
        command: cmd::gear::GearCommand,
    },

    #[command(
        next_help_heading = "Runs",
        about = "Log and edit runs",
        after_help = "EXAMPLES:\n    # Log a run\n    tread run add --gear 1 --distance 8.5 --date 2024-01-03\n\n    # Fix a typo\n    tread run edit 12 --distance 5.8\n\n    # Emit machine-readable output\n    tread run list --gear 1 --json"
    )]
    Run {
        #[command(subcommand)]
        command: cmd::run::RunCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Show weekly distance history",
        long_about = "Show one distance total per calendar week, including zero weeks between runs.",
        after_help = "EXAMPLES:\n    # All gear, oldest week first\n    tread history\n\n    # One gear item, newest first, weeks starting on Sunday\n    tread history --gear 1 --descending --first-day sunday"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Recompute gear totals from runs",
        after_help = "EXAMPLES:\n    # Check every gear total\n    tread recompute\n\n    # Repair one total\n    tread recompute 3"
    )]
    Recompute(cmd::recompute::RecomputeArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TREADLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tread=debug,info"
        } else {
            "tread=info,warn"
        })
    });

    let format = env::var("TREADLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let effective = match resolve_config(cli.db.as_deref(), cli.json) {
        Ok(effective) => effective,
        Err(err) => {
            let mode = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            };
            render_error(
                mode,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    debug!(db = %effective.db_path.display(), output = %effective.resolved_output, "resolved config");

    let ctx = cmd::Context {
        output: OutputMode::from_resolved(&effective.resolved_output),
        db_path: effective.db_path,
        config: effective.config,
    };

    match &cli.command {
        Commands::Gear { command } => cmd::gear::run_gear(command, &ctx),
        Commands::Run { command } => cmd::run::run_run(command, &ctx),
        Commands::History(args) => cmd::history::run_history(args, &ctx),
        Commands::Recompute(args) => cmd::recompute::run_recompute(args, &ctx),
    }
}
