//! # invoicer-db
//!
//! Maintenance tool for the invoicer database schema:
//! - **version** prints the stored and compiled-in schema versions
//! - **plan** shows the migration chain without touching the database
//! - **upgrade** / **downgrade** run the chain and print a JSON report

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use invoicer_store::migrations::standard_registry;
use invoicer_store::{Database, Direction, Version, APP_VERSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "invoicer-db", version, about = "Inspect and migrate the invoicer database schema")]
struct Cli {
    /// Database file (overrides INVOICER_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the stored and the compiled-in schema version.
    Version,
    /// Show the steps a migration would run.
    Plan {
        #[arg(value_enum)]
        direction: PlanDirection,
        /// Target version (default: this build's version, or the downgrade floor).
        #[arg(long, value_parser = parse_version)]
        to: Option<Version>,
    },
    /// Upgrade the schema.
    Upgrade {
        /// Target version (default: this build's version).
        #[arg(long, value_parser = parse_version)]
        to: Option<Version>,
    },
    /// Downgrade the schema.
    Downgrade {
        /// Target version (default: the downgrade floor).
        #[arg(long, value_parser = parse_version)]
        to: Option<Version>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlanDirection {
    Upgrade,
    Downgrade,
}

fn parse_version(text: &str) -> Result<Version, String> {
    Version::parse(text).map_err(|e| e.to_string())
}

fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,invoicer_store=debug,invoicer_cli=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let cli = Cli::parse();
    let mut config = CliConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    info!(?config, "Loaded configuration");

    if let Some(dir) = config.db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display()))?;
    }

    // -----------------------------------------------------------------------
    // 3. Dispatch
    // -----------------------------------------------------------------------
    let mut db = Database::open_unmigrated(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    match cli.command {
        Command::Version => {
            let stored = db.stored_version()?;
            println!(
                "stored:   {}",
                stored.map_or_else(|| "uninitialized".to_string(), |v| v.to_string())
            );
            println!("compiled: {APP_VERSION}");
            if let Some(stored) = stored {
                println!("delta:    {}", APP_VERSION - stored);
            }
        }
        Command::Plan { direction, to } => {
            let from = db.stored_version()?.unwrap_or(invoicer_store::migrations::v2_0_initial::VERSION);
            let (direction, target) = match direction {
                PlanDirection::Upgrade => (Direction::Upgrade, to.unwrap_or(APP_VERSION)),
                PlanDirection::Downgrade => (Direction::Downgrade, to.unwrap_or(config.downgrade_floor)),
            };
            let plan = standard_registry().plan(direction, from, target);
            println!("{direction} {from} -> {target}");
            for step in &plan.steps {
                println!("  {:<20} {} -> {}", step.step.name(), step.from, step.to);
            }
            if !plan.reached {
                println!("  (no step leads past {})", plan.end());
            }
        }
        Command::Upgrade { to } => {
            if db.initialize()? {
                info!("Initialized new database");
            }
            let report = db.upgrade(to)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Downgrade { to } => {
            let report = db.downgrade(Some(to.unwrap_or(config.downgrade_floor)))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
