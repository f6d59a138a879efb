//! CLI configuration loaded from environment variables.
//!
//! Every setting has a default; command-line flags override what is read
//! here.

use std::path::PathBuf;

use invoicer_store::{Database, Version, DOWNGRADE_FLOOR};

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Database file.
    /// Env: `INVOICER_DB_PATH`
    /// Default: `invoicer.db` in the platform data directory.
    pub db_path: PathBuf,

    /// Version `downgrade` targets when `--to` is not given.
    /// Env: `INVOICER_DOWNGRADE_FLOOR`
    /// Default: `2.0.0`
    pub downgrade_floor: Version,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: Database::default_path().unwrap_or_else(|_| PathBuf::from("invoicer.db")),
            downgrade_floor: DOWNGRADE_FLOOR,
        }
    }
}

impl CliConfig {
    /// Load configuration from the process environment, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = var("INVOICER_DB_PATH") {
            if !path.is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }

        if let Some(floor) = var("INVOICER_DOWNGRADE_FLOOR") {
            match Version::parse(floor.trim()) {
                Ok(version) => config.downgrade_floor = version,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid INVOICER_DOWNGRADE_FLOOR, using default"
                    );
                }
            }
        }

        config
    }
}
