//! CLI argument definitions for the enrollsync binary.
//!
//! Everything except the mode is normally supplied through environment
//! variables; the flags exist for one-off overrides.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use enrollsync::{Config, IdPattern, model::EnrollmentType};

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SQLite database (default)
    Sqlite,
    /// PostgreSQL database
    Postgres,
    /// In-memory with JSON persistence
    Inmemory,
}

/// What the run does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Create and complete pseudonyms, then link enrollments
    #[default]
    Update,
    /// Report what an update would do, without changing anything
    Analyze,
    /// Report the state after an update, without changing anything
    Verify,
    /// Clear SIS user ids carrying the pattern's prefix
    Rollback,
}

/// Backfill login credentials and SIS user ids for active course enrollments
#[derive(Parser, Debug)]
#[command(name = "enrollsync")]
#[command(version)]
pub struct Cli {
    /// Mode to run
    #[arg(value_enum, default_value_t = Mode::Update)]
    pub mode: Mode,

    /// SIS user id pattern with one integer placeholder, e.g. Canvas-%05d
    #[arg(long, env = "ENROLLSYNC_ID_PATTERN", default_value = enrollsync::pattern::DEFAULT_PATTERN)]
    pub id_pattern: IdPattern,

    /// Records per batch
    #[arg(long, env = "ENROLLSYNC_BATCH_SIZE", default_value_t = enrollsync::config::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Comma separated enrollment types in scope
    #[arg(long, env = "ENROLLSYNC_ENROLLMENT_TYPES", default_value = "StudentEnrollment")]
    pub enrollment_types: String,

    /// Seconds rollback waits before clearing anything
    #[arg(
        long,
        env = "ENROLLSYNC_ROLLBACK_DELAY_SECS",
        default_value_t = enrollsync::config::DEFAULT_ROLLBACK_DELAY_SECS
    )]
    pub rollback_delay_secs: u64,

    #[command(flatten)]
    pub backend_config: BackendArgs,
}

impl Cli {
    /// Build and check the run configuration.
    pub fn config(&self) -> enrollsync::Result<Config> {
        let config = Config::default()
            .with_pattern(self.id_pattern.clone())
            .with_batch_size(self.batch_size)
            .with_enrollment_types(EnrollmentType::parse_list(&self.enrollment_types)?)
            .with_rollback_delay(Duration::from_secs(self.rollback_delay_secs));
        config.validate()?;
        Ok(config)
    }
}

/// Arguments selecting and locating the store
#[derive(clap::Args, Debug, Clone)]
pub struct BackendArgs {
    /// Storage backend to use
    #[arg(short, long, default_value = "sqlite", env = "ENROLLSYNC_BACKEND")]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores enrollsync.db
    /// For InMemory: stores enrollsync.json
    #[arg(short = 'D', long, env = "ENROLLSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// PostgreSQL connection URL (required when backend=postgres)
    #[arg(long, env = "ENROLLSYNC_POSTGRES_URL")]
    pub postgres_url: Option<String>,
}

impl BackendArgs {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
