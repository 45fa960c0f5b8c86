//! Command line and database configuration.

use std::path::PathBuf;

use clap::Parser;
use rusqlite::{Connection, OpenFlags};

use crate::error::PeekError;

/// Database file used when none is configured, resolved next to the executable.
pub const DEFAULT_DATABASE_FILE: &str = "database.db";

#[derive(Debug, Parser)]
#[command(name = "sqlite-peek", version, about)]
pub struct Cli {
    /// Path to the SQLite database file (defaults to database.db next to the binary)
    #[arg(short, long, value_name = "PATH", env = "SQLITE_PEEK_DATABASE")]
    pub database: Option<String>,

    /// Open the database with SQLite's read-only flag
    #[arg(long, env = "SQLITE_PEEK_READ_ONLY")]
    pub read_only: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<DatabaseConfig, PeekError> {
        let path = match self.database {
            Some(raw) => expand_home(&raw)?,
            None => default_database_path()?,
        };

        Ok(DatabaseConfig {
            path,
            read_only: self.read_only,
        })
    }
}

/// Opens a fresh connection for every call. Nothing is pooled or cached.
pub trait ConnectionProvider: Send + Sync {
    fn open(&self) -> Result<Connection, PeekError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub read_only: bool,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    fn open_flags(&self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            base | OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    }
}

impl ConnectionProvider for DatabaseConfig {
    fn open(&self) -> Result<Connection, PeekError> {
        Connection::open_with_flags(&self.path, self.open_flags()).map_err(|e| {
            tracing::error!("Failed to open database at {}: {}", self.path.display(), e);
            PeekError::Database(e)
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(raw: &str) -> Result<PathBuf, PeekError> {
    match raw.strip_prefix("~/") {
        Some(rest) => Ok(home::home_dir()
            .ok_or_else(|| PeekError::InvalidPath("Cannot determine home directory".into()))?
            .join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

fn default_database_path() -> Result<PathBuf, PeekError> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| PeekError::InvalidPath("Executable has no parent directory".into()))?;
    Ok(dir.join(DEFAULT_DATABASE_FILE))
}
