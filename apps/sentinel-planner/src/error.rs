//! Error types for the planner CLI.

use std::path::PathBuf;

/// All errors that can occur while running the CLI.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("failed to read fixture file {path}: {source}")]
    FixtureRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse fixture JSON: {0}")]
    FixtureParse(#[from] serde_json::Error),

    #[error("planner core rejected the context: {0}")]
    Core(#[from] sentinel_core::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
