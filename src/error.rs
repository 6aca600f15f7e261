//! Common error wrapper.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot resolve {target}: {reason}")]
    Resolve { target: String, reason: String },

    #[error("command `{0}` not found on this system")]
    MissingTool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("interval must be > 0")]
    ZeroInterval,

    #[error("interval must be <= {max_secs} seconds")]
    IntervalTooLong { max_secs: u64 },

    #[error("history length must be >= 1")]
    ZeroHistory,

    #[error("probe count must be >= 1")]
    ZeroCount,

    #[error("host must not be empty")]
    EmptyHost,

    #[error("port cannot be 0")]
    ZeroPort,
}

/// Handy alias.
pub type Result<T> = std::result::Result<T, MonitorError>;
