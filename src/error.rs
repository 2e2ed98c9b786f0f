//! Error types.
//!
//! The lenient setters on [`crate::SharedLogger`] never fail. These errors
//! only come out of strict parsing, config validation and bridge install.

use thiserror::Error;

/// Errors reported by the strict entry points.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),

    #[error("unknown log format: {0:?}")]
    UnknownFormat(String),

    #[error("failed to install log bridge: {0}")]
    BridgeInstall(String),

    #[error("invalid logger config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LoggerError>;
