//! Status-line sources.

pub mod net;

use thiserror::Error;

/// Errors reading a status source.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("cannot parse status output: {0}")]
    Parse(String),
}

/// Result type for status sources.
pub type StatusResult<T> = Result<T, StatusError>;
