//! Error types for `things_bridge`.

use std::path::PathBuf;

/// Errors that can occur while talking to Things.
///
/// Only environment and authorization problems abort a request. Query
/// failures, undecodable rows and unverified mutations degrade in place and
/// never surface as an `Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The embedded read-only `SQLite` connection could not be opened.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A command execution failed.
    #[error("Command '{command}' failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        /// The command that was run.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// The stderr output.
        stderr: String,
    },

    /// A command timed out.
    #[error("Command '{command}' timed out after {timeout_secs} seconds")]
    CommandTimeout {
        /// The command that was run.
        command: String,
        /// The timeout in seconds.
        timeout_secs: u64,
    },

    /// The user's home directory could not be determined.
    #[error("Could not determine the home directory")]
    HomeDirNotFound,

    /// The shared container root does not exist.
    #[error("Group Containers directory not found at {0}: is Things 3 installed?")]
    ContainerRootNotFound(PathBuf),

    /// No Things container exists under the shared container root.
    #[error("Things container not found in {0}: launch Things 3 at least once")]
    ContainerNotFound(PathBuf),

    /// The Things container has no data directory.
    #[error("Things data directory (ThingsData-*) not found in {0}: open Things 3 and let it finish starting up")]
    DataDirNotFound(PathBuf),

    /// The database file is missing from the data directory.
    #[error("Things database not found at {0}")]
    DatabaseNotFound(PathBuf),

    /// Things only runs on macOS.
    #[error("Things 3 is only available on macOS (running on {0})")]
    UnsupportedPlatform(String),

    /// A mutation of an existing item was attempted without a token.
    #[error(
        "Things authorization token missing: set THINGS_AUTH_TOKEN (Things > Settings > General > Enable Things URLs > Manage)"
    )]
    AuthTokenMissing,

    /// A caller-supplied parameter was rejected before anything was sent.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
