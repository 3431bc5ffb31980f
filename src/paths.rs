//! Path utilities for the bridge's own files.
//!
//! The bridge keeps its configuration and log under `~/.things-bridge/`.
//! Paths inside the Things container are resolved by
//! [`crate::things::locator`] instead.

use std::path::PathBuf;

/// The base directory name for bridge data.
const DATA_DIR_NAME: &str = ".things-bridge";

/// The configuration filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// The log filename.
pub const LOG_FILENAME: &str = "things-mcp.log";

/// Directory of user template overrides.
pub const TEMPLATES_DIRNAME: &str = "templates";

/// Get the base data directory, `~/.things-bridge/`.
///
/// Returns `None` if the home directory cannot be determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Get the configuration file path.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Get the log file path.
#[must_use]
pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(LOG_FILENAME))
}

/// Get the template override directory.
#[must_use]
pub fn templates_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(TEMPLATES_DIRNAME))
}
