//! Configuration for the bridge.
//!
//! Settings live in `~/.things-bridge/config.yaml`. Every field is optional;
//! a missing file means all defaults. The authorization token may also come
//! from the `THINGS_AUTH_TOKEN` environment variable, which wins over the
//! file.

use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Things authorization token.
pub const AUTH_TOKEN_ENV: &str = "THINGS_AUTH_TOKEN";

/// Which backend executes read queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    /// Spawn the `sqlite3` command-line shell in read-only mode.
    #[default]
    Cli,
    /// Open the database in-process through a read-only connection.
    Embedded,
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Token required by Things for changes to existing items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Explicit database path, bypassing container discovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Read backend.
    pub reader: ReaderKind,

    /// Program used for CLI reads.
    pub sqlite_binary: String,

    /// Program used to hand URLs to the OS.
    pub opener_binary: String,

    /// Upper bound on any single external process.
    pub query_timeout_secs: u64,

    /// Delay before checking a field edit, creation or deletion.
    pub verify_wait_ms: u64,

    /// Delay before checking a completion or cancellation.
    pub completion_wait_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            database_path: None,
            reader: ReaderKind::Cli,
            sqlite_binary: "sqlite3".to_string(),
            opener_binary: "open".to_string(),
            query_timeout_secs: 10,
            verify_wait_ms: 100,
            completion_wait_ms: 1000,
        }
    }
}

impl BridgeConfig {
    /// Load config from `~/.things-bridge/config.yaml` and apply the
    /// environment override.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config = match paths::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_token(std::env::var(AUTH_TOKEN_ENV).ok()))
    }

    /// Load config from a specific file, falling back to defaults if it does
    /// not exist. The environment is not consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Replace the token with `env_token` when it is set and non-blank.
    #[must_use]
    pub fn with_env_token(mut self, env_token: Option<String>) -> Self {
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            self.auth_token = Some(token);
        }
        self
    }

    /// The effective token, treating a blank value as absent.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Timeout for external processes.
    #[must_use]
    pub const fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Wait applied before verifying edits, creations and deletions.
    #[must_use]
    pub const fn verify_wait(&self) -> Duration {
        Duration::from_millis(self.verify_wait_ms)
    }

    /// Wait applied before verifying terminal-state transitions.
    #[must_use]
    pub const fn completion_wait(&self) -> Duration {
        Duration::from_millis(self.completion_wait_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BridgeConfig::load_from(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.verify_wait(), Duration::from_millis(100));
        assert!(config.completion_wait() > config.verify_wait());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "reader: embedded\ncompletion_wait_ms: 2500\n").unwrap();

        let config = BridgeConfig::load_from(&path).unwrap();
        assert_eq!(config.reader, ReaderKind::Embedded);
        assert_eq!(config.completion_wait_ms, 2500);
        assert_eq!(config.sqlite_binary, "sqlite3");
        assert_eq!(config.opener_binary, "open");
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(BridgeConfig::load_from(&path).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "reader: [not, a, reader").unwrap();
        assert!(BridgeConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_env_token_overrides_file() {
        let config = BridgeConfig { auth_token: Some("file".into()), ..Default::default() }
            .with_env_token(Some("env".into()));
        assert_eq!(config.token(), Some("env"));
    }

    #[test]
    fn test_blank_tokens_count_as_absent() {
        let config = BridgeConfig { auth_token: Some("file".into()), ..Default::default() }
            .with_env_token(Some("   ".into()));
        assert_eq!(config.token(), Some("file"));

        let blank = BridgeConfig { auth_token: Some(" ".into()), ..Default::default() };
        assert_eq!(blank.token(), None);
    }

    #[test]
    #[serial_test::serial]
    fn test_load_reads_environment() {
        std::env::set_var(AUTH_TOKEN_ENV, "from-env");
        let config = BridgeConfig::load();
        std::env::remove_var(AUTH_TOKEN_ENV);

        // A malformed user config file would make this an error; only check
        // the token when loading succeeded.
        if let Ok(config) = config {
            assert_eq!(config.token(), Some("from-env"));
        }
    }
}
