//! Core traits for testability and abstraction.

use crate::error::Result;
use std::time::Duration;

/// Output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// The exit code of the command.
    pub exit_code: i32,
    /// The stdout output.
    pub stdout: String,
    /// The stderr output.
    pub stderr: String,
}

impl CommandOutput {
    /// Check if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Build a successful output with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { exit_code: 0, stdout: stdout.into(), stderr: String::new() }
    }

    /// Get combined stdout and stderr.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Trait for running external programs.
///
/// Both channels to Things go through this: `sqlite3` on the read side and
/// `open`/`osascript` on the write side.
pub trait CommandRunner {
    /// Run a command with the given arguments and timeout.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to run.
    /// * `args` - The arguments to pass.
    /// * `timeout` - Optional timeout duration.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned, or if it outlives
    /// `timeout`.
    fn run(&self, program: &str, args: &[&str], timeout: Option<Duration>)
        -> Result<CommandOutput>;

    /// Check if a program is available in PATH.
    fn is_available(&self, program: &str) -> bool;
}

/// One row of query output, fields in `SELECT` order.
pub type Row = Vec<String>;

/// A read-only source of rows from the Things database.
///
/// Implementations never fail: a query that cannot be executed yields no
/// rows and is logged, so one broken sub-query cannot abort a whole summary.
pub trait RowSource {
    /// Execute `sql` and return its rows.
    fn query(&self, sql: &str) -> Vec<Row>;
}
