//! Read-only query execution against the Things database.
//!
//! Two [`RowSource`] backends share one contract: pipe-separated fields,
//! newline-separated rows, and an empty result (plus a log line) whenever a
//! query cannot run. [`SqliteCli`] is the default and drives the `sqlite3`
//! shell in `-readonly` mode; [`EmbeddedReader`] opens the file through a
//! read-only `rusqlite` connection for machines without the shell.
//!
//! Neither backend parameterizes SQL. Values embedded in queries must go
//! through [`sql_quote`] (and identifiers through
//! [`validate_id`](super::ids::validate_id)).

use super::locator;
use crate::config::{BridgeConfig, ReaderKind};
use crate::error::Result;
use crate::logging;
use crate::traits::{CommandRunner, Row, RowSource};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Field separator used by the `sqlite3` shell.
pub const FIELD_SEPARATOR: char = '|';

/// Quote `value` as an SQL string literal.
#[must_use]
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Split shell output into rows of fields.
#[must_use]
pub fn parse_rows(stdout: &str) -> Vec<Row> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split(FIELD_SEPARATOR).map(str::to_string).collect())
        .collect()
}

/// Queries through the `sqlite3` command-line shell.
pub struct SqliteCli<'a> {
    runner: &'a dyn CommandRunner,
    database: PathBuf,
    binary: String,
    timeout: Duration,
}

impl<'a> SqliteCli<'a> {
    /// Query `database` with the default `sqlite3` binary and a 10s timeout.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, database: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            database: database.into(),
            binary: "sqlite3".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Use a different shell binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Bound each query by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to the shell for `sql`.
    #[must_use]
    pub fn args<'s>(&'s self, sql: &'s str) -> Vec<&'s str> {
        let database = self.database.to_str().unwrap_or_default();
        vec!["-readonly", "-separator", "|", database, sql]
    }
}

impl RowSource for SqliteCli<'_> {
    fn query(&self, sql: &str) -> Vec<Row> {
        match self.runner.run(&self.binary, &self.args(sql), Some(self.timeout)) {
            Ok(output) if output.success() => parse_rows(&output.stdout),
            Ok(output) => {
                logging::log_warning(&format!(
                    "query failed (exit {}): {}: {}",
                    output.exit_code,
                    output.stderr.trim(),
                    sql
                ));
                Vec::new()
            }
            Err(e) => {
                logging::log_warning(&format!("query could not run: {e}: {sql}"));
                Vec::new()
            }
        }
    }
}

/// Queries through an in-process read-only connection.
pub struct EmbeddedReader {
    conn: Connection,
}

impl EmbeddedReader {
    /// Open `database` read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened as a database.
    pub fn open(database: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(database, flags)?;
        Ok(Self { conn })
    }

    fn try_query(&self, sql: &str) -> rusqlite::Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let rows: rusqlite::Result<Vec<Row>> = stmt
            .query_map([], |row| {
                (0..columns).map(|i| row.get_ref(i).map(render_value)).collect::<rusqlite::Result<Row>>()
            })?
            .collect();
        rows
    }
}

/// Render a value the way the `sqlite3` shell prints it in list mode.
fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

impl RowSource for EmbeddedReader {
    fn query(&self, sql: &str) -> Vec<Row> {
        self.try_query(sql).unwrap_or_else(|e| {
            logging::log_warning(&format!("embedded query failed: {e}: {sql}"));
            Vec::new()
        })
    }
}

/// Resolve the database configured (or discovered) for this machine.
///
/// # Errors
///
/// Returns the locator's error when the database cannot be found.
pub fn resolve_database(config: &BridgeConfig) -> Result<PathBuf> {
    match &config.database_path {
        Some(path) => locator::check_explicit(path),
        None => locator::locate(),
    }
}

/// Open the configured reader for `database`.
///
/// A CLI reader whose binary is missing falls back to the embedded reader.
///
/// # Errors
///
/// Returns an error if the embedded reader cannot open the file.
pub fn open_reader<'a>(
    config: &BridgeConfig,
    runner: &'a dyn CommandRunner,
    database: PathBuf,
) -> Result<Box<dyn RowSource + 'a>> {
    match config.reader {
        ReaderKind::Cli if runner.is_available(&config.sqlite_binary) => Ok(Box::new(
            SqliteCli::new(runner, database)
                .with_binary(config.sqlite_binary.clone())
                .with_timeout(config.process_timeout()),
        )),
        ReaderKind::Cli => {
            logging::log_warning(&format!(
                "{} not found on PATH, reading the database in-process",
                config.sqlite_binary
            ));
            Ok(Box::new(EmbeddedReader::open(&database)?))
        }
        ReaderKind::Embedded => Ok(Box::new(EmbeddedReader::open(&database)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCommandRunner, MockCommandRunner};
    use crate::traits::CommandOutput;
    use tempfile::TempDir;

    #[test]
    fn test_sql_quote_escapes_single_quotes() {
        assert_eq!(sql_quote("it's"), "'it''s'");
        assert_eq!(sql_quote(""), "''");
    }

    #[test]
    fn test_parse_rows() {
        let rows = parse_rows("a|b|c\n\nd||f\r\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["d", "", "f"]]);
    }

    #[test]
    fn test_cli_passes_readonly_flags() {
        let mut runner = MockCommandRunner::new();
        runner.expect(
            "sqlite3",
            &["-readonly", "-separator", "|", "/db/main.sqlite", "SELECT 1, 2"],
            CommandOutput::ok("1|2\n"),
        );
        let cli = SqliteCli::new(&runner, "/db/main.sqlite");

        assert_eq!(cli.query("SELECT 1, 2"), vec![vec!["1", "2"]]);
        runner.verify();
    }

    #[test]
    fn test_cli_failure_yields_no_rows() {
        let mut runner = MockCommandRunner::new();
        runner.expect(
            "sqlite3",
            &["-readonly", "-separator", "|", "/db", "SELECT nope"],
            CommandOutput { exit_code: 1, stdout: String::new(), stderr: "no such column".into() },
        );
        assert!(SqliteCli::new(&runner, "/db").query("SELECT nope").is_empty());

        let failing = FailingCommandRunner::new("spawn failed");
        assert!(SqliteCli::new(&failing, "/db").query("SELECT 1").is_empty());
    }

    #[test]
    fn test_embedded_reader_renders_like_the_shell() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a TEXT, b INTEGER, c REAL, d TEXT);
             INSERT INTO t VALUES ('x', 7, 1.5, NULL);",
        )
        .unwrap();
        drop(conn);

        let reader = EmbeddedReader::open(&path).unwrap();
        assert_eq!(reader.query("SELECT a, b, c, d FROM t"), vec![vec!["x", "7", "1.5", ""]]);
        assert!(reader.query("SELECT * FROM missing").is_empty());
    }

    #[test]
    fn test_embedded_reader_is_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE t (a TEXT);").unwrap();

        let reader = EmbeddedReader::open(&path).unwrap();
        assert!(reader.conn.execute("INSERT INTO t VALUES ('no')", []).is_err());
    }

    #[test]
    fn test_embedded_reader_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        assert!(EmbeddedReader::open(&dir.path().join("absent.sqlite")).is_err());
    }

    #[test]
    fn test_open_reader_falls_back_without_sqlite3() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.sqlite");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE t (a TEXT);").unwrap();

        // No programs are available on the mock, so the CLI reader is skipped.
        let runner = MockCommandRunner::new();
        let reader = open_reader(&BridgeConfig::default(), &runner, path).unwrap();
        assert!(reader.query("SELECT a, a FROM t").is_empty());
        runner.verify();
    }

    #[test]
    fn test_resolve_explicit_database() {
        let dir = TempDir::new().unwrap();
        let config =
            BridgeConfig { database_path: Some(dir.path().join("x.sqlite")), ..Default::default() };
        assert!(resolve_database(&config).is_err());
    }
}
