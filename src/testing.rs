//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.

#![allow(dead_code)]
#![allow(clippy::needless_pass_by_ref_mut)] // &mut self for ergonomics with RefCell

use crate::error::Result;
use crate::things::dates::encode_packed;
use crate::things::rows::{Status, TaskRow};
use crate::traits::{CommandOutput, CommandRunner, Row, RowSource};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A mock command runner for testing.
///
/// Records expected commands and their outputs, then verifies they were called.
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    expectations: RefCell<Vec<(String, Vec<String>, CommandOutput)>>,
    available_programs: RefCell<Vec<String>>,
    call_index: RefCell<usize>,
}

impl MockCommandRunner {
    /// Create a new mock command runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expected command and its output.
    pub fn expect(&mut self, program: &str, args: &[&str], output: CommandOutput) {
        self.expectations.borrow_mut().push((
            program.to_string(),
            args.iter().map(|s| (*s).to_string()).collect(),
            output,
        ));
    }

    /// Add a program as available.
    pub fn set_available(&mut self, program: &str) {
        self.available_programs.borrow_mut().push(program.to_string());
    }

    /// Verify all expected commands were called.
    ///
    /// # Panics
    ///
    /// Panics if not all expected commands were called.
    pub fn verify(&self) {
        let index = *self.call_index.borrow();
        let expected = self.expectations.borrow().len();
        assert_eq!(
            index, expected,
            "Expected {expected} command calls, but only {index} were made"
        );
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let mut index = self.call_index.borrow_mut();
        let expectations = self.expectations.borrow();

        assert!(
            *index < expectations.len(),
            "Unexpected command call: {program} {args:?} (no more expectations)"
        );

        let (exp_program, exp_args, output) = &expectations[*index];
        let args_vec: Vec<String> = args.iter().map(|s| (*s).to_string()).collect();

        assert!(
            program == exp_program && &args_vec == exp_args,
            "Command mismatch at index {}:\n  Expected: {} {:?}\n  Got: {} {:?}",
            *index,
            exp_program,
            exp_args,
            program,
            args
        );

        *index += 1;
        Ok(output.clone())
    }

    fn is_available(&self, program: &str) -> bool {
        self.available_programs.borrow().iter().any(|p| p == program)
    }
}

/// A command runner that succeeds at everything and remembers each call.
///
/// Useful where the exact arguments are built elsewhere and the test only
/// cares about which programs ran, and in what order.
#[derive(Debug, Default)]
pub struct RecordingCommandRunner {
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl RecordingCommandRunner {
    /// Create a new recording runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(program, args)` pair run so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.iter().map(|s| (*s).to_string()).collect()));
        Ok(CommandOutput::default())
    }

    fn is_available(&self, _program: &str) -> bool {
        true
    }
}

/// A command runner that always fails, for testing error paths.
#[derive(Debug, Default)]
pub struct FailingCommandRunner {
    error_message: String,
}

impl FailingCommandRunner {
    /// Create a new failing command runner with the specified error message.
    #[must_use]
    pub fn new(error_message: impl Into<String>) -> Self {
        Self { error_message: error_message.into() }
    }
}

impl CommandRunner for FailingCommandRunner {
    fn run(
        &self,
        _program: &str,
        _args: &[&str],
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        Err(std::io::Error::other(self.error_message.clone()).into())
    }

    fn is_available(&self, _program: &str) -> bool {
        false
    }
}

/// A canned [`RowSource`].
///
/// Each registered SQL fragment maps to a fixed set of rows. A query gets
/// the rows of the longest fragment it contains, or nothing.
#[derive(Debug, Default)]
pub struct StaticRows {
    tables: Vec<(String, Vec<Row>)>,
    queries: RefCell<Vec<String>>,
}

impl StaticRows {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `fragment` with `rows`.
    #[must_use]
    pub fn with(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.tables.push((fragment.to_string(), rows));
        self
    }

    /// Every SQL string queried so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl RowSource for StaticRows {
    fn query(&self, sql: &str) -> Vec<Row> {
        self.queries.borrow_mut().push(sql.to_string());
        self.tables
            .iter()
            .filter(|(fragment, _)| sql.contains(fragment.as_str()))
            .max_by_key(|(fragment, _)| fragment.len())
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

/// Builder for positional `TMTask` rows.
#[derive(Debug, Clone)]
pub struct TaskFixture {
    fields: Row,
}

impl TaskFixture {
    fn new(id: &str, title: &str, kind: &str) -> Self {
        let mut fields = vec![String::new(); TaskRow::FIELD_COUNT];
        fields[0] = id.to_string();
        fields[1] = title.to_string();
        fields[3] = kind.to_string();
        fields[4] = "0".to_string();
        fields[5] = "0".to_string();
        fields[13] = "0".to_string();
        fields[14] = "0".to_string();
        Self { fields }
    }

    /// An open to-do.
    #[must_use]
    pub fn task(id: &str, title: &str) -> Self {
        Self::new(id, title, "0")
    }

    /// An open project.
    #[must_use]
    pub fn project(id: &str, title: &str) -> Self {
        Self::new(id, title, "1")
    }

    /// A heading.
    #[must_use]
    pub fn heading(id: &str, title: &str) -> Self {
        Self::new(id, title, "2")
    }

    /// Set the status.
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.fields[4] = status.code().to_string();
        self
    }

    /// Mark as trashed.
    #[must_use]
    pub fn trashed(mut self) -> Self {
        self.fields[5] = "1".to_string();
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: &str) -> Self {
        self.fields[2] = notes.to_string();
        self
    }

    /// Set the creation time (epoch seconds).
    #[must_use]
    pub fn created(mut self, epoch: i64) -> Self {
        self.fields[6] = epoch.to_string();
        self
    }

    /// Set the start date.
    #[must_use]
    pub fn start(mut self, date: NaiveDate) -> Self {
        self.fields[8] = encode_packed(date).map(|v| v.to_string()).unwrap_or_default();
        self
    }

    /// Set the deadline.
    #[must_use]
    pub fn deadline(mut self, date: NaiveDate) -> Self {
        self.fields[9] = encode_packed(date).map(|v| v.to_string()).unwrap_or_default();
        self
    }

    /// Set the completion time (epoch seconds).
    #[must_use]
    pub fn completed_at(mut self, epoch: i64) -> Self {
        self.fields[10] = epoch.to_string();
        self
    }

    /// Place directly in an area.
    #[must_use]
    pub fn area(mut self, id: &str) -> Self {
        self.fields[11] = id.to_string();
        self
    }

    /// Place in a project.
    #[must_use]
    pub fn in_project(mut self, id: &str) -> Self {
        self.fields[12] = id.to_string();
        self
    }

    /// Set the checklist counters.
    #[must_use]
    pub fn checklist(mut self, total: u32, open: u32) -> Self {
        self.fields[13] = total.to_string();
        self.fields[14] = open.to_string();
        self
    }

    /// The positional row.
    #[must_use]
    pub fn row(self) -> Row {
        self.fields
    }
}

/// A positional `TMArea` row.
#[must_use]
pub fn area_row(id: &str, title: &str) -> Row {
    vec![id.to_string(), title.to_string(), "1".to_string()]
}

/// A positional `TMTag` row.
#[must_use]
pub fn tag_row(id: &str, title: &str) -> Row {
    vec![id.to_string(), title.to_string(), String::new()]
}

/// A positional `TMTaskTag` row.
#[must_use]
pub fn task_tag_row(task: &str, tag: &str) -> Row {
    vec![task.to_string(), tag.to_string()]
}

/// Schema of the tables the bridge reads, as Things lays them out.
const FIXTURE_SCHEMA: &str = "
    CREATE TABLE TMTask (
        uuid TEXT PRIMARY KEY, title TEXT, notes TEXT, type INTEGER, status INTEGER,
        trashed INTEGER, creationDate REAL, userModificationDate REAL, startDate INTEGER,
        deadline INTEGER, completionDate REAL, area TEXT, project TEXT,
        checklistItemsCount INTEGER, openChecklistItemsCount INTEGER
    );
    CREATE TABLE TMArea (uuid TEXT PRIMARY KEY, title TEXT, visible INTEGER);
    CREATE TABLE TMTag (uuid TEXT PRIMARY KEY, title TEXT, shortcut TEXT);
    CREATE TABLE TMTaskTag (tasks TEXT, tags TEXT);
";

/// A throwaway database with the Things schema.
pub struct FixtureDb {
    conn: Connection,
    path: PathBuf,
}

impl FixtureDb {
    /// Create the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(FIXTURE_SCHEMA)?;
        Ok(Self { conn, path: path.to_path_buf() })
    }

    /// Where the database lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a task row; empty fields become NULL.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn task(&self, fixture: TaskFixture) -> Result<&Self> {
        let values = fixture.fields.iter().map(|f| (!f.is_empty()).then_some(f.as_str()));
        self.conn.execute(
            "INSERT INTO TMTask VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params_from_iter(values),
        )?;
        Ok(self)
    }

    /// Insert an area.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn area(&self, id: &str, title: &str) -> Result<&Self> {
        self.conn.execute("INSERT INTO TMArea VALUES (?1, ?2, 1)", [id, title])?;
        Ok(self)
    }

    /// Insert a tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn tag(&self, id: &str, title: &str) -> Result<&Self> {
        self.conn.execute("INSERT INTO TMTag VALUES (?1, ?2, NULL)", [id, title])?;
        Ok(self)
    }

    /// Tag a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn link(&self, task: &str, tag: &str) -> Result<&Self> {
        self.conn.execute("INSERT INTO TMTaskTag VALUES (?1, ?2)", [task, tag])?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_command_runner() {
        let mut runner = MockCommandRunner::new();
        runner.expect("echo", &["hello"], CommandOutput::ok("hello\n"));

        let output = runner.run("echo", &["hello"], None).unwrap();
        assert_eq!(output.stdout, "hello\n");
        runner.verify();
    }

    #[test]
    #[should_panic(expected = "Command mismatch")]
    fn test_mock_command_runner_wrong_command() {
        let mut runner = MockCommandRunner::new();
        runner.expect("echo", &["hello"], CommandOutput::default());
        let _ = runner.run("echo", &["world"], None);
    }

    #[test]
    #[should_panic(expected = "no more expectations")]
    fn test_mock_command_runner_too_many_calls() {
        let runner = MockCommandRunner::new();
        let _ = runner.run("echo", &["hello"], None);
    }

    #[test]
    fn test_mock_command_runner_availability() {
        let mut runner = MockCommandRunner::new();
        runner.set_available("sqlite3");
        assert!(runner.is_available("sqlite3"));
        assert!(!runner.is_available("sqlite"));
    }

    #[test]
    fn test_recording_runner_keeps_order() {
        let runner = RecordingCommandRunner::new();
        runner.run("open", &["-g", "a"], None).unwrap();
        runner.run("osascript", &["-e", "b"], None).unwrap();
        let programs: Vec<String> = runner.calls().into_iter().map(|(p, _)| p).collect();
        assert_eq!(programs, vec!["open", "osascript"]);
    }

    #[test]
    fn test_failing_command_runner() {
        let runner = FailingCommandRunner::new("test error");
        assert!(runner.run("any", &["args"], None).is_err());
        assert!(!runner.is_available("any"));
    }

    #[test]
    fn test_static_rows_prefers_longest_fragment() {
        let rows = StaticRows::new()
            .with("FROM TMTask", vec![vec!["task".to_string()]])
            .with("FROM TMTaskTag", vec![vec!["link".to_string()]]);

        assert_eq!(rows.query("SELECT tasks, tags FROM TMTaskTag")[0][0], "link");
        assert_eq!(rows.query("SELECT uuid FROM TMTask WHERE x")[0][0], "task");
        assert!(rows.query("SELECT 1 FROM TMArea").is_empty());
        assert_eq!(rows.queries().len(), 3);
    }

    #[test]
    fn test_fixture_db_round_trips_through_embedded_reader() {
        use crate::things::query::EmbeddedReader;
        use crate::things::rows::task_select;

        let dir = tempfile::TempDir::new().unwrap();
        let db = FixtureDb::create(&dir.path().join("main.sqlite")).unwrap();
        db.task(TaskFixture::task("T1", "Line one\nline | two").created(1_710_504_000)).unwrap();

        let reader = EmbeddedReader::open(db.path()).unwrap();
        let rows = reader.query(&task_select());
        let row = TaskRow::from_fields(&rows[0]).unwrap();
        assert_eq!(row.title, "Line one\nline | two");
        assert_eq!(row.notes, None);
        assert_eq!(row.created.map(|c| c.timestamp()), Some(1_710_504_000));
    }

    #[test]
    fn test_task_fixture_parses() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let row = TaskFixture::project("P1", "Launch")
            .status(Status::Completed)
            .start(date)
            .checklist(2, 1)
            .row();
        let parsed = TaskRow::from_fields(&row).unwrap();
        assert_eq!(parsed.status, Status::Completed);
        assert_eq!(parsed.start_date, Some(date));
        assert_eq!(parsed.checklist_open, 1);
    }
}
