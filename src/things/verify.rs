//! Read-after-write checks.
//!
//! Things applies commands asynchronously and writes its database whenever it
//! gets round to it. Each check here waits once, reads once, and reports what
//! it saw; a negative answer means "not yet", and it is up to the caller to
//! ask again with a longer wait.

use super::query::sql_quote;
use super::rows::{task_select, Kind, Status, TaskRow};
use crate::traits::RowSource;
use chrono::{DateTime, Utc};
use std::thread;
use std::time::Duration;

/// Wait used for plain edits.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(100);

/// Wait used for state transitions, which Things persists more slowly.
pub const COMPLETION_WAIT: Duration = Duration::from_millis(1000);

/// Single-shot checks against the database.
pub struct Verifier<'a> {
    source: &'a dyn RowSource,
}

impl<'a> Verifier<'a> {
    /// Check through `source`.
    #[must_use]
    pub fn new(source: &'a dyn RowSource) -> Self {
        Self { source }
    }

    fn first(&self, sql: &str) -> Option<TaskRow> {
        self.source.query(sql).iter().find_map(|fields| TaskRow::from_fields(fields))
    }

    fn fetch(&self, id: &str) -> Option<TaskRow> {
        self.first(&format!("{} WHERE uuid = {} LIMIT 1", task_select(), sql_quote(id)))
    }

    /// The item's current row, after waiting `wait`.
    #[must_use]
    pub fn verify_exists(&self, id: &str, wait: Duration) -> Option<TaskRow> {
        thread::sleep(wait);
        self.fetch(id)
    }

    /// Whether the item is in `status` after waiting `wait`.
    #[must_use]
    pub fn verify_status(&self, id: &str, status: Status, wait: Duration) -> bool {
        self.verify_exists(id, wait).is_some_and(|row| row.status == status)
    }

    /// Whether the item is completed after waiting `wait`.
    #[must_use]
    pub fn verify_completed(&self, id: &str, wait: Duration) -> bool {
        self.verify_status(id, Status::Completed, wait)
    }

    /// Whether the item exists (with `expected_title`, if given) after
    /// waiting `wait`.
    #[must_use]
    pub fn verify_updated(&self, id: &str, expected_title: Option<&str>, wait: Duration) -> bool {
        self.verify_exists(id, wait)
            .is_some_and(|row| expected_title.map_or(true, |title| row.title == title.trim()))
    }

    /// Whether the item is in the trash after waiting `wait`.
    #[must_use]
    pub fn verify_trashed(&self, id: &str, wait: Duration) -> bool {
        self.verify_exists(id, wait).is_some_and(|row| row.trashed)
    }

    /// The newest `kind` item titled `title` created at or after `since`.
    #[must_use]
    pub fn find_created(
        &self,
        title: &str,
        kind: Kind,
        since: DateTime<Utc>,
        wait: Duration,
    ) -> Option<TaskRow> {
        thread::sleep(wait);
        self.first(&format!(
            "{} WHERE title = {} AND type = {} AND creationDate >= {} \
             ORDER BY creationDate DESC LIMIT 1",
            task_select(),
            sql_quote(title.trim()),
            kind.code(),
            since.timestamp(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticRows, TaskFixture};
    use std::time::Instant;

    #[test]
    fn test_exists_queries_one_row_by_id() {
        let rows = StaticRows::new()
            .with("WHERE uuid = 'T1'", vec![TaskFixture::task("T1", "Write").row()]);
        let verifier = Verifier::new(&rows);

        let row = verifier.verify_exists("T1", Duration::ZERO).unwrap();
        assert_eq!(row.title, "Write");
        assert!(verifier.verify_exists("T2", Duration::ZERO).is_none());
        assert_eq!(rows.queries().len(), 2);
    }

    #[test]
    fn test_completed_on_untouched_item_is_false() {
        let rows = StaticRows::new()
            .with("WHERE uuid = 'T1'", vec![TaskFixture::task("T1", "Still open").row()]);
        let verifier = Verifier::new(&rows);

        let started = Instant::now();
        assert!(!verifier.verify_completed("T1", COMPLETION_WAIT));
        assert!(started.elapsed() >= COMPLETION_WAIT);
        assert_eq!(rows.queries().len(), 1, "exactly one read, no retries");
    }

    #[test]
    fn test_status_and_trash_checks() {
        let rows = StaticRows::new()
            .with(
                "WHERE uuid = 'T1'",
                vec![TaskFixture::task("T1", "Done").status(Status::Completed).row()],
            )
            .with("WHERE uuid = 'T2'", vec![TaskFixture::task("T2", "Gone").trashed().row()]);
        let verifier = Verifier::new(&rows);

        assert!(verifier.verify_completed("T1", Duration::ZERO));
        assert!(!verifier.verify_status("T1", Status::Canceled, Duration::ZERO));
        assert!(verifier.verify_trashed("T2", Duration::ZERO));
        assert!(!verifier.verify_trashed("T1", Duration::ZERO));
    }

    #[test]
    fn test_updated_compares_title() {
        let rows = StaticRows::new()
            .with("WHERE uuid = 'T1'", vec![TaskFixture::task("T1", "New title").row()]);
        let verifier = Verifier::new(&rows);

        assert!(verifier.verify_updated("T1", None, Duration::ZERO));
        assert!(verifier.verify_updated("T1", Some(" New title "), Duration::ZERO));
        assert!(!verifier.verify_updated("T1", Some("Old title"), Duration::ZERO));
        assert!(!verifier.verify_updated("T9", None, Duration::ZERO));
    }

    #[test]
    fn test_find_created_query() {
        let rows = StaticRows::new()
            .with("WHERE title = 'Buy milk'", vec![TaskFixture::task("T7", "Buy milk").row()]);
        let verifier = Verifier::new(&rows);
        let since = DateTime::from_timestamp(1_710_504_000, 0).unwrap();

        let found = verifier.find_created("Buy milk", Kind::Task, since, Duration::ZERO).unwrap();
        assert_eq!(found.id, "T7");
        let sql = &rows.queries()[0];
        assert!(sql.contains("type = 0 AND creationDate >= 1710504000"), "{sql}");

        assert!(verifier.find_created("it's", Kind::Project, since, Duration::ZERO).is_none());
        assert!(rows.queries()[1].contains("title = 'it''s' AND type = 1"));
    }
}
