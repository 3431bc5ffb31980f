//! Typed records for the rows read from the Things database.
//!
//! Query output arrives as positional string fields. Each table's shape is
//! fixed here, next to the `SELECT` that produces it, and converted into a
//! named record straight away; nothing past this module sees raw fields.

use super::dates::{decode_epoch, decode_packed};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Stand-in for a newline inside a text column (ASCII unit separator).
const NEWLINE_STANDIN: char = '\u{1f}';
/// Stand-in for a pipe inside a text column (ASCII record separator).
const PIPE_STANDIN: char = '\u{1e}';

/// SQL expression selecting a text column so that it cannot break row or
/// field framing. [`restore_text`] undoes the mapping.
#[must_use]
pub fn text_column(column: &str) -> String {
    format!("replace(replace(COALESCE({column}, ''), char(10), char(31)), '|', char(30))")
}

/// Undo the stand-ins introduced by [`text_column`].
#[must_use]
pub fn restore_text(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            NEWLINE_STANDIN => '\n',
            PIPE_STANDIN => '|',
            other => other,
        })
        .collect()
}

fn optional_text(raw: &str) -> Option<String> {
    let text = restore_text(raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn optional_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(raw.to_string())
    }
}

fn flag(raw: &str) -> bool {
    raw.trim().parse::<i64>().is_ok_and(|v| v != 0)
}

fn count(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// What a `TMTask` row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// A to-do.
    Task,
    /// A project.
    Project,
    /// A heading inside a project.
    Heading,
}

impl Kind {
    /// Map the `type` column.
    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim() {
            "0" => Some(Self::Task),
            "1" => Some(Self::Project),
            "2" => Some(Self::Heading),
            _ => None,
        }
    }

    /// The `type` column value.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Task => 0,
            Self::Project => 1,
            Self::Heading => 2,
        }
    }
}

/// Lifecycle state of a task or project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not yet done.
    Open,
    /// Canceled.
    Canceled,
    /// Completed.
    Completed,
}

impl Status {
    /// Map the `status` column. There is no code 1.
    #[must_use]
    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim() {
            "0" => Some(Self::Open),
            "2" => Some(Self::Canceled),
            "3" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The `status` column value.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Canceled => 2,
            Self::Completed => 3,
        }
    }

    /// Parse a caller-supplied status name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "open" | "incomplete" => Some(Self::Open),
            "canceled" | "cancelled" => Some(Self::Canceled),
            "completed" | "complete" | "done" => Some(Self::Completed),
            _ => None,
        }
    }

    /// The lowercase name used in output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        }
    }
}

/// A row of `TMTask`: a to-do, project or heading.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    /// Stable identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Notes, if any.
    pub notes: Option<String>,
    /// To-do, project or heading.
    pub kind: Kind,
    /// Lifecycle state.
    pub status: Status,
    /// Whether the item is in the trash.
    pub trashed: bool,
    /// Creation time.
    pub created: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified: Option<DateTime<Utc>>,
    /// Scheduled start date.
    pub start_date: Option<NaiveDate>,
    /// Deadline.
    pub deadline: Option<NaiveDate>,
    /// Completion or cancellation time.
    pub completed_at: Option<DateTime<Utc>>,
    /// Directly containing area.
    pub area: Option<String>,
    /// Containing project.
    pub project: Option<String>,
    /// Number of checklist items.
    pub checklist_total: u32,
    /// Number of open checklist items.
    pub checklist_open: u32,
}

impl TaskRow {
    /// Number of fields selected by [`task_select`].
    pub const FIELD_COUNT: usize = 15;

    /// Build a record from positional fields, or `None` if the row is
    /// malformed.
    #[must_use]
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        if fields.len() != Self::FIELD_COUNT {
            return None;
        }
        Some(Self {
            id: optional_id(&fields[0])?,
            title: restore_text(&fields[1]),
            notes: optional_text(&fields[2]),
            kind: Kind::from_code(&fields[3])?,
            status: Status::from_code(&fields[4])?,
            trashed: flag(&fields[5]),
            created: decode_epoch(&fields[6]),
            modified: decode_epoch(&fields[7]),
            start_date: decode_packed(&fields[8]),
            deadline: decode_packed(&fields[9]),
            completed_at: decode_epoch(&fields[10]),
            area: optional_id(&fields[11]),
            project: optional_id(&fields[12]),
            checklist_total: count(&fields[13]),
            checklist_open: count(&fields[14]),
        })
    }

    /// Calendar dates considered by the date-range filter.
    pub fn filter_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.created
            .map(|ts| ts.with_timezone(&chrono::Local).date_naive())
            .into_iter()
            .chain(self.start_date)
            .chain(self.deadline)
    }
}

/// `SELECT ... FROM TMTask`, without a `WHERE` clause.
#[must_use]
pub fn task_select() -> String {
    format!(
        "SELECT uuid, {}, {}, type, status, trashed, creationDate, userModificationDate, \
         startDate, deadline, completionDate, area, project, checklistItemsCount, \
         openChecklistItemsCount FROM TMTask",
        text_column("title"),
        text_column("notes"),
    )
}

/// A row of `TMArea`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRow {
    /// Stable identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Whether the area is shown in the sidebar.
    pub visible: bool,
}

impl AreaRow {
    /// Build a record from positional fields.
    #[must_use]
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        match fields {
            [id, title, visible] => Some(Self {
                id: optional_id(id)?,
                title: restore_text(title),
                visible: visible.trim().is_empty() || flag(visible),
            }),
            _ => None,
        }
    }
}

/// `SELECT` for all areas.
#[must_use]
pub fn area_select() -> String {
    format!("SELECT uuid, {}, visible FROM TMArea", text_column("title"))
}

/// A row of `TMTag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    /// Stable identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Keyboard shortcut, if any.
    pub shortcut: Option<String>,
}

impl TagRow {
    /// Build a record from positional fields.
    #[must_use]
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        match fields {
            [id, title, shortcut] => Some(Self {
                id: optional_id(id)?,
                title: restore_text(title),
                shortcut: optional_text(shortcut),
            }),
            _ => None,
        }
    }
}

/// `SELECT` for all tags.
#[must_use]
pub fn tag_select() -> String {
    format!("SELECT uuid, {}, {} FROM TMTag", text_column("title"), text_column("shortcut"))
}

/// A row of `TMTaskTag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTagRow {
    /// Task or project identifier.
    pub task: String,
    /// Tag identifier.
    pub tag: String,
}

impl TaskTagRow {
    /// Build a record from positional fields.
    #[must_use]
    pub fn from_fields(fields: &[String]) -> Option<Self> {
        match fields {
            [task, tag] => Some(Self { task: optional_id(task)?, tag: optional_id(tag)? }),
            _ => None,
        }
    }
}

/// `SELECT` for all task/tag associations.
pub const TASK_TAG_SELECT: &str = "SELECT tasks, tags FROM TMTaskTag";

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Positional fields for a task row, as the query layer would produce.
    pub fn task_fields(id: &str, kind: &str, status: &str) -> Vec<String> {
        let mut fields = vec![String::new(); TaskRow::FIELD_COUNT];
        fields[0] = id.to_string();
        fields[1] = format!("Title {id}");
        fields[3] = kind.to_string();
        fields[4] = status.to_string();
        fields[5] = "0".to_string();
        fields
    }

    #[test]
    fn test_task_row_from_fields() {
        let mut fields = task_fields("T1", "0", "0");
        fields[2] = "line one\u{1f}line two \u{1e} piped".to_string();
        fields[6] = "1710504000".to_string();
        fields[8] = "132659072".to_string();
        fields[12] = "P1".to_string();
        fields[13] = "3".to_string();
        fields[14] = "1".to_string();

        let row = TaskRow::from_fields(&fields).unwrap();
        assert_eq!(row.id, "T1");
        assert_eq!(row.kind, Kind::Task);
        assert_eq!(row.status, Status::Open);
        assert_eq!(row.notes.as_deref(), Some("line one\nline two | piped"));
        assert_eq!(row.start_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert!(row.created.is_some());
        assert_eq!(row.deadline, None);
        assert_eq!(row.area, None);
        assert_eq!(row.project.as_deref(), Some("P1"));
        assert_eq!((row.checklist_total, row.checklist_open), (3, 1));
    }

    #[test]
    fn test_malformed_task_rows_are_rejected() {
        assert!(TaskRow::from_fields(&task_fields("T1", "0", "0")[..14]).is_none());
        assert!(TaskRow::from_fields(&task_fields("T1", "7", "0")).is_none());
        assert!(TaskRow::from_fields(&task_fields("T1", "0", "1")).is_none());
        assert!(TaskRow::from_fields(&task_fields("", "0", "0")).is_none());
    }

    #[test]
    fn test_bad_dates_do_not_reject_rows() {
        let mut fields = task_fields("T1", "1", "3");
        fields[6] = "garbage".to_string();
        fields[9] = "NULL".to_string();
        let row = TaskRow::from_fields(&fields).unwrap();
        assert_eq!(row.kind, Kind::Project);
        assert_eq!(row.status, Status::Completed);
        assert_eq!(row.created, None);
        assert_eq!(row.deadline, None);
    }

    #[test]
    fn test_status_codes_and_names() {
        for status in [Status::Open, Status::Canceled, Status::Completed] {
            assert_eq!(Status::from_code(&status.code().to_string()), Some(status));
            assert_eq!(Status::from_name(status.as_str()), Some(status));
        }
        assert_eq!(Status::from_name("Cancelled"), Some(Status::Canceled));
        assert_eq!(Status::from_name("later"), None);
    }

    #[test]
    fn test_area_tag_and_link_rows() {
        let area = AreaRow::from_fields(&["A1".into(), "Work".into(), "0".into()]).unwrap();
        assert!(!area.visible);
        let tag = TagRow::from_fields(&["G1".into(), "urgent".into(), String::new()]).unwrap();
        assert_eq!(tag.shortcut, None);
        let link = TaskTagRow::from_fields(&["T1".into(), "G1".into()]).unwrap();
        assert_eq!(link.tag, "G1");
        assert!(TaskTagRow::from_fields(&["T1".into()]).is_none());
    }

    #[test]
    fn test_text_column_round_trip() {
        assert!(text_column("title").contains("char(31)"));
        assert_eq!(restore_text("a\u{1e}b\u{1f}c"), "a|b\nc");
    }

    #[test]
    fn test_task_select_field_count() {
        let select = task_select();
        let columns = select.split(" FROM ").next().unwrap();
        // Each text_column expression contains five commas of its own.
        let extra_commas = 2 * 5;
        assert_eq!(columns.matches(',').count() - extra_commas + 1, TaskRow::FIELD_COUNT);
    }
}
