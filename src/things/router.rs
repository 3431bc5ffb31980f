//! Routing of changes to write commands.
//!
//! [`route`] is a pure function from a change set to the commands that carry
//! it out. Terminal state transitions (`completed`, `canceled`) travel as a
//! JSON operation; every other field becomes a parameter of one URL command.
//! When both are present the URL command is emitted first, because a
//! completed item no longer accepts some edits.

use super::commands::{
    delete_script, ItemKind, JsonOperation, UrlCommand, WriteCommand, AUTH_TOKEN_PARAM,
    LINE_SEPARATOR, TAG_SEPARATOR,
};
use super::dates::parse_iso_date;
use super::ids::validate_id;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The item a change applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Item id.
    pub id: String,
    /// To-do or project.
    pub kind: ItemKind,
}

impl Target {
    /// A to-do target.
    #[must_use]
    pub fn todo(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: ItemKind::Todo }
    }

    /// A project target.
    #[must_use]
    pub fn project(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: ItemKind::Project }
    }
}

/// Fields to change on an existing item. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct ChangeSet {
    /// New title.
    pub title: Option<String>,
    /// Replace the notes.
    pub notes: Option<String>,
    /// Text to put before the notes.
    pub prepend_notes: Option<String>,
    /// Text to put after the notes.
    pub append_notes: Option<String>,
    /// Schedule: `today`, `tomorrow`, `evening`, `anytime`, `someday` or a date.
    pub when: Option<String>,
    /// Deadline as `YYYY-MM-DD`, or empty to clear it.
    pub deadline: Option<String>,
    /// Replace all tags.
    pub tags: Option<Vec<String>>,
    /// Tags to add.
    pub add_tags: Option<Vec<String>>,
    /// Replace the checklist (to-dos only).
    pub checklist_items: Option<Vec<String>>,
    /// Checklist items to put first (to-dos only).
    pub prepend_checklist_items: Option<Vec<String>>,
    /// Checklist items to put last (to-dos only).
    pub append_checklist_items: Option<Vec<String>>,
    /// Move into the project or area with this id (to-dos only).
    pub list_id: Option<String>,
    /// Move into the project or area with this name (to-dos only).
    pub list: Option<String>,
    /// Move under the heading with this id (to-dos only).
    pub heading_id: Option<String>,
    /// Move under the heading with this name (to-dos only).
    pub heading: Option<String>,
    /// Move into the area with this id (projects only).
    pub area_id: Option<String>,
    /// Move into the area with this name (projects only).
    pub area: Option<String>,
    /// Override the creation date (ISO 8601).
    pub creation_date: Option<String>,
    /// Override the completion date (ISO 8601).
    pub completion_date: Option<String>,
    /// Mark completed, or reopen with `false`.
    pub completed: Option<bool>,
    /// Mark canceled, or reopen with `false`.
    pub canceled: Option<bool>,
}

impl ChangeSet {
    /// Whether a state transition is requested.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.completed.is_some() || self.canceled.is_some()
    }

    /// Names of set fields that do not apply to `kind`.
    fn foreign_fields(&self, kind: ItemKind) -> Vec<&'static str> {
        let candidates = match kind {
            ItemKind::Todo => vec![("area_id", self.area_id.is_some()), ("area", self.area.is_some())],
            ItemKind::Project => vec![
                ("checklist_items", self.checklist_items.is_some()),
                ("prepend_checklist_items", self.prepend_checklist_items.is_some()),
                ("append_checklist_items", self.append_checklist_items.is_some()),
                ("list_id", self.list_id.is_some()),
                ("list", self.list.is_some()),
                ("heading_id", self.heading_id.is_some()),
                ("heading", self.heading.is_some()),
            ],
        };
        candidates.into_iter().filter(|(_, set)| *set).map(|(name, _)| name).collect()
    }
}

/// A to-do to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct NewTodo {
    /// Title (required).
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Schedule: `today`, `tomorrow`, `evening`, `anytime`, `someday` or a date.
    pub when: Option<String>,
    /// Deadline as `YYYY-MM-DD`.
    pub deadline: Option<String>,
    /// Tag names.
    pub tags: Option<Vec<String>>,
    /// Checklist items.
    pub checklist_items: Option<Vec<String>>,
    /// Project or area id to file into.
    pub list_id: Option<String>,
    /// Project or area name to file into.
    pub list: Option<String>,
    /// Heading id inside the project.
    pub heading_id: Option<String>,
    /// Heading name inside the project.
    pub heading: Option<String>,
    /// Create already completed.
    pub completed: bool,
    /// Create already canceled.
    pub canceled: bool,
}

/// A project to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct NewProject {
    /// Title (required).
    pub title: String,
    /// Notes.
    pub notes: Option<String>,
    /// Schedule: `today`, `tomorrow`, `evening`, `anytime`, `someday` or a date.
    pub when: Option<String>,
    /// Deadline as `YYYY-MM-DD`.
    pub deadline: Option<String>,
    /// Tag names.
    pub tags: Option<Vec<String>>,
    /// Area id to file into.
    pub area_id: Option<String>,
    /// Area name to file into.
    pub area: Option<String>,
    /// Titles of to-dos to create inside the project.
    pub todos: Option<Vec<String>>,
    /// Create already completed.
    pub completed: bool,
    /// Create already canceled.
    pub canceled: bool,
}

fn require_token(auth_token: Option<&str>) -> Result<&str> {
    auth_token.map(str::trim).filter(|t| !t.is_empty()).ok_or(Error::AuthTokenMissing)
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidParameter("title must not be empty".into()));
    }
    Ok(())
}

fn check_deadline(deadline: Option<&String>) -> Result<()> {
    match deadline {
        Some(d) if !d.is_empty() && parse_iso_date(d).is_none() => {
            Err(Error::InvalidParameter(format!("deadline must be YYYY-MM-DD, got {d:?}")))
        }
        _ => Ok(()),
    }
}

fn check_ids(ids: &[Option<&String>]) -> Result<()> {
    for id in ids.iter().flatten() {
        validate_id(id)?;
    }
    Ok(())
}

/// Route `change` on `target` to write commands.
///
/// # Errors
///
/// Fails before building anything when the token is missing, the id is
/// malformed, a field does not apply to the target kind, or nothing would
/// change.
pub fn route(
    target: &Target,
    change: &ChangeSet,
    auth_token: Option<&str>,
) -> Result<Vec<WriteCommand>> {
    let token = require_token(auth_token)?;
    let id = validate_id(&target.id)?;

    let foreign = change.foreign_fields(target.kind);
    if !foreign.is_empty() {
        return Err(Error::InvalidParameter(format!(
            "{} cannot be set on a {}",
            foreign.join(", "),
            target.kind
        )));
    }
    if change.completed == Some(true) && change.canceled == Some(true) {
        return Err(Error::InvalidParameter("an item cannot be both completed and canceled".into()));
    }
    if let Some(title) = &change.title {
        require_title(title)?;
    }
    check_deadline(change.deadline.as_ref())?;
    check_ids(&[change.list_id.as_ref(), change.heading_id.as_ref(), change.area_id.as_ref()])?;

    let mut commands = Vec::new();

    let command = match target.kind {
        ItemKind::Todo => "update",
        ItemKind::Project => "update-project",
    };
    let mut url = UrlCommand::new(command);
    url.push(AUTH_TOKEN_PARAM, token);
    url.push("id", id);
    if let Some(title) = &change.title {
        url.push("title", title.trim());
    }
    url.push_opt("notes", change.notes.as_ref());
    url.push_opt("prepend-notes", change.prepend_notes.as_ref());
    url.push_opt("append-notes", change.append_notes.as_ref());
    url.push_opt("when", change.when.as_ref());
    url.push_opt("deadline", change.deadline.as_ref());
    url.push_list("tags", change.tags.as_ref(), TAG_SEPARATOR);
    url.push_list("add-tags", change.add_tags.as_ref(), TAG_SEPARATOR);
    url.push_list("checklist-items", change.checklist_items.as_ref(), LINE_SEPARATOR);
    url.push_list(
        "prepend-checklist-items",
        change.prepend_checklist_items.as_ref(),
        LINE_SEPARATOR,
    );
    url.push_list("append-checklist-items", change.append_checklist_items.as_ref(), LINE_SEPARATOR);
    url.push_opt("list-id", change.list_id.as_ref());
    url.push_opt("list", change.list.as_ref());
    url.push_opt("heading-id", change.heading_id.as_ref());
    url.push_opt("heading", change.heading.as_ref());
    url.push_opt("area-id", change.area_id.as_ref());
    url.push_opt("area", change.area.as_ref());
    url.push_opt("creation-date", change.creation_date.as_ref());
    if !change.is_terminal() {
        url.push_opt("completion-date", change.completion_date.as_ref());
    }
    if url.has_changes() {
        commands.push(WriteCommand::Url(url));
    }

    if change.is_terminal() {
        let mut op = JsonOperation::update(target.kind, id, token);
        if let Some(completed) = change.completed {
            op.attributes.insert("completed".into(), Value::Bool(completed));
        }
        if let Some(canceled) = change.canceled {
            op.attributes.insert("canceled".into(), Value::Bool(canceled));
        }
        if let Some(date) = &change.completion_date {
            op.attributes.insert("completion-date".into(), Value::String(date.clone()));
        }
        commands.push(WriteCommand::Json(op));
    }

    if commands.is_empty() {
        return Err(Error::InvalidParameter("no changes requested".into()));
    }
    Ok(commands)
}

/// The `add` command creating `todo`.
///
/// # Errors
///
/// Returns an error for an empty title, a malformed deadline or id, or a
/// to-do that is both completed and canceled.
pub fn add_todo(todo: &NewTodo) -> Result<WriteCommand> {
    require_title(&todo.title)?;
    check_deadline(todo.deadline.as_ref())?;
    check_ids(&[todo.list_id.as_ref(), todo.heading_id.as_ref()])?;
    if todo.completed && todo.canceled {
        return Err(Error::InvalidParameter("an item cannot be both completed and canceled".into()));
    }

    let mut url = UrlCommand::new("add");
    url.push("title", todo.title.trim());
    url.push_opt("notes", todo.notes.as_ref());
    url.push_opt("when", todo.when.as_ref());
    url.push_opt("deadline", todo.deadline.as_ref());
    url.push_list("tags", todo.tags.as_ref(), TAG_SEPARATOR);
    url.push_list("checklist-items", todo.checklist_items.as_ref(), LINE_SEPARATOR);
    url.push_opt("list-id", todo.list_id.as_ref());
    url.push_opt("list", todo.list.as_ref());
    url.push_opt("heading-id", todo.heading_id.as_ref());
    url.push_opt("heading", todo.heading.as_ref());
    url.push_flag("completed", todo.completed);
    url.push_flag("canceled", todo.canceled);
    Ok(WriteCommand::Url(url))
}

/// The `add-project` command creating `project`.
///
/// # Errors
///
/// Returns an error for an empty title, a malformed deadline or id, or a
/// project that is both completed and canceled.
pub fn add_project(project: &NewProject) -> Result<WriteCommand> {
    require_title(&project.title)?;
    check_deadline(project.deadline.as_ref())?;
    check_ids(&[project.area_id.as_ref()])?;
    if project.completed && project.canceled {
        return Err(Error::InvalidParameter("an item cannot be both completed and canceled".into()));
    }

    let mut url = UrlCommand::new("add-project");
    url.push("title", project.title.trim());
    url.push_opt("notes", project.notes.as_ref());
    url.push_opt("when", project.when.as_ref());
    url.push_opt("deadline", project.deadline.as_ref());
    url.push_list("tags", project.tags.as_ref(), TAG_SEPARATOR);
    url.push_opt("area-id", project.area_id.as_ref());
    url.push_opt("area", project.area.as_ref());
    url.push_list("to-dos", project.todos.as_ref(), LINE_SEPARATOR);
    url.push_flag("completed", project.completed);
    url.push_flag("canceled", project.canceled);
    Ok(WriteCommand::Url(url))
}

/// The command moving `target` to the trash.
///
/// # Errors
///
/// Returns an error when the token is missing or the id is malformed.
pub fn delete(target: &Target, auth_token: Option<&str>) -> Result<WriteCommand> {
    require_token(auth_token)?;
    let id = validate_id(&target.id)?;
    Ok(WriteCommand::Script(delete_script(target.kind, id)))
}

/// The command revealing `id` in Things.
///
/// # Errors
///
/// Returns an error when the id is malformed.
pub fn show(id: &str) -> Result<WriteCommand> {
    let mut url = UrlCommand::new("show");
    url.push("id", validate_id(id)?);
    Ok(WriteCommand::Url(url))
}
