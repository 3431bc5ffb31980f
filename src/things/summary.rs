//! Assembly of the hierarchical summary view.
//!
//! The database is flat: one `TMTask` table holding to-dos, projects and
//! headings, plus areas, tags and a link table. [`assemble`] rebuilds the
//! tree Things shows in its sidebar:
//!
//! ```text
//! areas[]        projects[] (with their tasks) and loose tasks of the area
//! projects[]     every listed project with its tasks
//! inboxTasks[]   tasks with neither area nor project
//! todayTasks[]   tasks starting today
//! tasks[]        tasks whose project was filtered away
//! tags[]         tags with their use counts
//! ```
//!
//! Everything is loaded once and joined in memory. Caller filters narrow the
//! loaded set; they never issue further queries.

use super::dates::{format_date, format_timestamp, parse_iso_date};
use super::rows::{
    area_select, tag_select, task_select, AreaRow, Kind, Status, TagRow, TaskRow, TaskTagRow,
    TASK_TAG_SELECT,
};
use crate::error::{Error, Result};
use crate::logging;
use crate::traits::{Row, RowSource};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Filters applied to a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFilter {
    /// Only items in this state. Overrides `include_completed`.
    pub status: Option<Status>,
    /// Only items in the area with this name.
    pub area: Option<String>,
    /// Only items carrying every one of these tags.
    pub tags: Vec<String>,
    /// Only this project and the tasks inside it.
    pub project: Option<String>,
    /// Earliest creation, start or deadline date (inclusive).
    pub from: Option<NaiveDate>,
    /// Latest creation, start or deadline date (inclusive).
    pub to: Option<NaiveDate>,
    /// Also load completed and canceled items.
    pub include_completed: bool,
    /// Also load trashed items.
    pub include_trash: bool,
    /// Keep areas and tags that end up with no items.
    pub include_inactive: bool,
}

impl SummaryFilter {
    fn has_date_range(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// A caller-supplied name filter, or `None` when blank.
#[must_use]
pub fn non_blank(raw: Option<&String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty()).cloned()
}

/// Caller-supplied tag filters with blank entries dropped.
#[must_use]
pub fn non_blank_all(raw: &[String]) -> Vec<String> {
    raw.iter().filter(|value| !value.trim().is_empty()).cloned().collect()
}

/// Parse a caller-supplied status filter; blank means none.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for an unknown status name.
pub fn parse_status_param(raw: Option<&str>) -> Result<Option<Status>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            Status::from_name(s)
                .ok_or_else(|| Error::InvalidParameter(format!("unknown status: {s}")))
        })
        .transpose()
}

/// Parse a caller-supplied `YYYY-MM-DD` bound named `name`; blank means none.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for a malformed date.
pub fn parse_date_param(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| {
            parse_iso_date(r).ok_or_else(|| {
                Error::InvalidParameter(format!("{name} must be YYYY-MM-DD, got {r:?}"))
            })
        })
        .transpose()
}

/// The status/trash condition rows must meet to be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasePredicate {
    /// Required status, or `None` for any.
    pub status: Option<Status>,
    /// Whether trashed rows qualify.
    pub include_trash: bool,
}

impl BasePredicate {
    /// Derive the predicate from a filter: open and untrashed unless widened.
    #[must_use]
    pub fn from_filter(filter: &SummaryFilter) -> Self {
        let status = match filter.status {
            Some(status) => Some(status),
            None if filter.include_completed => None,
            None => Some(Status::Open),
        };
        Self { status, include_trash: filter.include_trash }
    }

    /// The predicate as one SQL condition.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut conditions = Vec::new();
        if let Some(status) = self.status {
            conditions.push(format!("status = {}", status.code()));
        }
        if !self.include_trash {
            conditions.push("trashed = 0".to_string());
        }
        if conditions.is_empty() {
            "1 = 1".to_string()
        } else {
            conditions.join(" AND ")
        }
    }

    /// The same predicate evaluated on a loaded row.
    #[must_use]
    pub fn matches(&self, row: &TaskRow) -> bool {
        self.status.map_or(true, |s| row.status == s) && (self.include_trash || !row.trashed)
    }
}

/// The task query for `predicate`.
///
/// Projects are always loaded so that tasks can name their project even when
/// the project itself does not meet the predicate; membership is re-checked
/// in memory with [`BasePredicate::matches`].
#[must_use]
pub fn task_query(predicate: &BasePredicate) -> String {
    format!("{} WHERE type = 1 OR ({})", task_select(), predicate.to_sql())
}

/// A resolved reference to an area or project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Checklist counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checklist {
    /// All items.
    pub total: u32,
    /// Items not yet checked.
    pub open: u32,
}

/// A task or project in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// Identifier.
    pub id: String,
    /// To-do or project.
    pub kind: Kind,
    /// Title.
    pub title: String,
    /// Notes, empty when there are none.
    pub notes: String,
    /// Lifecycle state.
    pub status: Status,
    /// `Some(true)` for items in the trash.
    pub trashed: Option<bool>,
    /// Creation time (RFC 3339).
    pub created: Option<String>,
    /// Last modification time (RFC 3339).
    pub modified: Option<String>,
    /// Start date (`YYYY-MM-DD`).
    pub start_date: Option<String>,
    /// Deadline (`YYYY-MM-DD`).
    pub deadline: Option<String>,
    /// Completion or cancellation time (RFC 3339).
    pub completed: Option<String>,
    /// Directly containing area.
    pub area: Option<Ref>,
    /// Containing project.
    pub project: Option<Ref>,
    /// Tags, sorted by name.
    pub tags: Vec<Ref>,
    /// Checklist counters.
    pub checklist: Checklist,
    /// Child tasks; only ever filled for projects.
    pub tasks: Vec<ItemView>,
}

/// An area with its projects and loose tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaView {
    /// Identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Whether the area is shown in the sidebar.
    pub visible: bool,
    /// Projects in the area.
    pub projects: Vec<ItemView>,
    /// Tasks placed in the area outside any project.
    pub tasks: Vec<ItemView>,
}

/// A tag with the number of loaded items carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    /// Identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Keyboard shortcut.
    pub shortcut: Option<String>,
    /// Loaded items carrying the tag, before caller filters.
    pub task_count: u32,
}

/// The assembled summary. Built per request and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Areas with their contents.
    pub areas: Vec<AreaView>,
    /// Tasks with neither area nor project.
    pub inbox_tasks: Vec<ItemView>,
    /// Tasks starting today.
    pub today_tasks: Vec<ItemView>,
    /// Projects with their tasks.
    pub projects: Vec<ItemView>,
    /// Tasks whose project is not listed.
    pub tasks: Vec<ItemView>,
    /// Tags in use.
    pub tags: Vec<TagView>,
}

impl Summary {
    /// The sparse JSON form of the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(super::compress::compress_object(serde_json::to_value(self)?))
    }
}

/// What a task needs to know about its project.
struct ProjectInfo {
    title: String,
    area: Option<String>,
}

/// A loaded task or project with its references resolved.
struct Item {
    row: TaskRow,
    area: Option<Ref>,
    project: Option<Ref>,
    /// The direct area, or the project's area for tasks inside a project.
    effective_area: Option<String>,
    tags: Vec<Ref>,
}

impl Item {
    fn resolve(
        row: TaskRow,
        area_names: &HashMap<String, String>,
        projects: &HashMap<String, ProjectInfo>,
    ) -> Self {
        let area = row.area.as_ref().map(|id| Ref {
            id: id.clone(),
            name: area_names.get(id).cloned().unwrap_or_default(),
        });
        let parent = row.project.as_ref().and_then(|id| projects.get(id));
        let project = row.project.as_ref().map(|id| Ref {
            id: id.clone(),
            name: parent.map(|p| p.title.clone()).unwrap_or_default(),
        });
        let effective_area = row.area.clone().or_else(|| parent.and_then(|p| p.area.clone()));
        Self { row, area, project, effective_area, tags: Vec::new() }
    }

    fn view(&self, tasks: Vec<ItemView>) -> ItemView {
        let row = &self.row;
        ItemView {
            id: row.id.clone(),
            kind: row.kind,
            title: row.title.clone(),
            notes: row.notes.clone().unwrap_or_default(),
            status: row.status,
            trashed: row.trashed.then_some(true),
            created: row.created.map(format_timestamp),
            modified: row.modified.map(format_timestamp),
            start_date: row.start_date.map(format_date),
            deadline: row.deadline.map(format_date),
            completed: row.completed_at.map(format_timestamp),
            area: self.area.clone(),
            project: self.project.clone(),
            tags: self.tags.clone(),
            checklist: Checklist { total: row.checklist_total, open: row.checklist_open },
            tasks,
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Run `sql` and keep the rows `parse` accepts, logging the ones it rejects.
fn load<T>(source: &dyn RowSource, sql: &str, what: &str, parse: fn(&[String]) -> Option<T>) -> Vec<T> {
    let rows: Vec<Row> = source.query(sql);
    let total = rows.len();
    let parsed: Vec<T> = rows.iter().filter_map(|fields| parse(fields)).collect();
    if parsed.len() < total {
        logging::log_warning(&format!("skipped {} malformed {what} row(s)", total - parsed.len()));
    }
    parsed
}

/// Build the summary for `filter`, with `today` deciding the today bucket.
#[must_use]
pub fn assemble(source: &dyn RowSource, filter: &SummaryFilter, today: NaiveDate) -> Summary {
    let areas = load(source, &area_select(), "area", AreaRow::from_fields);
    let tags = load(source, &tag_select(), "tag", TagRow::from_fields);
    let predicate = BasePredicate::from_filter(filter);
    let rows = load(source, &task_query(&predicate), "task", TaskRow::from_fields);

    let area_names: HashMap<String, String> =
        areas.iter().map(|a| (a.id.clone(), a.title.clone())).collect();
    let projects: HashMap<String, ProjectInfo> = rows
        .iter()
        .filter(|r| r.kind == Kind::Project)
        .map(|r| (r.id.clone(), ProjectInfo { title: r.title.clone(), area: r.area.clone() }))
        .collect();

    let mut items: Vec<Item> = rows
        .into_iter()
        .filter(|r| r.kind != Kind::Heading && predicate.matches(r))
        .map(|r| Item::resolve(r, &area_names, &projects))
        .collect();

    let task_counts = attach_tags(source, &mut items, &tags);

    if let Some(area) = &filter.area {
        items.retain(|item| {
            item.effective_area
                .as_ref()
                .and_then(|id| area_names.get(id))
                .is_some_and(|name| same_name(name, area))
        });
    }
    if !filter.tags.is_empty() {
        items.retain(|item| {
            filter.tags.iter().all(|wanted| item.tags.iter().any(|t| same_name(&t.name, wanted)))
        });
    }
    if let Some(project) = &filter.project {
        items.retain(|item| {
            (item.row.kind == Kind::Project && same_name(&item.row.title, project))
                || item.project.as_ref().is_some_and(|p| same_name(&p.name, project))
        });
    }
    if filter.has_date_range() {
        items.retain(|item| item.row.filter_dates().any(|d| filter.in_range(d)));
    }

    build(&items, &areas, &tags, &task_counts, filter, today)
}

/// Link tags to loaded items. Returns the per-tag item counts.
fn attach_tags(source: &dyn RowSource, items: &mut [Item], tags: &[TagRow]) -> Vec<u32> {
    let item_index: HashMap<String, usize> =
        items.iter().enumerate().map(|(i, item)| (item.row.id.clone(), i)).collect();
    let tag_index: HashMap<&str, usize> =
        tags.iter().enumerate().map(|(i, t)| (t.id.as_str(), i)).collect();
    let mut counts = vec![0u32; tags.len()];

    for link in load(source, TASK_TAG_SELECT, "task tag", TaskTagRow::from_fields) {
        let (Some(&i), Some(&t)) =
            (item_index.get(&link.task), tag_index.get(link.tag.as_str()))
        else {
            continue;
        };
        if items[i].tags.iter().any(|r| r.id == tags[t].id) {
            continue;
        }
        items[i].tags.push(Ref { id: tags[t].id.clone(), name: tags[t].title.clone() });
        counts[t] += 1;
    }

    for item in items.iter_mut() {
        item.tags.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }
    counts
}

/// Partition the filtered items and nest them.
fn build(
    items: &[Item],
    areas: &[AreaRow],
    tags: &[TagRow],
    task_counts: &[u32],
    filter: &SummaryFilter,
    today: NaiveDate,
) -> Summary {
    let (projects, tasks): (Vec<&Item>, Vec<&Item>) =
        items.iter().partition(|item| item.row.kind == Kind::Project);

    let project_views: Vec<(&Item, ItemView)> = projects
        .iter()
        .map(|project| {
            let children = tasks
                .iter()
                .filter(|t| t.row.project.as_deref() == Some(project.row.id.as_str()))
                .map(|t| t.view(Vec::new()))
                .collect();
            (*project, project.view(children))
        })
        .collect();
    let listed_projects: HashSet<&str> = projects.iter().map(|p| p.row.id.as_str()).collect();

    let inbox_tasks = tasks
        .iter()
        .filter(|t| t.row.area.is_none() && t.row.project.is_none())
        .map(|t| t.view(Vec::new()))
        .collect();
    let today_tasks =
        tasks.iter().filter(|t| t.row.start_date == Some(today)).map(|t| t.view(Vec::new())).collect();
    let orphaned_tasks = tasks
        .iter()
        .filter(|t| t.row.project.as_deref().is_some_and(|p| !listed_projects.contains(p)))
        .map(|t| t.view(Vec::new()))
        .collect();

    let area_views = areas
        .iter()
        .filter(|area| filter.area.as_ref().map_or(true, |wanted| same_name(&area.title, wanted)))
        .map(|area| AreaView {
            id: area.id.clone(),
            title: area.title.clone(),
            visible: area.visible,
            projects: project_views
                .iter()
                .filter(|(p, _)| p.row.area.as_deref() == Some(area.id.as_str()))
                .map(|(_, view)| view.clone())
                .collect(),
            tasks: tasks
                .iter()
                .filter(|t| {
                    t.row.project.is_none() && t.row.area.as_deref() == Some(area.id.as_str())
                })
                .map(|t| t.view(Vec::new()))
                .collect(),
        })
        .filter(|area| filter.include_inactive || !(area.projects.is_empty() && area.tasks.is_empty()))
        .collect();

    let used_tags: HashSet<&str> =
        items.iter().flat_map(|item| item.tags.iter().map(|t| t.id.as_str())).collect();
    let tag_views = tags
        .iter()
        .zip(task_counts)
        .filter(|(tag, _)| filter.include_inactive || used_tags.contains(tag.id.as_str()))
        .map(|(tag, count)| TagView {
            id: tag.id.clone(),
            title: tag.title.clone(),
            shortcut: tag.shortcut.clone(),
            task_count: *count,
        })
        .collect();

    Summary {
        areas: area_views,
        inbox_tasks,
        today_tasks,
        projects: project_views.into_iter().map(|(_, view)| view).collect(),
        tasks: orphaned_tasks,
        tags: tag_views,
    }
}

/// Look up one item by id, with its tags and, for a project, its
/// untrashed tasks.
#[must_use]
pub fn lookup(source: &dyn RowSource, id: &str) -> Option<ItemView> {
    let quoted = super::query::sql_quote(id);
    let sql = format!(
        "{} WHERE uuid = {quoted} OR project = {quoted} \
         OR uuid IN (SELECT project FROM TMTask WHERE uuid = {quoted})",
        task_select()
    );
    let rows = load(source, &sql, "task", TaskRow::from_fields);
    let areas = load(source, &area_select(), "area", AreaRow::from_fields);
    let tags = load(source, &tag_select(), "tag", TagRow::from_fields);

    let area_names: HashMap<String, String> =
        areas.into_iter().map(|a| (a.id, a.title)).collect();
    let projects: HashMap<String, ProjectInfo> = rows
        .iter()
        .filter(|r| r.kind == Kind::Project)
        .map(|r| (r.id.clone(), ProjectInfo { title: r.title.clone(), area: r.area.clone() }))
        .collect();

    let mut items: Vec<Item> = rows
        .into_iter()
        .filter(|r| r.id == id || (r.project.as_deref() == Some(id) && !r.trashed))
        .filter(|r| r.kind != Kind::Heading || r.id == id)
        .map(|r| Item::resolve(r, &area_names, &projects))
        .collect();
    attach_tags(source, &mut items, &tags);

    let (target, children): (Vec<Item>, Vec<Item>) =
        items.into_iter().partition(|item| item.row.id == id);
    let target = target.into_iter().next()?;
    let tasks = if target.row.kind == Kind::Project {
        children.iter().map(|child| child.view(Vec::new())).collect()
    } else {
        Vec::new()
    };
    Some(target.view(tasks))
}
