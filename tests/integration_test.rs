//! Integration tests for `things_bridge`.

use chrono::NaiveDate;
use tempfile::TempDir;
use things_bridge::testing::{FixtureDb, TaskFixture};
use things_bridge::things::query::EmbeddedReader;
use things_bridge::things::render::{render_summary, SummaryFormat};
use things_bridge::things::{assemble, lookup, Status, SummaryFilter};
use things_bridge::traits::RowSource;
use things_bridge::VERSION;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn database(dir: &TempDir) -> EmbeddedReader {
    let db = FixtureDb::create(&dir.path().join("main.sqlite")).unwrap();
    db.area("A1", "Work").unwrap();
    db.area("A2", "Home").unwrap();
    db.tag("G1", "urgent").unwrap();
    db.tag("G2", "Errand").unwrap();

    db.task(TaskFixture::task("T1", "Line one\nline | two").start(today())).unwrap();
    db.task(TaskFixture::project("P1", "Launch").area("A1").created(1_710_504_000)).unwrap();
    db.task(TaskFixture::heading("H1", "Phase 1").in_project("P1")).unwrap();
    db.task(TaskFixture::task("T2", "Write post").in_project("P1").checklist(2, 1)).unwrap();
    db.task(TaskFixture::task("T3", "Fix gate").area("A2").deadline(today())).unwrap();
    db.task(TaskFixture::task("T4", "Filed").status(Status::Completed)).unwrap();
    db.task(TaskFixture::task("T5", "Binned").trashed()).unwrap();
    db.link("T2", "G1").unwrap().link("T2", "G2").unwrap().link("T3", "G1").unwrap();

    EmbeddedReader::open(db.path()).unwrap()
}

#[test]
fn test_version_exists() {
    assert!(!VERSION.is_empty());
}

#[test]
fn test_free_text_survives_framing() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);

    let item = lookup(&reader, "T1").unwrap();
    assert_eq!(item.title, "Line one\nline | two");
}

#[test]
fn test_default_summary_tree() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);

    let summary = assemble(&reader, &SummaryFilter::default(), today());
    let json = summary.to_json().unwrap();

    assert_eq!(json["todayTasks"][0]["id"], "T1");
    assert_eq!(json["inboxTasks"][0]["id"], "T1");

    let area = |title: &str| {
        json["areas"].as_array().unwrap().iter().find(|a| a["title"] == title).unwrap().clone()
    };
    let work = area("Work");
    assert_eq!(work["projects"][0]["id"], "P1");
    assert_eq!(work["projects"][0]["created"], "2024-03-15T12:00:00Z");
    // Headings are never listed among a project's tasks.
    let tasks = work["projects"][0]["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["checklist"]["total"], 2);
    let tags: Vec<&str> =
        tasks[0]["tags"].as_array().unwrap().iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(tags, vec!["Errand", "urgent"]);

    assert_eq!(area("Home")["tasks"][0]["deadline"], "2024-03-15");

    let text = json.to_string();
    assert!(!text.contains("Filed"));
    assert!(!text.contains("Binned"));
}

#[test]
fn test_filters_narrow_the_tree() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);

    let filter = SummaryFilter { tags: vec!["URGENT".into()], ..Default::default() };
    let summary = assemble(&reader, &filter, today());
    // The untagged project is filtered away, so its tagged task stands alone.
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.tasks[0].id, "T2");
    assert!(summary.projects.is_empty());
    assert_eq!(summary.areas.len(), 1);
    assert_eq!(summary.areas[0].title, "Home");
    assert_eq!(summary.areas[0].tasks[0].id, "T3");
    assert!(summary.inbox_tasks.is_empty());

    let filter = SummaryFilter { include_trash: true, ..Default::default() };
    let summary = assemble(&reader, &filter, today());
    assert!(summary.inbox_tasks.iter().any(|item| item.id == "T5"));
}

#[test]
fn test_lookup_project_with_children() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);

    let project = lookup(&reader, "P1").unwrap();
    assert_eq!(project.area.as_ref().map(|a| a.name.as_str()), Some("Work"));
    let children: Vec<&str> = project.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(children, vec!["T2"]);

    assert!(lookup(&reader, "T404").is_none());
}

#[test]
fn test_bad_query_degrades_to_no_rows() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);
    assert!(reader.query("SELECT nope FROM TMMissing").is_empty());
}

#[test]
fn test_json_rendering_is_sparse() {
    let dir = TempDir::new().unwrap();
    let reader = database(&dir);

    let summary = assemble(&reader, &SummaryFilter::default(), today());
    let json = render_summary(&summary, SummaryFormat::Json).unwrap();

    assert!(!json.contains("null"));
    assert!(!json.contains("\"notes\""));
    assert!(!json.contains("[]"));
}
