//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::cli::{AddArgs, AddProjectArgs, Cli, Command, SummaryArgs, UpdateArgs};
use crate::command::RealCommandRunner;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::logging;
use crate::things::ids::validate_id;
use crate::things::locator::ensure_supported_platform;
use crate::things::query::{open_reader, resolve_database};
use crate::things::render::{render_item, render_report, render_summary, SummaryFormat};
use crate::things::summary::{non_blank, non_blank_all, parse_date_param, parse_status_param};
use crate::things::{
    assemble, lookup, Bridge, ChangeSet, ItemKind, Kind, MutationReport, NewProject, NewTodo,
    SummaryFilter, Target, Verification,
};
use crate::traits::{CommandRunner, RowSource};
use std::process::ExitCode;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Run a CLI command with the user's configuration and real processes.
///
/// Everything but `version` fails straight away off macOS.
pub fn run(cli: Cli) -> CliOutput {
    if !matches!(cli.command, Command::Version) {
        if let Err(e) = ensure_supported_platform() {
            return error_output(e.to_string());
        }
    }
    match BridgeConfig::load() {
        Ok(config) => run_with(cli, config, &RealCommandRunner::new()),
        Err(e) => error_output(e.to_string()),
    }
}

/// Run a CLI command with `config`, running processes through `runner`.
pub fn run_with(cli: Cli, mut config: BridgeConfig, runner: &dyn CommandRunner) -> CliOutput {
    if let Some(database) = cli.database {
        config.database_path = Some(database);
    }

    match cli.command {
        Command::Version => run_version(),
        Command::Locate => run_locate(&config),
        Command::Summary(args) => run_summary(&config, runner, &args),
        Command::Item { id } => run_item(&config, runner, &id),
        Command::Add(args) => {
            let todo = new_todo(args);
            run_mutation(&config, runner, |bridge| bridge.create_todo(&todo))
        }
        Command::AddProject(args) => {
            let project = new_project(args);
            run_mutation(&config, runner, |bridge| bridge.create_project(&project))
        }
        Command::Update(args) => {
            let target = if args.project {
                Target::project(args.id.clone())
            } else {
                Target::todo(args.id.clone())
            };
            let changes = change_set(args);
            run_mutation(&config, runner, |bridge| bridge.update(&target, &changes))
        }
        Command::Delete { id, project } => {
            let kind = if project { ItemKind::Project } else { kind_of(&config, runner, &id) };
            let target = Target { id, kind };
            run_mutation(&config, runner, |bridge| bridge.delete(&target))
        }
        Command::Show { id } => run_mutation(&config, runner, |bridge| bridge.show(&id)),
    }
}

// === Read Commands ===

fn run_version() -> CliOutput {
    CliOutput {
        exit_code: ExitCode::SUCCESS,
        stdout: vec![],
        stderr: vec![format!("things-bridge v{}", crate::VERSION)],
    }
}

fn run_locate(config: &BridgeConfig) -> CliOutput {
    match resolve_database(config) {
        Ok(path) => success_output(path.display().to_string()),
        Err(e) => error_output(e.to_string()),
    }
}

fn summary_filter(args: &SummaryArgs) -> Result<SummaryFilter> {
    Ok(SummaryFilter {
        status: parse_status_param(args.status.as_deref())?,
        area: non_blank(args.area.as_ref()),
        tags: non_blank_all(&args.tags),
        project: non_blank(args.project.as_ref()),
        from: parse_date_param("from", args.from.as_deref())?,
        to: parse_date_param("to", args.to.as_deref())?,
        include_completed: args.include_completed,
        include_trash: args.include_trash,
        include_inactive: args.include_inactive,
    })
}

fn run_summary(
    config: &BridgeConfig,
    runner: &dyn CommandRunner,
    args: &SummaryArgs,
) -> CliOutput {
    let format = match args.format.parse::<SummaryFormat>() {
        Ok(format) => format,
        Err(e) => return error_output(e.to_string()),
    };
    let filter = match summary_filter(args) {
        Ok(filter) => filter,
        Err(e) => return error_output(e.to_string()),
    };
    let reader = match open(config, runner) {
        Ok(reader) => reader,
        Err(e) => return error_output(e.to_string()),
    };

    let today = chrono::Local::now().date_naive();
    let summary = assemble(reader.as_ref(), &filter, today);
    match render_summary(&summary, format) {
        Ok(text) => success_output(text),
        Err(e) => error_output(e.to_string()),
    }
}

fn run_item(config: &BridgeConfig, runner: &dyn CommandRunner, id: &str) -> CliOutput {
    let id = match validate_id(id) {
        Ok(id) => id,
        Err(e) => return error_output(e.to_string()),
    };
    let reader = match open(config, runner) {
        Ok(reader) => reader,
        Err(e) => return error_output(e.to_string()),
    };

    match lookup(reader.as_ref(), id) {
        Some(item) => match render_item(&item) {
            Ok(json) => success_output(json),
            Err(e) => error_output(e.to_string()),
        },
        None => error_output(format!("Item not found: {id}")),
    }
}

// === Write Commands ===

fn new_todo(args: AddArgs) -> NewTodo {
    NewTodo {
        title: args.title,
        notes: args.notes,
        when: args.when,
        deadline: args.deadline,
        tags: non_empty(args.tags),
        checklist_items: non_empty(args.checklist_items),
        list_id: args.list_id,
        list: args.list,
        heading_id: args.heading_id,
        heading: args.heading,
        completed: args.completed,
        canceled: args.canceled,
    }
}

fn new_project(args: AddProjectArgs) -> NewProject {
    NewProject {
        title: args.title,
        notes: args.notes,
        when: args.when,
        deadline: args.deadline,
        tags: non_empty(args.tags),
        area_id: args.area_id,
        area: args.area,
        todos: non_empty(args.todos),
        completed: args.completed,
        canceled: args.canceled,
    }
}

fn change_set(args: UpdateArgs) -> ChangeSet {
    let completed = if args.complete {
        Some(true)
    } else if args.reopen {
        Some(false)
    } else {
        None
    };
    ChangeSet {
        title: args.title,
        notes: args.notes,
        prepend_notes: args.prepend_notes,
        append_notes: args.append_notes,
        when: args.when,
        deadline: args.deadline,
        tags: non_empty(args.tags),
        add_tags: non_empty(args.add_tags),
        checklist_items: non_empty(args.checklist_items),
        prepend_checklist_items: non_empty(args.prepend_checklist_items),
        append_checklist_items: non_empty(args.append_checklist_items),
        list_id: args.list_id,
        list: args.list,
        heading_id: args.heading_id,
        heading: args.heading,
        area_id: args.area_id,
        area: args.area,
        creation_date: args.creation_date,
        completion_date: args.completion_date,
        completed,
        canceled: args.cancel.then_some(true),
    }
}

fn run_mutation(
    config: &BridgeConfig,
    runner: &dyn CommandRunner,
    mutate: impl FnOnce(&Bridge<'_>) -> Result<MutationReport>,
) -> CliOutput {
    let reader = match open(config, runner) {
        Ok(reader) => Some(reader),
        Err(e) => {
            logging::log_warning(&format!("verification unavailable: {e}"));
            None
        }
    };
    let bridge = Bridge::from_config(config, runner, reader.as_deref());

    let report = match mutate(&bridge) {
        Ok(report) => report,
        Err(e) => return error_output(e.to_string()),
    };
    let mut output = match render_report(&report) {
        Ok(text) => success_output(text),
        Err(e) => return error_output(e.to_string()),
    };
    if let Verification::Unverified(reason) = &report.verification {
        output.stderr.push(format!("Warning: change sent but not yet visible: {reason}"));
    }
    output
}

// === Helper Functions ===

fn open<'a>(
    config: &BridgeConfig,
    runner: &'a dyn CommandRunner,
) -> Result<Box<dyn RowSource + 'a>> {
    open_reader(config, runner, resolve_database(config)?)
}

/// The kind of `id` according to the database, defaulting to a to-do.
fn kind_of(config: &BridgeConfig, runner: &dyn CommandRunner, id: &str) -> ItemKind {
    let item = validate_id(id)
        .ok()
        .and_then(|id| open(config, runner).ok().and_then(|reader| lookup(reader.as_ref(), id)));
    match item {
        Some(item) if item.kind == Kind::Project => ItemKind::Project,
        _ => ItemKind::Todo,
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
}
