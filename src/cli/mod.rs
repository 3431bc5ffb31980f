//! Command-line interface for the Things bridge.
//!
//! Commands read from the Things database or send changes through the Things
//! URL scheme. Output goes through [`CliOutput`] so every command can be run
//! and checked without a terminal.

mod run;


pub use run::{run, run_with, CliOutput};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Things bridge - read and change Things 3 from the command line.
///
/// Reads go straight to the Things database. Changes are sent through the
/// Things URL scheme and checked against the database afterwards.
///
/// Changing or deleting existing items needs the Things authorization token
/// (Things > Settings > General > Enable Things URLs > Manage), set in
/// THINGS_AUTH_TOKEN or in ~/.things-bridge/config.yaml.
#[derive(Parser, Debug)]
#[command(name = "things-bridge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Read this database instead of locating the Things database
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print areas, projects, inbox, today and tags.
    ///
    /// By default only open, untrashed items are shown. Filters narrow the
    /// result; `--tag` may be repeated and requires every tag listed.
    Summary(SummaryArgs),

    /// Print the path of the Things database.
    Locate,

    /// Print one to-do or project as JSON.
    Item {
        /// Item ID
        id: String,
    },

    /// Create a to-do.
    Add(AddArgs),

    /// Create a project.
    #[command(name = "add-project")]
    AddProject(AddProjectArgs),

    /// Change a to-do or project (needs the authorization token).
    ///
    /// Only the given fields change. `--complete` and `--cancel` close the
    /// item; `--reopen` makes it open again.
    Update(UpdateArgs),

    /// Move a to-do or project to the trash (needs the authorization token).
    Delete {
        /// Item ID
        id: String,

        /// The item is a project
        #[arg(long)]
        project: bool,
    },

    /// Reveal an item in the Things window.
    Show {
        /// Item, project or area ID
        id: String,
    },

    /// Show version information.
    Version,
}

/// Filters for `summary`.
#[derive(Args, Debug, Default, Clone)]
pub struct SummaryArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Only items in this state: open, completed or canceled
    #[arg(short, long)]
    pub status: Option<String>,

    /// Only items in this area
    #[arg(short, long)]
    pub area: Option<String>,

    /// Only items with this tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Only this project and its tasks
    #[arg(short, long)]
    pub project: Option<String>,

    /// Earliest creation, start or deadline date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Latest creation, start or deadline date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Include completed and canceled items
    #[arg(long)]
    pub include_completed: bool,

    /// Include trashed items
    #[arg(long)]
    pub include_trash: bool,

    /// Keep areas and tags with no matching items
    #[arg(long)]
    pub include_inactive: bool,
}

/// Fields for `add`.
#[derive(Args, Debug, Default, Clone)]
pub struct AddArgs {
    /// Title of the to-do
    pub title: String,

    /// Notes
    #[arg(short, long)]
    pub notes: Option<String>,

    /// When: today, tomorrow, evening, anytime, someday or YYYY-MM-DD
    #[arg(short, long)]
    pub when: Option<String>,

    /// Deadline (YYYY-MM-DD)
    #[arg(short, long)]
    pub deadline: Option<String>,

    /// Tag to apply (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Checklist item (repeatable)
    #[arg(short, long = "checklist")]
    pub checklist_items: Vec<String>,

    /// Project or area to add to, by name
    #[arg(long)]
    pub list: Option<String>,

    /// Project or area to add to, by ID
    #[arg(long)]
    pub list_id: Option<String>,

    /// Heading inside the project, by name
    #[arg(long)]
    pub heading: Option<String>,

    /// Heading inside the project, by ID
    #[arg(long)]
    pub heading_id: Option<String>,

    /// Create it already completed
    #[arg(long)]
    pub completed: bool,

    /// Create it already canceled
    #[arg(long)]
    pub canceled: bool,
}

/// Fields for `add-project`.
#[derive(Args, Debug, Default, Clone)]
pub struct AddProjectArgs {
    /// Title of the project
    pub title: String,

    /// Notes
    #[arg(short, long)]
    pub notes: Option<String>,

    /// When: today, tomorrow, evening, anytime, someday or YYYY-MM-DD
    #[arg(short, long)]
    pub when: Option<String>,

    /// Deadline (YYYY-MM-DD)
    #[arg(short, long)]
    pub deadline: Option<String>,

    /// Tag to apply (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Area, by name
    #[arg(short, long)]
    pub area: Option<String>,

    /// Area, by ID
    #[arg(long)]
    pub area_id: Option<String>,

    /// To-do to create inside the project (repeatable)
    #[arg(long = "todo")]
    pub todos: Vec<String>,

    /// Create it already completed
    #[arg(long)]
    pub completed: bool,

    /// Create it already canceled
    #[arg(long)]
    pub canceled: bool,
}

/// Fields for `update`.
#[derive(Args, Debug, Default, Clone)]
pub struct UpdateArgs {
    /// Item ID
    pub id: String,

    /// The item is a project
    #[arg(long)]
    pub project: bool,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Replace the notes
    #[arg(short, long)]
    pub notes: Option<String>,

    /// Add text before the notes
    #[arg(long)]
    pub prepend_notes: Option<String>,

    /// Add text after the notes
    #[arg(long)]
    pub append_notes: Option<String>,

    /// When: today, tomorrow, evening, anytime, someday or YYYY-MM-DD
    #[arg(short, long)]
    pub when: Option<String>,

    /// Deadline (YYYY-MM-DD, empty to clear)
    #[arg(short, long)]
    pub deadline: Option<String>,

    /// Replace all tags (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Add a tag (repeatable)
    #[arg(long = "add-tag")]
    pub add_tags: Vec<String>,

    /// Replace the checklist (repeatable)
    #[arg(long = "checklist")]
    pub checklist_items: Vec<String>,

    /// Add a checklist item at the start (repeatable)
    #[arg(long = "prepend-checklist")]
    pub prepend_checklist_items: Vec<String>,

    /// Add a checklist item at the end (repeatable)
    #[arg(long = "append-checklist")]
    pub append_checklist_items: Vec<String>,

    /// Move to this project or area, by name
    #[arg(long)]
    pub list: Option<String>,

    /// Move to this project or area, by ID
    #[arg(long)]
    pub list_id: Option<String>,

    /// Move to this heading, by name
    #[arg(long)]
    pub heading: Option<String>,

    /// Move to this heading, by ID
    #[arg(long)]
    pub heading_id: Option<String>,

    /// Move a project to this area, by name
    #[arg(long)]
    pub area: Option<String>,

    /// Move a project to this area, by ID
    #[arg(long)]
    pub area_id: Option<String>,

    /// Set the creation date (ISO 8601)
    #[arg(long)]
    pub creation_date: Option<String>,

    /// Set the completion date (ISO 8601)
    #[arg(long)]
    pub completion_date: Option<String>,

    /// Mark completed
    #[arg(long, conflicts_with_all = ["cancel", "reopen"])]
    pub complete: bool,

    /// Mark canceled
    #[arg(long, conflicts_with = "reopen")]
    pub cancel: bool,

    /// Mark open again
    #[arg(long)]
    pub reopen: bool,
}
