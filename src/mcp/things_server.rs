//! MCP server exposing Things.
//!
//! Every tool call opens its own database reader and dispatcher; nothing is
//! kept between calls apart from the configuration.

// The rmcp `#[tool(aggr)]` macro requires ownership of input structs,
// making pass-by-value necessary for all tool handler functions.
#![allow(clippy::needless_pass_by_value)]

use crate::command::RealCommandRunner;
use crate::config::BridgeConfig;
use crate::error::Error as BridgeError;
use crate::logging::{self, ToolCallGuard};
use crate::things::ids::validate_id;
use crate::things::locator::ensure_supported_platform;
use crate::things::query::{open_reader, resolve_database};
use crate::things::render::{render_item, render_summary, SummaryFormat};
use crate::things::summary::{non_blank, non_blank_all, parse_date_param, parse_status_param};
use crate::things::{
    assemble, lookup, Bridge, ChangeSet, ItemKind, Kind, MutationReport, NewProject, NewTodo,
    SummaryFilter, Target,
};
use crate::traits::{CommandRunner, RowSource};
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::Error as McpError;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

/// Instructions for the MCP server, shown to agents using this server.
const INSTRUCTIONS: &str = r"Bridge to the Things 3 task manager on this Mac.

## Reading

`get_summary` returns areas, projects, inbox, today and tags. By default only open, untrashed items are included; pass `include_completed` or `status` to widen it. Filters (area, tags, project, from/to dates) narrow the result; tag filters require every listed tag. Use `format: json` for the full tree.

`get_item` returns one item by id with its tags and, for projects, their tasks.

## Writing

Things applies changes asynchronously. Each write returns a report whose `verification` is `verified`, `unverified` (sent, but not yet visible in the database) or `skipped`. An unverified change usually lands a moment later; check with `get_item` before repeating it.

Creating items needs no token. Updating and deleting existing items needs the Things authorization token (Settings > General > Enable Things URLs), provided through the THINGS_AUTH_TOKEN environment variable or the config file.

Dates are `YYYY-MM-DD`. `when` also accepts today, tomorrow, evening, anytime and someday.
";

/// MCP server for Things.
#[derive(Clone)]
pub struct ThingsServer {
    config: Arc<BridgeConfig>,
    runner: Arc<dyn CommandRunner + Send + Sync>,
    /// Refuse every tool call off macOS.
    require_macos: bool,
}

impl ThingsServer {
    /// Create a server running real processes. Tool calls fail with
    /// [`BridgeError::UnsupportedPlatform`] anywhere but macOS.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            require_macos: true,
            ..Self::with_runner(config, Arc::new(RealCommandRunner::new()))
        }
    }

    /// Create a server running processes through `runner`, on any platform.
    #[must_use]
    pub fn with_runner(config: BridgeConfig, runner: Arc<dyn CommandRunner + Send + Sync>) -> Self {
        Self { config: Arc::new(config), runner, require_macos: false }
    }

    fn check_platform(&self) -> crate::error::Result<()> {
        if self.require_macos {
            ensure_supported_platform()
        } else {
            Ok(())
        }
    }

    fn reader(&self) -> crate::error::Result<Box<dyn RowSource + '_>> {
        self.check_platform()?;
        let database = resolve_database(&self.config)?;
        open_reader(&self.config, self.runner.as_ref(), database)
    }

    /// Run `mutate` against a bridge; verification is skipped when the
    /// database cannot be opened.
    fn mutate(
        &self,
        mutate: impl FnOnce(&Bridge<'_>) -> crate::error::Result<MutationReport>,
    ) -> crate::error::Result<MutationReport> {
        self.check_platform()?;
        let reader = match self.reader() {
            Ok(reader) => Some(reader),
            Err(e) => {
                logging::log_warning(&format!("verification unavailable: {e}"));
                None
            }
        };
        let bridge = Bridge::from_config(&self.config, self.runner.as_ref(), reader.as_deref());
        mutate(&bridge)
    }
}

fn to_mcp_error(e: BridgeError) -> McpError {
    match e {
        BridgeError::InvalidParameter(_) | BridgeError::AuthTokenMissing => {
            McpError::invalid_params(e.to_string(), None)
        }
        _ => McpError::internal_error(e.to_string(), None),
    }
}

fn report_result(
    report: crate::error::Result<MutationReport>,
) -> std::result::Result<CallToolResult, McpError> {
    let report = report.map_err(to_mcp_error)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Run `body`, logging the call under `name`.
fn logged(
    name: &'static str,
    body: impl FnOnce() -> std::result::Result<CallToolResult, McpError>,
) -> std::result::Result<CallToolResult, McpError> {
    let mut guard = ToolCallGuard::new(name);
    let result = body();
    if let Err(e) = &result {
        guard.mark_error();
        logging::log_error(&format!("{name}: {}", e.message));
    }
    result
}

// Tool input schemas

/// Input for reading the summary.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetSummaryInput {
    /// `text` (default) or `json`.
    pub format: Option<SummaryFormat>,
    /// Only items in this state: open, completed or canceled.
    pub status: Option<String>,
    /// Only items in the area with this name.
    pub area: Option<String>,
    /// Only items carrying all of these tags.
    pub tags: Option<Vec<String>>,
    /// Only this project and its tasks.
    pub project: Option<String>,
    /// Earliest creation, start or deadline date (YYYY-MM-DD).
    pub from: Option<String>,
    /// Latest creation, start or deadline date (YYYY-MM-DD).
    pub to: Option<String>,
    /// Include completed and canceled items.
    #[serde(default)]
    pub include_completed: bool,
    /// Include trashed items.
    #[serde(default)]
    pub include_trash: bool,
    /// Keep areas and tags with no matching items.
    #[serde(default)]
    pub include_inactive: bool,
}

impl GetSummaryInput {
    /// The summary filter described by this input.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown status or a malformed date.
    pub fn filter(&self) -> crate::error::Result<SummaryFilter> {
        Ok(SummaryFilter {
            status: parse_status_param(self.status.as_deref())?,
            area: non_blank(self.area.as_ref()),
            tags: self.tags.as_deref().map(non_blank_all).unwrap_or_default(),
            project: non_blank(self.project.as_ref()),
            from: parse_date_param("from", self.from.as_deref())?,
            to: parse_date_param("to", self.to.as_deref())?,
            include_completed: self.include_completed,
            include_trash: self.include_trash,
            include_inactive: self.include_inactive,
        })
    }
}

/// Input naming one item.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ItemIdInput {
    /// Item id.
    pub id: String,
}

/// Input for updating an item.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateInput {
    /// Item id.
    pub id: String,
    /// Fields to change.
    #[serde(flatten)]
    pub changes: ChangeSet,
}

/// Input for deleting an item.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteInput {
    /// Item id.
    pub id: String,
    /// `to-do` or `project`; looked up when omitted.
    pub kind: Option<ItemKind>,
}

// Tool implementations

#[tool(tool_box)]
impl ThingsServer {
    /// Read the hierarchical summary.
    #[tool(description = "Summarize Things: areas, projects, inbox, today and tags, with optional filters")]
    fn get_summary(
        &self,
        #[tool(aggr)] input: GetSummaryInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("get_summary", || {
            let filter = input.filter().map_err(to_mcp_error)?;
            let reader = self.reader().map_err(to_mcp_error)?;
            let today = chrono::Local::now().date_naive();
            let summary = assemble(reader.as_ref(), &filter, today);
            let text = render_summary(&summary, input.format.unwrap_or_default())
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        })
    }

    /// Read one item.
    #[tool(description = "Get a to-do or project by id, with its tags and (for projects) tasks")]
    fn get_item(
        &self,
        #[tool(aggr)] input: ItemIdInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("get_item", || {
            let id = validate_id(&input.id).map_err(to_mcp_error)?;
            let reader = self.reader().map_err(to_mcp_error)?;
            match lookup(reader.as_ref(), id) {
                Some(item) => {
                    let json = render_item(&item)
                        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
                    Ok(CallToolResult::success(vec![Content::text(json)]))
                }
                None => Ok(CallToolResult::success(vec![Content::text(format!(
                    "Item not found: {id}"
                ))])),
            }
        })
    }

    /// Create a to-do.
    #[tool(description = "Create a to-do (no token needed)")]
    fn add_todo(&self, #[tool(aggr)] input: NewTodo) -> std::result::Result<CallToolResult, McpError> {
        logged("add_todo", || report_result(self.mutate(|bridge| bridge.create_todo(&input))))
    }

    /// Create a project.
    #[tool(description = "Create a project, optionally with to-dos (no token needed)")]
    fn add_project(
        &self,
        #[tool(aggr)] input: NewProject,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("add_project", || report_result(self.mutate(|bridge| bridge.create_project(&input))))
    }

    /// Update a to-do.
    #[tool(description = "Update a to-do: title, notes, dates, tags, checklist, list, heading, or complete/cancel it (token needed)")]
    fn update_todo(
        &self,
        #[tool(aggr)] input: UpdateInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("update_todo", || {
            let target = Target::todo(input.id.clone());
            report_result(self.mutate(|bridge| bridge.update(&target, &input.changes)))
        })
    }

    /// Update a project.
    #[tool(description = "Update a project: title, notes, dates, tags, area, or complete/cancel it (token needed)")]
    fn update_project(
        &self,
        #[tool(aggr)] input: UpdateInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("update_project", || {
            let target = Target::project(input.id.clone());
            report_result(self.mutate(|bridge| bridge.update(&target, &input.changes)))
        })
    }

    /// Move an item to the trash.
    #[tool(description = "Move a to-do or project to the trash (token needed)")]
    fn delete_item(
        &self,
        #[tool(aggr)] input: DeleteInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("delete_item", || {
            let kind = match input.kind {
                Some(kind) => kind,
                None => self.kind_of(&input.id),
            };
            let target = Target { id: input.id.clone(), kind };
            report_result(self.mutate(|bridge| bridge.delete(&target)))
        })
    }

    /// Reveal an item in the Things window.
    #[tool(description = "Show a to-do, project or area in the Things window")]
    fn show_item(
        &self,
        #[tool(aggr)] input: ItemIdInput,
    ) -> std::result::Result<CallToolResult, McpError> {
        logged("show_item", || report_result(self.mutate(|bridge| bridge.show(&input.id))))
    }
}

impl ThingsServer {
    /// The kind of `id` according to the database, defaulting to a to-do.
    fn kind_of(&self, id: &str) -> ItemKind {
        let Ok(id) = validate_id(id) else {
            return ItemKind::Todo;
        };
        match self.reader().ok().and_then(|reader| lookup(reader.as_ref(), id)) {
            Some(item) if item.kind == Kind::Project => ItemKind::Project,
            _ => ItemKind::Todo,
        }
    }
}

#[rmcp::tool(tool_box)]
impl rmcp::ServerHandler for ThingsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "things-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}
