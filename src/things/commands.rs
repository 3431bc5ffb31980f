//! Commands understood by the Things write channels.
//!
//! Things cannot be written to through its database. Every change is a
//! command handed to the application:
//!
//! - [`UrlCommand`]: `things:///<command>?<params>`, one parameter per field.
//! - [`JsonOperation`]: `things:///json?auth-token=..&data=[..]`, used for
//!   state transitions.
//! - [`WriteCommand::Script`]: an AppleScript snippet, used for deletion,
//!   which neither URL form supports.
//!
//! Nothing here spawns processes; see [`super::dispatch`] for that.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Prefix of every Things URL.
pub const URL_SCHEME: &str = "things:///";

/// Query parameter carrying the authorization token.
pub const AUTH_TOKEN_PARAM: &str = "auth-token";

/// Joiner for tag lists.
pub const TAG_SEPARATOR: &str = ",";

/// Joiner for checklist items and project to-dos.
pub const LINE_SEPARATOR: &str = "\n";

const REDACTED: &str = "***";

/// The kind of item a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
pub enum ItemKind {
    /// A to-do.
    #[serde(rename = "to-do", alias = "todo")]
    Todo,
    /// A project.
    #[serde(rename = "project")]
    Project,
}

impl ItemKind {
    /// The name Things uses for this kind in JSON operations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "to-do",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `things:///<command>` URL under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCommand {
    /// Path component, e.g. `update`.
    pub command: String,
    /// Parameters in emission order.
    pub params: Vec<(String, String)>,
}

impl UrlCommand {
    /// A command with no parameters yet.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), params: Vec::new() }
    }

    /// Append a parameter.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.params.push((key.to_string(), value.into()));
    }

    /// Append a parameter if present.
    pub fn push_opt(&mut self, key: &str, value: Option<&String>) {
        if let Some(value) = value {
            self.push(key, value.clone());
        }
    }

    /// Append a list parameter joined with `separator`, if present.
    pub fn push_list(&mut self, key: &str, values: Option<&Vec<String>>, separator: &str) {
        if let Some(values) = values {
            self.push(key, values.join(separator));
        }
    }

    /// Append `key=true` when `flag` is set.
    pub fn push_flag(&mut self, key: &str, flag: bool) {
        if flag {
            self.push(key, "true");
        }
    }

    /// Look up a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Whether only bookkeeping parameters (`id`, `auth-token`) are set.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.params.iter().any(|(k, _)| k != "id" && k != AUTH_TOKEN_PARAM)
    }

    fn render(&self, redact: bool) -> String {
        if self.params.is_empty() {
            return format!("{URL_SCHEME}{}", self.command);
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| {
                let value = if redact && k == AUTH_TOKEN_PARAM { REDACTED } else { v.as_str() };
                format!("{}={}", urlencoding::encode(k), urlencoding::encode(value))
            })
            .collect();
        format!("{URL_SCHEME}{}?{}", self.command, query.join("&"))
    }

    /// The percent-encoded URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.render(false)
    }
}

/// One entry of a `things:///json` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOperation {
    /// Target kind.
    pub kind: ItemKind,
    /// `update` or `create`.
    pub operation: String,
    /// Target id for updates.
    pub id: Option<String>,
    /// Attributes to set.
    pub attributes: Map<String, Value>,
    /// Token for operations on existing items.
    pub auth_token: Option<String>,
}

impl JsonOperation {
    /// An update of an existing item.
    #[must_use]
    pub fn update(kind: ItemKind, id: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            kind,
            operation: "update".to_string(),
            id: Some(id.into()),
            attributes: Map::new(),
            auth_token: Some(auth_token.into()),
        }
    }

    /// The operation object as Things expects it.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut op = json!({
            "type": self.kind.as_str(),
            "operation": self.operation,
            "attributes": self.attributes,
        });
        if let (Some(id), Some(obj)) = (&self.id, op.as_object_mut()) {
            obj.insert("id".to_string(), Value::String(id.clone()));
        }
        op
    }

    fn url_command(&self, redact: bool) -> UrlCommand {
        let mut cmd = UrlCommand::new("json");
        if let Some(token) = &self.auth_token {
            cmd.push(AUTH_TOKEN_PARAM, if redact { REDACTED } else { token.as_str() });
        }
        cmd.push("data", Value::Array(vec![self.to_value()]).to_string());
        cmd
    }

    /// The percent-encoded `things:///json` URL.
    #[must_use]
    pub fn url(&self) -> String {
        self.url_command(false).url()
    }
}

/// A command for one of the write channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    /// URL-scheme command.
    Url(UrlCommand),
    /// JSON operation.
    Json(JsonOperation),
    /// AppleScript source run with `osascript`.
    Script(String),
}

impl WriteCommand {
    /// A loggable description with any token redacted.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Url(cmd) => cmd.render(true),
            Self::Json(op) => op.url_command(true).render(false),
            Self::Script(source) => format!("osascript: {source}"),
        }
    }
}

/// AppleScript moving an item to the trash.
#[must_use]
pub fn delete_script(kind: ItemKind, id: &str) -> String {
    let class = match kind {
        ItemKind::Todo => "to do",
        ItemKind::Project => "project",
    };
    format!("tell application \"Things3\" to delete {class} id \"{id}\"")
}
