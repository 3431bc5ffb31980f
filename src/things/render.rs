//! Text and JSON renderings of summaries, items and mutation reports.

use super::bridge::MutationReport;
use super::compress::compress_object;
use super::summary::{ItemView, Summary};
use crate::error::{Error, Result};
use crate::templates;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tera::Context;

/// How a summary is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "mcp", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    /// Indented outline for people.
    #[default]
    Text,
    /// The compressed JSON tree.
    Json,
}

impl FromStr for SummaryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidParameter(format!("unknown format: {other}"))),
        }
    }
}

/// Render `summary` in `format`.
///
/// # Errors
///
/// Returns an error if serialization or template rendering fails.
pub fn render_summary(summary: &Summary, format: SummaryFormat) -> Result<String> {
    match format {
        SummaryFormat::Json => Ok(serde_json::to_string_pretty(&summary.to_json()?)?),
        SummaryFormat::Text => {
            let loose_projects: Vec<&ItemView> =
                summary.projects.iter().filter(|p| p.area.is_none()).collect();
            let empty = summary.areas.is_empty()
                && summary.inbox_tasks.is_empty()
                && summary.today_tasks.is_empty()
                && summary.projects.is_empty()
                && summary.tasks.is_empty()
                && summary.tags.is_empty();

            let mut ctx = Context::new();
            ctx.insert("summary", summary);
            ctx.insert("loose_projects", &loose_projects);
            ctx.insert("empty", &empty);
            templates::render("summary.tera", &ctx)
        }
    }
}

/// Render one item as compressed, pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_item(item: &ItemView) -> Result<String> {
    Ok(serde_json::to_string_pretty(&compress_object(serde_json::to_value(item)?))?)
}

/// Render a mutation report as text.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_report(report: &MutationReport) -> Result<String> {
    let mut ctx = Context::new();
    ctx.insert("action", &report.action);
    ctx.insert("id", &report.id);
    ctx.insert("dispatched", &report.dispatched);
    ctx.insert("state", report.verification.state());
    ctx.insert("detail", &report.verification.detail());
    templates::render("report.tera", &ctx)
}
