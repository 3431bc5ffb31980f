//! Template loading and rendering using Tera.
//!
//! Text output (summaries, mutation reports) is rendered from templates.
//! Defaults are embedded in the binary; a `*.tera` file of the same name in
//! the override directory (`~/.things-bridge/templates/` unless told
//! otherwise) replaces the embedded one.

use crate::error::{Error, Result};
use crate::paths;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tera::{Context, Tera};

/// Embedded default templates.
static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("macros.tera", include_str!("../templates/macros.tera"));
    m.insert("summary.tera", include_str!("../templates/summary.tera"));
    m.insert("report.tera", include_str!("../templates/report.tera"));
    m
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Read every `*.tera` file directly inside `dir`, keyed by file name.
fn read_overrides(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut overrides = Vec::new();
    if !dir.is_dir() {
        return Ok(overrides);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tera") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            overrides.push((name.to_string(), std::fs::read_to_string(&path)?));
        }
    }
    Ok(overrides)
}

/// Initialize the template engine, applying overrides from `templates_dir`.
///
/// With `None`, the default override directory is used. A missing directory
/// simply means the embedded templates are used as they are.
///
/// # Errors
///
/// Returns an error if an override cannot be read or any template fails to
/// parse.
pub fn init_templates(templates_dir: Option<&Path>) -> Result<()> {
    let dir: Option<PathBuf> =
        templates_dir.map(Path::to_path_buf).or_else(paths::templates_dir);

    let mut sources: HashMap<String, String> = EMBEDDED_TEMPLATES
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = &dir {
        sources.extend(read_overrides(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources).map_err(|e| {
        let origin = dir.as_ref().map_or_else(|| "<embedded>".to_string(), |d| d.display().to_string());
        Error::Template(format!("Failed to load templates from {origin}: {e}"))
    })?;

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);

    Ok(())
}

/// Render a template with the given context.
///
/// Templates are loaded on first use.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();

    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    let rendered = tera
        .render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))?;
    drop(guard);

    Ok(rendered)
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Names of all embedded templates.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn report_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("action", "update");
        ctx.insert("id", "T1");
        ctx.insert("dispatched", &vec!["things:///update?id=T1"]);
        ctx.insert("state", "verified");
        ctx.insert("detail", &None::<String>);
        ctx
    }

    #[test]
    #[serial_test::serial]
    fn test_embedded_templates_without_override_dir() {
        reset_cache().unwrap();
        init_templates(Some(Path::new("/nonexistent"))).unwrap();

        let result = render("report.tera", &report_context()).unwrap();
        assert!(result.starts_with("update T1: sent 1 command(s)"), "{result}");
        assert!(result.contains("verification: verified"));
    }

    #[test]
    #[serial_test::serial]
    fn test_filesystem_templates_override_embedded() {
        reset_cache().unwrap();

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.tera"), "CUSTOM: {{ action }}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        init_templates(Some(dir.path())).unwrap();

        assert_eq!(render("report.tera", &report_context()).unwrap(), "CUSTOM: update");
        reset_cache().unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn test_render_missing_template_fails() {
        reset_cache().unwrap();
        init_templates(Some(Path::new("/nonexistent"))).unwrap();

        assert!(render("nonexistent.tera", &Context::new()).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_lazy_init() {
        reset_cache().unwrap();
        let result = render("report.tera", &report_context()).unwrap();
        assert!(result.contains("things:///update?id=T1"));
    }

    #[test]
    #[serial_test::serial]
    fn test_init_with_invalid_templates_fails() {
        reset_cache().unwrap();

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("invalid.tera"), "{% if foo %}unclosed if tag without endif")
            .unwrap();

        let err = init_templates(Some(dir.path())).unwrap_err().to_string();
        assert!(err.contains("Failed to load templates"), "Error was: {err}");
        reset_cache().unwrap();
    }

    #[test]
    fn test_embedded_template_names() {
        let mut names = embedded_template_names();
        names.sort_unstable();
        assert_eq!(names, vec!["macros.tera", "report.tera", "summary.tera"]);
    }
}
