//! File logging for the bridge.
//!
//! Stdout belongs to the MCP transport, so log lines go to a file
//! (`~/.things-bridge/things-mcp.log` by default). Every function here is a
//! no-op until [`init`] has been called, which lets library code log
//! unconditionally.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Maximum log file size before rotation (1MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Global log file handle.
static LOG_FILE: Mutex<Option<File>> = Mutex::new(None);

/// Open `path` for appending and route all log calls to it.
///
/// An existing file larger than 1MB is moved aside to `*.log.old` first.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::metadata(path).is_ok_and(|m| m.len() > MAX_LOG_SIZE) {
        let _ = fs::rename(path, path.with_extension("log.old"));
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    log_event("things-bridge logging started");
    Ok(())
}

/// Write a log entry.
fn write_log(message: &str) {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            let ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
            let _ = writeln!(file, "[{ts}] {message}");
            let _ = file.flush();
        }
    }
}

/// Log a general event.
pub fn log_event(message: &str) {
    write_log(&format!("EVENT: {message}"));
}

/// Log a tool call start.
pub fn log_tool_start(tool_name: &str) {
    write_log(&format!("TOOL_START: {tool_name}"));
}

/// Log a tool call completion with duration.
pub fn log_tool_end(tool_name: &str, duration_ms: u128, success: bool) {
    let status = if success { "OK" } else { "ERROR" };
    write_log(&format!("TOOL_END: {tool_name} ({duration_ms}ms) [{status}]"));
}

/// Log an error.
pub fn log_error(message: &str) {
    write_log(&format!("ERROR: {message}"));
}

/// Log a warning.
pub fn log_warning(message: &str) {
    write_log(&format!("WARN: {message}"));
}

/// Log server shutdown.
pub fn log_shutdown(exit_code: Option<i32>) {
    match exit_code {
        Some(code) => write_log(&format!("SHUTDOWN: exit code {code}")),
        None => write_log("SHUTDOWN: normal"),
    }
}

#[allow(deprecated)] // PanicInfo is deprecated but PanicHookInfo requires Rust 1.81+
fn log_panic(info: &panic::PanicInfo<'_>) {
    let location = info.location().map_or_else(
        || "unknown".to_string(),
        |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
    );
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    write_log(&format!("PANIC at {location}: {payload}"));
}

/// Install a panic hook that records panics in the log before delegating to
/// the previous hook.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        original_hook(info);
    }));
}

/// Logs a tool call's duration and outcome when dropped.
pub struct ToolCallGuard {
    tool_name: &'static str,
    start: Instant,
    success: bool,
}

impl ToolCallGuard {
    /// Log the start of `tool_name`.
    #[must_use]
    pub fn new(tool_name: &'static str) -> Self {
        log_tool_start(tool_name);
        Self { tool_name, start: Instant::now(), success: true }
    }

    /// Mark the tool call as failed.
    pub fn mark_error(&mut self) {
        self.success = false;
    }
}

impl Drop for ToolCallGuard {
    fn drop(&mut self) {
        log_tool_end(self.tool_name, self.start.elapsed().as_millis(), self.success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join("bridge.log")).unwrap()
    }

    #[serial_test::serial]
    #[test]
    fn test_init_creates_nested_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bridge.log");
        init(&path).unwrap();
        assert!(path.exists());
    }

    #[serial_test::serial]
    #[test]
    fn test_levels_are_prefixed() {
        let dir = TempDir::new().unwrap();
        init(&dir.path().join("bridge.log")).unwrap();

        log_event("an event");
        log_warning("a warning");
        log_error("an error");
        log_shutdown(Some(3));

        let content = read(&dir);
        assert!(content.contains("EVENT: an event"));
        assert!(content.contains("WARN: a warning"));
        assert!(content.contains("ERROR: an error"));
        assert!(content.contains("SHUTDOWN: exit code 3"));
    }

    #[serial_test::serial]
    #[test]
    fn test_tool_call_guard() {
        let dir = TempDir::new().unwrap();
        init(&dir.path().join("bridge.log")).unwrap();

        {
            let _ok = ToolCallGuard::new("get_summary");
        }
        {
            let mut failed = ToolCallGuard::new("update_todo");
            failed.mark_error();
        }

        let content = read(&dir);
        assert!(content.contains("TOOL_START: get_summary"));
        assert!(content.contains("TOOL_END: get_summary"));
        assert!(content.contains("[OK]"));
        assert!(content.contains("TOOL_END: update_todo"));
        assert!(content.contains("[ERROR]"));
    }

    #[serial_test::serial]
    #[test]
    fn test_log_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.log");
        let size = usize::try_from(MAX_LOG_SIZE + 1).unwrap();
        fs::write(&path, "x".repeat(size)).unwrap();

        init(&path).unwrap();

        assert!(path.with_extension("log.old").exists());
        assert!(fs::metadata(&path).unwrap().len() < MAX_LOG_SIZE);
    }

    #[serial_test::serial]
    #[test]
    fn test_panic_hook_records_payload() {
        let dir = TempDir::new().unwrap();
        init(&dir.path().join("bridge.log")).unwrap();
        install_panic_hook();

        let _ = std::panic::catch_unwind(|| {
            panic!("boom in tool");
        });
        let _ = panic::take_hook();

        let content = read(&dir);
        assert!(content.contains("PANIC at"));
        assert!(content.contains("boom in tool"));
    }
}
