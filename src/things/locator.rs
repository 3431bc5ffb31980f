//! Discovery of the Things database file.
//!
//! Things keeps its store inside a macOS group container:
//!
//! ```text
//! ~/Library/Group Containers/
//!     JLMPQHK86H.com.culturedcode.ThingsMac/
//!         ThingsData-XXXXX/
//!             Things Database.thingsdatabase/main.sqlite
//! ```
//!
//! Each level that can be missing has its own error so the user learns
//! whether Things was never installed, never launched, or is mid-setup.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Group container root, relative to the home directory.
pub const CONTAINER_ROOT: &str = "Library/Group Containers";

/// Fragment identifying the Things container directory.
pub const BUNDLE_FRAGMENT: &str = "JLMPQHK86H.com.culturedcode.ThingsMac";

/// Prefix of the data directory inside the container.
pub const DATA_DIR_PREFIX: &str = "ThingsData-";

/// Database file, relative to the data directory.
pub const DATABASE_RELATIVE_PATH: &str = "Things Database.thingsdatabase/main.sqlite";

/// Fail unless running on macOS.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPlatform`] everywhere else.
pub fn ensure_supported_platform() -> Result<()> {
    if cfg!(target_os = "macos") {
        Ok(())
    } else {
        Err(Error::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}

/// Locate the database under the current user's home directory.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or any stage of
/// [`locate_in`] fails.
pub fn locate() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::HomeDirNotFound)?;
    locate_in(&home)
}

/// Locate the database under `home`.
///
/// # Errors
///
/// Returns a distinct error for a missing container root, Things container,
/// data directory or database file.
pub fn locate_in(home: &Path) -> Result<PathBuf> {
    let root = home.join(CONTAINER_ROOT);
    if !root.is_dir() {
        return Err(Error::ContainerRootNotFound(root));
    }

    let container = find_child_dir(&root, |name| name.contains(BUNDLE_FRAGMENT))?
        .ok_or_else(|| Error::ContainerNotFound(root.clone()))?;

    let data_dir = find_child_dir(&container, |name| name.starts_with(DATA_DIR_PREFIX))?
        .ok_or_else(|| Error::DataDirNotFound(container.clone()))?;

    let database = data_dir.join(DATABASE_RELATIVE_PATH);
    if !database.is_file() {
        return Err(Error::DatabaseNotFound(database));
    }
    Ok(database)
}

/// Check an explicitly configured database path.
///
/// # Errors
///
/// Returns [`Error::DatabaseNotFound`] if the file does not exist.
pub fn check_explicit(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::DatabaseNotFound(path.to_path_buf()))
    }
}

/// First immediate subdirectory of `parent` whose name satisfies `matches`,
/// in name order so the choice is stable.
fn find_child_dir(parent: &Path, matches: impl Fn(&str) -> bool) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(parent)?
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|entry| entry.file_name().to_str().is_some_and(&matches))
        .map(|entry| entry.path())
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}
