//! Item identifier validation.
//!
//! Identifiers end up inside SQL literals, URL parameters and AppleScript
//! strings, so anything outside the alphabet Things uses is refused up front.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{1,64}$").expect("identifier pattern is valid"));

/// Return the trimmed identifier if it is well formed.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for empty or suspicious identifiers.
pub fn validate_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if ID_PATTERN.is_match(id) {
        Ok(id)
    } else {
        Err(Error::InvalidParameter(format!("not a Things item id: {id:?}")))
    }
}
