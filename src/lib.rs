//! # `things_bridge`
//!
//! Read and command the Things 3 task manager: a hierarchical summary built
//! from its database, and changes sent through its URL scheme with
//! read-after-write verification.

#[cfg(feature = "cli")]
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod paths;
pub mod templates;
pub mod testing;
pub mod things;
pub mod traits;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
