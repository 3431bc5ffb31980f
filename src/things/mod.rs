//! Bridge to the Things 3 task manager.
//!
//! Reads go straight to the application's SQLite database (read-only);
//! writes go through the application's URL scheme and AppleScript, and are
//! then optionally checked against the database.
//!
//! Read path: [`locator`] → [`query`] → [`rows`] → [`summary`] →
//! [`compress`] / [`render`].
//!
//! Write path: [`router`] → [`commands`] → [`dispatch`] → [`verify`], wrapped
//! by [`bridge::Bridge`].

pub mod bridge;
pub mod commands;
pub mod compress;
pub mod dates;
pub mod dispatch;
pub mod ids;
pub mod locator;
pub mod query;
pub mod render;
pub mod router;
pub mod rows;
pub mod summary;
pub mod verify;

pub use bridge::{Bridge, MutationReport, Verification};
pub use commands::{ItemKind, WriteCommand};
pub use render::SummaryFormat;
pub use router::{ChangeSet, NewProject, NewTodo, Target};
pub use rows::{Kind, Status};
pub use summary::{assemble, lookup, Summary, SummaryFilter};
