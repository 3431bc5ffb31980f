//! The write path: route, dispatch, verify.

use super::commands::WriteCommand;
use super::dispatch::Dispatcher;
use super::rows::{Kind, Status};
use super::router::{self, ChangeSet, NewProject, NewTodo, Target};
use super::verify::{Verifier, COMPLETION_WAIT, DEFAULT_WAIT};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::logging;
use crate::traits::{CommandRunner, RowSource};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

/// Outcome of the read-after-write check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum Verification {
    /// The database shows the change.
    Verified,
    /// Dispatched, but the database did not show the change within the wait.
    Unverified(String),
    /// No check was made.
    Skipped,
}

impl Verification {
    /// Lowercase state name.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Unverified(_) => "unverified",
            Self::Skipped => "skipped",
        }
    }

    /// Reason for an unverified result.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unverified(reason) => Some(reason),
            _ => None,
        }
    }
}

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// `add`, `add-project`, `update`, `delete` or `show`.
    pub action: String,
    /// Target id; for creations, the id found by verification.
    pub id: Option<String>,
    /// Delivered commands, tokens redacted.
    pub dispatched: Vec<String>,
    /// Read-after-write outcome.
    pub verification: Verification,
}

/// Entry point for every change made to Things.
pub struct Bridge<'a> {
    dispatcher: Dispatcher<'a>,
    source: Option<&'a dyn RowSource>,
    auth_token: Option<String>,
    verify_wait: Duration,
    completion_wait: Duration,
}

impl<'a> Bridge<'a> {
    /// A bridge that dispatches through `dispatcher` and does not verify.
    #[must_use]
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self {
            dispatcher,
            source: None,
            auth_token: None,
            verify_wait: DEFAULT_WAIT,
            completion_wait: COMPLETION_WAIT,
        }
    }

    /// Build from configuration, verifying through `source` when given.
    #[must_use]
    pub fn from_config(
        config: &BridgeConfig,
        runner: &'a dyn CommandRunner,
        source: Option<&'a dyn RowSource>,
    ) -> Self {
        let dispatcher = Dispatcher::new(runner)
            .with_opener(config.opener_binary.clone())
            .with_timeout(config.process_timeout());
        let mut bridge = Self::new(dispatcher)
            .with_auth_token(config.token().map(str::to_string))
            .with_waits(config.verify_wait(), config.completion_wait());
        bridge.source = source;
        bridge
    }

    /// Verify through `source`.
    #[must_use]
    pub fn with_source(mut self, source: &'a dyn RowSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Use `token` for changes to existing items.
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    /// Waits before verifying edits and state transitions.
    #[must_use]
    pub const fn with_waits(mut self, verify: Duration, completion: Duration) -> Self {
        self.verify_wait = verify;
        self.completion_wait = completion;
        self
    }

    fn dispatch(&self, commands: &[WriteCommand]) -> Result<Vec<String>> {
        self.dispatcher.dispatch_all(commands)
    }

    fn check(&self, passed: impl FnOnce(&Verifier<'_>) -> bool, what: &str) -> Verification {
        let Some(source) = self.source else {
            return Verification::Skipped;
        };
        if passed(&Verifier::new(source)) {
            Verification::Verified
        } else {
            logging::log_warning(&format!("unverified: {what}"));
            Verification::Unverified(format!(
                "{what} not visible in the database yet; check again with a longer wait"
            ))
        }
    }

    /// Apply `change` to an existing item.
    ///
    /// # Errors
    ///
    /// Returns an error if routing fails (missing token, bad fields) or a
    /// command cannot be delivered.
    pub fn update(&self, target: &Target, change: &ChangeSet) -> Result<MutationReport> {
        let commands = router::route(target, change, self.auth_token.as_deref())?;
        let dispatched = self.dispatch(&commands)?;

        let id = target.id.trim();
        let verification = match (change.completed, change.canceled) {
            (Some(true), _) => self.check(
                |v| v.verify_completed(id, self.completion_wait),
                &format!("completion of {id}"),
            ),
            (_, Some(true)) => self.check(
                |v| v.verify_status(id, Status::Canceled, self.completion_wait),
                &format!("cancellation of {id}"),
            ),
            (Some(false), _) | (_, Some(false)) => self.check(
                |v| v.verify_status(id, Status::Open, self.completion_wait),
                &format!("reopening of {id}"),
            ),
            (None, None) => self.check(
                |v| v.verify_updated(id, change.title.as_deref(), self.verify_wait),
                &format!("update of {id}"),
            ),
        };

        Ok(MutationReport {
            action: "update".to_string(),
            id: Some(id.to_string()),
            dispatched,
            verification,
        })
    }

    fn create(
        &self,
        action: &str,
        command: WriteCommand,
        title: &str,
        kind: Kind,
    ) -> Result<MutationReport> {
        let since = Utc::now();
        let dispatched = self.dispatch(&[command])?;

        let (id, verification) = match self.source {
            None => (None, Verification::Skipped),
            Some(source) => {
                match Verifier::new(source).find_created(title, kind, since, self.verify_wait) {
                    Some(row) => (Some(row.id), Verification::Verified),
                    None => {
                        logging::log_warning(&format!("unverified: creation of {title:?}"));
                        (
                            None,
                            Verification::Unverified(format!(
                                "no new item titled {title:?} yet; check again with a longer wait"
                            )),
                        )
                    }
                }
            }
        };

        Ok(MutationReport { action: action.to_string(), id, dispatched, verification })
    }

    /// Create a to-do. Needs no token.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input or a failed delivery.
    pub fn create_todo(&self, todo: &NewTodo) -> Result<MutationReport> {
        let command = router::add_todo(todo)?;
        self.create("add", command, &todo.title, Kind::Task)
    }

    /// Create a project. Needs no token.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input or a failed delivery.
    pub fn create_project(&self, project: &NewProject) -> Result<MutationReport> {
        let command = router::add_project(project)?;
        self.create("add-project", command, &project.title, Kind::Project)
    }

    /// Move an item to the trash.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is missing, the id is malformed, or
    /// the script cannot be delivered.
    pub fn delete(&self, target: &Target) -> Result<MutationReport> {
        let command = router::delete(target, self.auth_token.as_deref())?;
        let dispatched = self.dispatch(&[command])?;
        let id = target.id.trim();
        let verification = self.check(
            |v| v.verify_trashed(id, self.verify_wait),
            &format!("deletion of {} {id}", target.kind),
        );
        Ok(MutationReport {
            action: "delete".to_string(),
            id: Some(id.to_string()),
            dispatched,
            verification,
        })
    }

    /// Reveal an item in Things.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed id or a failed delivery.
    pub fn show(&self, id: &str) -> Result<MutationReport> {
        let command = router::show(id)?;
        let dispatched = self.dispatch(&[command])?;
        Ok(MutationReport {
            action: "show".to_string(),
            id: Some(id.trim().to_string()),
            dispatched,
            verification: Verification::Skipped,
        })
    }
}
