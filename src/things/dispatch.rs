//! Fire-and-forget dispatch of write commands.
//!
//! URLs are handed to `open -g`, which passes them to Things without bringing
//! it to the foreground. Scripts go to `osascript -e`. Neither reports what
//! Things did with the command; a zero exit only means it was delivered.

use super::commands::WriteCommand;
use crate::error::{Error, Result};
use crate::logging;
use crate::traits::CommandRunner;
use std::time::Duration;

/// Program that runs AppleScript.
pub const SCRIPT_RUNNER: &str = "osascript";

/// Sends [`WriteCommand`]s to Things.
pub struct Dispatcher<'a> {
    runner: &'a dyn CommandRunner,
    opener: String,
    timeout: Duration,
}

impl<'a> Dispatcher<'a> {
    /// A dispatcher using `open` with a 10s timeout per command.
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner, opener: "open".to_string(), timeout: Duration::from_secs(10) }
    }

    /// Use a different URL opener.
    #[must_use]
    pub fn with_opener(mut self, opener: impl Into<String>) -> Self {
        self.opener = opener.into();
        self
    }

    /// Bound each command by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program and arguments that deliver `command`.
    #[must_use]
    pub fn invocation(&self, command: &WriteCommand) -> (String, Vec<String>) {
        match command {
            WriteCommand::Url(url) => (self.opener.clone(), vec!["-g".to_string(), url.url()]),
            WriteCommand::Json(op) => (self.opener.clone(), vec!["-g".to_string(), op.url()]),
            WriteCommand::Script(source) => {
                (SCRIPT_RUNNER.to_string(), vec!["-e".to_string(), source.clone()])
            }
        }
    }

    /// Deliver one command.
    ///
    /// # Errors
    ///
    /// Returns an error if the delivering program cannot run or exits
    /// non-zero.
    pub fn dispatch(&self, command: &WriteCommand) -> Result<()> {
        let description = command.describe();
        let (program, args) = self.invocation(command);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        logging::log_event(&format!("dispatch: {description}"));
        let output = self.runner.run(&program, &args, Some(self.timeout))?;
        if !output.success() {
            logging::log_error(&format!(
                "dispatch failed (exit {}): {description}",
                output.exit_code
            ));
            return Err(Error::CommandFailed {
                command: format!("{program} {description}"),
                exit_code: output.exit_code,
                stderr: output.combined_output().trim().to_string(),
            });
        }
        Ok(())
    }

    /// Deliver `commands` in order, stopping at the first failure.
    ///
    /// Returns the redacted descriptions of the delivered commands.
    ///
    /// # Errors
    ///
    /// Returns the first delivery error. Commands before it stay delivered.
    pub fn dispatch_all(&self, commands: &[WriteCommand]) -> Result<Vec<String>> {
        let mut delivered = Vec::with_capacity(commands.len());
        for command in commands {
            self.dispatch(command)?;
            delivered.push(command.describe());
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCommandRunner, MockCommandRunner, RecordingCommandRunner};
    use crate::things::commands::{JsonOperation, ItemKind, UrlCommand};
    use crate::traits::CommandOutput;

    fn show(id: &str) -> WriteCommand {
        let mut url = UrlCommand::new("show");
        url.push("id", id);
        WriteCommand::Url(url)
    }

    #[test]
    fn test_url_goes_through_open_in_background() {
        let mut runner = MockCommandRunner::new();
        runner.expect("open", &["-g", "things:///show?id=T1"], CommandOutput::default());

        Dispatcher::new(&runner).dispatch(&show("T1")).unwrap();
        runner.verify();
    }

    #[test]
    fn test_script_goes_through_osascript() {
        let mut runner = MockCommandRunner::new();
        runner.expect("osascript", &["-e", "return 1"], CommandOutput::default());

        Dispatcher::new(&runner).dispatch(&WriteCommand::Script("return 1".into())).unwrap();
        runner.verify();
    }

    #[test]
    fn test_custom_opener() {
        let runner = RecordingCommandRunner::new();
        Dispatcher::new(&runner).with_opener("xdg-open").dispatch(&show("T1")).unwrap();
        assert_eq!(runner.calls()[0].0, "xdg-open");
    }

    #[test]
    fn test_dispatch_all_preserves_order_and_redacts() {
        let runner = RecordingCommandRunner::new();
        let commands =
            vec![show("T1"), WriteCommand::Json(JsonOperation::update(ItemKind::Todo, "T1", "tok"))];

        let delivered = Dispatcher::new(&runner).dispatch_all(&commands).unwrap();

        assert_eq!(delivered.len(), 2);
        assert!(delivered[1].starts_with("things:///json?auth-token=%2A%2A%2A"));
        let calls = runner.calls();
        assert!(calls[0].1[1].starts_with("things:///show"));
        assert!(calls[1].1[1].contains("auth-token=tok"));
    }

    #[test]
    fn test_non_zero_exit_is_an_error() {
        let mut runner = MockCommandRunner::new();
        runner.expect(
            "open",
            &["-g", "things:///show?id=T1"],
            CommandOutput { exit_code: 1, stdout: String::new(), stderr: "no handler".into() },
        );
        let err = Dispatcher::new(&runner).dispatch_all(&[show("T1"), show("T2")]).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { exit_code: 1, .. }), "{err}");
        runner.verify();
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let runner = FailingCommandRunner::new("no open here");
        assert!(Dispatcher::new(&runner).dispatch(&show("T1")).is_err());
    }
}
