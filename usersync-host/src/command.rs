//! External command execution.
//!
//! [`CommandRunner`] is the seam between [`crate::SystemStore`] and the
//! process table, so the store's argument lists can be checked without root.

use std::process::Command;

use usersync_core::StoreError;

/// Exit status and captured output of one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`StoreError::Command`].
    pub fn check(self, command: &str) -> Result<CommandOutput, StoreError> {
        if self.success() {
            return Ok(self);
        }
        Err(StoreError::Command {
            command: command.to_string(),
            status: self.status(),
            stderr: self.stderr.trim().to_string(),
        })
    }

    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner {
    /// Run `program` with `args` to completion. Only a failure to spawn is an
    /// error here; the exit status is the caller's to interpret.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, StoreError>;
}

/// Runs commands on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, StoreError> {
        let rendered = render(program, args);
        tracing::debug!(command = %rendered, "running");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| StoreError::Spawn {
                command: rendered,
                source: e,
            })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `program arg1 arg2`, for logs and error messages.
pub fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
