//! Outcome of processing one work item.

use std::time::Duration;

use crate::work::WorkItem;

/// How a work item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The external program ran and exited with this code.
    Exited(i32),
    /// The external program ran; its stdout was captured.
    Captured { code: i32, stdout: String },
    /// Nothing was spawned; the would-be commands are on the outcome.
    DryRun,
    /// The item could not be processed at all.
    Error(String),
}

impl Status {
    /// Exit code, if a program ran.
    pub fn code(&self) -> Option<i32> {
        match self {
            Status::Exited(code) | Status::Captured { code, .. } => Some(*code),
            Status::DryRun | Status::Error(_) => None,
        }
    }

    /// Captured stdout, if any.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Status::Captured { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    /// Nonzero exit or error.
    pub fn is_failure(&self) -> bool {
        match self {
            Status::Exited(code) | Status::Captured { code, .. } => *code != 0,
            Status::Error(_) => true,
            Status::DryRun => false,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Exited(0) | Status::Captured { code: 0, .. } => write!(f, "ok"),
            Status::Exited(code) | Status::Captured { code, .. } => write!(f, "exit {}", code),
            Status::DryRun => write!(f, "dry-run"),
            Status::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// A work item paired with how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    item: WorkItem,
    status: Status,
    commands: Vec<String>,
    stderr_tail: Vec<String>,
    elapsed: Duration,
}

impl Outcome {
    /// Create an outcome with no command record.
    pub fn new(item: WorkItem, status: Status) -> Self {
        Self {
            item,
            status,
            commands: Vec::new(),
            stderr_tail: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Replace the status, keeping the rest of the record.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Record the commands that ran (or would have run).
    pub fn with_commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    /// Record the last stderr lines of a failed run.
    pub fn with_stderr_tail(mut self, tail: Vec<String>) -> Self {
        self.stderr_tail = tail;
        self
    }

    /// Record wall-clock time spent on the item.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn stderr_tail(&self) -> &[String] {
        &self.stderr_tail
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classification() {
        assert!(!Status::Exited(0).is_failure());
        assert!(Status::Exited(1).is_failure());
        assert!(Status::Captured {
            code: 2,
            stdout: String::new()
        }
        .is_failure());
        assert!(Status::Error("spawn".into()).is_failure());
        assert!(!Status::DryRun.is_failure());
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Exited(0).to_string(), "ok");
        assert_eq!(Status::Exited(3).to_string(), "exit 3");
        assert_eq!(Status::Error("timeout".into()).to_string(), "error: timeout");
    }

    #[test]
    fn code_and_stdout_accessors() {
        let status = Status::Captured {
            code: 0,
            stdout: "1700000000\n".into(),
        };
        assert_eq!(status.code(), Some(0));
        assert_eq!(status.stdout(), Some("1700000000\n"));
        assert_eq!(Status::DryRun.code(), None);
    }
}
