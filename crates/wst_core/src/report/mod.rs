//! Result collection and presentation.
//!
//! A `Report` holds outcomes in arrival order until a tool asks for a
//! specific order. It never re-runs or drops anything: what the runner
//! returned is what gets printed.

use std::io::{self, Write};

use crate::process::{Outcome, Status};

/// Process exit codes shared by every subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Completed, or nothing to do.
    Success,
    /// Missing program, missing/invalid config, or no input.
    Precondition,
    /// At least one item failed; all items were attempted.
    ItemFailures,
    /// Bad argument value.
    InvalidArgument,
}

impl RunExit {
    pub fn code(self) -> u8 {
        match self {
            RunExit::Success => 0,
            RunExit::Precondition => 1,
            RunExit::ItemFailures => 2,
            RunExit::InvalidArgument => 3,
        }
    }
}

impl From<RunExit> for std::process::ExitCode {
    fn from(exit: RunExit) -> Self {
        std::process::ExitCode::from(exit.code())
    }
}

/// Outcomes of one run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Items that ran and exited 0.
    pub fn successes(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status().code() == Some(0))
    }

    pub fn dry_runs(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status(), Status::DryRun))
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(Outcome::is_failure)
    }

    /// Stable sort by an arbitrary key.
    pub fn sort_by_key<K, F>(&mut self, key: F)
    where
        K: Ord,
        F: FnMut(&Outcome) -> K,
    {
        self.outcomes.sort_by_key(key);
    }

    /// Stable sort by a timestamp, oldest first.
    ///
    /// Outcomes without a timestamp go last, in their current order.
    pub fn sort_by_time<F>(&mut self, mut time: F)
    where
        F: FnMut(&Outcome) -> Option<i64>,
    {
        self.outcomes.sort_by_key(|o| {
            let t = time(o);
            (t.is_none(), t)
        });
    }

    /// `N items, S ok, F failed, D dry-run`
    pub fn summary(&self) -> String {
        format!(
            "{} items, {} ok, {} failed, {} dry-run",
            self.len(),
            self.successes().count(),
            self.failures().count(),
            self.dry_runs().count()
        )
    }

    pub fn exit_code(&self) -> RunExit {
        if self.has_failures() {
            RunExit::ItemFailures
        } else {
            RunExit::Success
        }
    }

    /// Write each outcome `render` returns a line for, then the summary.
    pub fn write_with<W, F>(&self, out: &mut W, mut render: F) -> io::Result<()>
    where
        W: Write,
        F: FnMut(&Outcome) -> Option<String>,
    {
        for line in self.outcomes.iter().filter_map(&mut render) {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "{}", self.summary())
    }
}

/// `item: status`, with the would-be commands for dry runs and the
/// stderr tail (indented) for failures.
pub fn render_line(outcome: &Outcome) -> String {
    let item = outcome.item();

    let mut line = match outcome.status() {
        Status::DryRun if outcome.commands().is_empty() => format!("{}: dry-run", item),
        Status::DryRun => outcome
            .commands()
            .iter()
            .map(|cmd| format!("{}: would run: {}", item, cmd))
            .collect::<Vec<_>>()
            .join("\n"),
        status => format!("{}: {}", item, status),
    };

    if outcome.is_failure() {
        for tail in outcome.stderr_tail() {
            line.push_str("\n    ");
            line.push_str(tail);
        }
    }
    line
}
