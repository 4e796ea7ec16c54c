//! Report repositories with uncommitted or unpushed work.

use std::path::PathBuf;

use super::{item_path, BatchTool};
use crate::process::{CommandLine, Outcome, Plan, PlanError, Status};
use crate::report::render_line;
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// State of one working tree, parsed from `git status --porcelain --branch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoState {
    pub branch: String,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub changed: usize,
    pub untracked: usize,
}

impl RepoState {
    pub fn parse(porcelain: &str) -> Self {
        let mut state = RepoState::default();

        for line in porcelain.lines() {
            if let Some(header) = line.strip_prefix("## ") {
                state.parse_header(header);
            } else if line.starts_with("??") {
                state.untracked += 1;
            } else if !line.trim().is_empty() {
                state.changed += 1;
            }
        }
        state
    }

    /// `main...origin/main [ahead 1, behind 2]`
    fn parse_header(&mut self, header: &str) {
        let (refs, tracking) = match header.split_once(" [") {
            Some((refs, rest)) => (refs, rest.trim_end_matches(']')),
            None => (header, ""),
        };

        match refs.split_once("...") {
            Some((branch, upstream)) => {
                self.branch = branch.to_string();
                self.upstream = Some(upstream.to_string());
            }
            None => {
                self.branch = refs
                    .strip_prefix("No commits yet on ")
                    .unwrap_or(refs)
                    .to_string();
            }
        }

        for part in tracking.split(", ") {
            if let Some(n) = part.strip_prefix("ahead ") {
                self.ahead = n.parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix("behind ") {
                self.behind = n.parse().unwrap_or(0);
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.changed == 0 && self.untracked == 0 && self.ahead == 0 && self.behind == 0
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "clean".to_string();
        }

        let mut parts = Vec::new();
        if self.changed > 0 {
            parts.push(format!("{} changed", self.changed));
        }
        if self.untracked > 0 {
            parts.push(format!("{} untracked", self.untracked));
        }
        if self.ahead > 0 {
            parts.push(format!("ahead {}", self.ahead));
        }
        if self.behind > 0 {
            parts.push(format!("behind {}", self.behind));
        }
        parts.join(", ")
    }
}

/// `wst git-dirty`
pub struct GitDirty {
    roots: Vec<PathBuf>,
    show_clean: bool,
}

impl GitDirty {
    pub fn new(roots: Vec<PathBuf>, show_clean: bool) -> Self {
        Self { roots, show_clean }
    }
}

impl BatchTool for GitDirty {
    fn name(&self) -> &'static str {
        "git-dirty"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["git"]
    }

    fn workload(&self) -> Workload {
        Workload::Io
    }

    fn capture_stdout(&self) -> bool {
        true
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        Ok(WorkListBuilder::new().containing(".git").walk(&self.roots))
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        Ok(Plan::single(
            CommandLine::new("git")
                .arg("-C")
                .arg(item_path(item)?)
                .args(["status", "--porcelain", "--branch"]),
        ))
    }

    fn render(&self, outcome: &Outcome) -> Option<String> {
        match outcome.status() {
            Status::Captured { code: 0, stdout } => {
                let state = RepoState::parse(stdout);
                if state.is_clean() && !self.show_clean {
                    return None;
                }
                Some(format!("{} [{}]: {}", outcome.item(), state.branch, state.summary()))
            }
            _ => Some(render_line(outcome)),
        }
    }
}
