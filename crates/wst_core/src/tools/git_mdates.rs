//! Last commit date of every tracked file, oldest first.

use std::fmt::Display;
use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone, Utc};

use super::BatchTool;
use crate::process::{CommandLine, Outcome, Plan, PlanError, Status};
use crate::report::{render_line, Report};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// `wst git-mdates`
pub struct GitMdates {
    repo: PathBuf,
}

impl GitMdates {
    pub fn new(repo: PathBuf) -> Self {
        Self { repo }
    }

    fn git(&self) -> CommandLine {
        CommandLine::new("git").arg("-C").arg(&self.repo)
    }
}

/// Commit timestamp captured by the plan, if the file has one.
pub fn commit_time(outcome: &Outcome) -> Option<i64> {
    match outcome.status() {
        Status::Captured { code: 0, stdout } => stdout.trim().parse().ok(),
        _ => None,
    }
}

fn format_time<Tz>(secs: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string())
}

impl BatchTool for GitMdates {
    fn name(&self) -> &'static str {
        "git-mdates"
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
        WorkListBuilder::from_command_nul(
            &self
                .git()
                .args(["-c", "core.quotePath=false", "ls-files", "-z"]),
        )
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        Ok(Plan::single(
            self.git()
                .args(["--literal-pathspecs", "log", "-1", "--format=%ct", "--"])
                .arg(item.id()),
        ))
    }

    fn arrange(&self, report: &mut Report) {
        report.sort_by_time(commit_time);
    }

    fn render(&self, outcome: &Outcome) -> Option<String> {
        if outcome.is_failure() || matches!(outcome.status(), Status::DryRun) {
            return Some(render_line(outcome));
        }
        let when = commit_time(outcome)
            .and_then(|secs| format_time(secs, &Local))
            .unwrap_or_else(|| "uncommitted     ".to_string());
        Some(format!("{}  {}", when, outcome.item()))
    }
}
