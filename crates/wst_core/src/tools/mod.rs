//! Concrete batch tools built on the shared fan-out core.
//!
//! Every tool answers the same questions: which programs must exist, what
//! kind of workload it is, how to build its work list, what to run per
//! item and how to present the result. The front end drives them all the
//! same way:
//!
//! ```text
//! require_tools(required_programs)  ->  work_list()  ->  Runner::run(invoker)
//!                                                     ->  arrange(report)  ->  render()
//! ```

pub mod feeds;
pub mod flac2mp3;
pub mod git_dirty;
pub mod git_mdates;
pub mod pdf_clean;
pub mod pkg_outdated;
pub mod tiff2pdf;
pub mod transcode;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::process::{InvokeOptions, Invoker, Outcome, Plan, PlanError, Planner, ProcessInvoker};
use crate::report::{render_line, Report};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListResult};

/// An argument value a tool cannot use.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value '{value}' for {name}: {reason}")]
pub struct InvalidArgument {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

impl InvalidArgument {
    pub fn new(name: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// One batch tool.
pub trait BatchTool: Send + Sync {
    /// Subcommand name.
    fn name(&self) -> &'static str;

    /// Programs that must be on `PATH` before any work starts.
    fn required_programs(&self) -> &[&'static str];

    fn workload(&self) -> Workload;

    /// Whether outcomes need the child's stdout.
    fn capture_stdout(&self) -> bool {
        false
    }

    /// Build the work list. A failing fixed source fails the whole run.
    fn work_list(&self) -> WorkListResult<Vec<WorkItem>>;

    /// Commands to run for one item.
    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        Err(PlanError::new(format!(
            "{} does not run external commands for {}",
            self.name(),
            item
        )))
    }

    /// The per-item invoker. Defaults to running `plan` as child processes.
    fn invoker<'a>(&'a self, options: InvokeOptions) -> Box<dyn Invoker + 'a> {
        Box::new(ProcessInvoker::new(ToolPlanner(self), options))
    }

    /// Reorder the report before printing.
    fn arrange(&self, _report: &mut Report) {}

    /// One line per outcome; `None` hides the outcome.
    fn render(&self, outcome: &Outcome) -> Option<String> {
        Some(render_line(outcome))
    }
}

/// Adapts a tool's `plan` to the invoker's `Planner`.
struct ToolPlanner<'a, T: ?Sized>(&'a T);

impl<T: BatchTool + ?Sized> Planner for ToolPlanner<'_, T> {
    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        self.0.plan(item)
    }
}

/// `dir/stem.ext` for `input`, where `dir` is `output_dir` or the input's
/// own directory.
pub(crate) fn output_path(input: &Path, output_dir: Option<&Path>, ext: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(ext);
    dir.join(name)
}

/// Drop items whose output already exists, unless `overwrite` is set.
///
/// Each output path is claimed by the first item that maps to it; later
/// items with the same output (`clip.mp4` and `clip.mkv`, or same-named
/// files sent to one `--output-dir`) are skipped with a warning.
pub(crate) fn skip_existing<F>(items: Vec<WorkItem>, overwrite: bool, output_for: F) -> Vec<WorkItem>
where
    F: Fn(&Path) -> PathBuf,
{
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    items
        .into_iter()
        .filter(|item| {
            let input = item.path_or_id();
            let output = output_for(&input);
            if output == input {
                tracing::info!("Skipping {}: already in the target format", item);
                return false;
            }
            if !overwrite && output.exists() {
                tracing::info!("Skipping {}: {} exists", item, output.display());
                return false;
            }
            if let Some(owner) = claimed.get(&output) {
                tracing::warn!(
                    "Skipping {}: {} is already the output of {}",
                    item,
                    output.display(),
                    owner
                );
                return false;
            }
            claimed.insert(output, item.to_string());
            true
        })
        .collect()
}

/// Path an item refers to, or a plan error.
pub(crate) fn item_path(item: &WorkItem) -> Result<&Path, PlanError> {
    item.path()
        .ok_or_else(|| PlanError::new(format!("{} has no file path", item)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandLine;
    use std::fs;
    use tempfile::tempdir;

    struct Echo;

    impl BatchTool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn required_programs(&self) -> &[&'static str] {
            &["echo"]
        }

        fn workload(&self) -> Workload {
            Workload::Io
        }

        fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
            Ok(vec![WorkItem::new("x")])
        }

        fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
            Ok(Plan::single(CommandLine::new("echo").arg(item.id())))
        }
    }

    #[test]
    fn default_invoker_uses_plan() {
        let options = InvokeOptions {
            dry_run: true,
            ..Default::default()
        };
        let tool = Echo;
        let outcome = tool.invoker(options).invoke(WorkItem::new("hi"));
        assert_eq!(outcome.commands(), &["echo hi".to_string()]);
    }

    #[test]
    fn output_path_uses_input_dir_or_override() {
        let input = Path::new("/media/clips/holiday.MP4");
        assert_eq!(
            output_path(input, None, "webm"),
            PathBuf::from("/media/clips/holiday.webm")
        );
        assert_eq!(
            output_path(input, Some(Path::new("/out")), "mkv"),
            PathBuf::from("/out/holiday.mkv")
        );
    }

    #[test]
    fn skip_existing_drops_done_items() {
        let dir = tempdir().unwrap();
        let done = dir.path().join("done.tif");
        let todo = dir.path().join("todo.tif");
        fs::write(&done, b"").unwrap();
        fs::write(&todo, b"").unwrap();
        fs::write(dir.path().join("done.pdf"), b"").unwrap();

        let items = vec![WorkItem::from_path(&done), WorkItem::from_path(&todo)];
        let kept = skip_existing(items.clone(), false, |p| output_path(p, None, "pdf"));
        assert_eq!(kept, vec![WorkItem::from_path(&todo)]);

        let all = skip_existing(items, true, |p| output_path(p, None, "pdf"));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn skip_existing_keeps_one_item_per_output() {
        let dir = tempdir().unwrap();
        let tif = dir.path().join("scan.tif");
        let tiff = dir.path().join("scan.tiff");
        let items = vec![WorkItem::from_path(&tif), WorkItem::from_path(&tiff)];

        let kept = skip_existing(items.clone(), false, |p| output_path(p, None, "pdf"));
        assert_eq!(kept, vec![WorkItem::from_path(&tif)]);

        // --overwrite does not allow two writers either
        let kept = skip_existing(items, true, |p| output_path(p, None, "pdf"));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn skip_existing_detects_clash_in_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let first = dir.path().join("a").join("track.flac");
        let second = dir.path().join("b").join("track.flac");
        let other = dir.path().join("b").join("other.flac");
        let items = vec![
            WorkItem::from_path(&first),
            WorkItem::from_path(&second),
            WorkItem::from_path(&other),
        ];

        let kept = skip_existing(items, false, |p| output_path(p, Some(&out), "mp3"));
        assert_eq!(kept, vec![WorkItem::from_path(&first), WorkItem::from_path(&other)]);
    }

    #[test]
    fn invalid_argument_message() {
        let err = InvalidArgument::new("--crf", "99", "must be 0-63");
        assert_eq!(err.to_string(), "invalid value '99' for --crf: must be 0-63");
    }
}
