//! Installed FreeBSD packages whose remote version differs.

use super::{BatchTool, ToolPlanner};
use crate::process::{
    CommandLine, InvokeOptions, Invoker, Outcome, Plan, PlanError, ProcessInvoker, Status,
};
use crate::report::{render_line, Report};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

const VERSION_PARAM: &str = "version";

/// `wst pkg-outdated`
pub struct PkgOutdated {
    packages: Vec<String>,
    show_current: bool,
}

impl PkgOutdated {
    /// Check `packages`, or every installed package when empty.
    pub fn new(packages: Vec<String>, show_current: bool) -> Self {
        Self {
            packages,
            show_current,
        }
    }

    fn query(&self) -> CommandLine {
        let cmd = CommandLine::new("pkg").arg("query").arg("%n\t%v");
        if self.packages.is_empty() {
            cmd
        } else {
            cmd.args(&self.packages)
        }
    }
}

/// `name<TAB>version` lines from `pkg query` into items.
fn installed_items(lines: Vec<WorkItem>) -> Vec<WorkItem> {
    lines
        .into_iter()
        .filter_map(|line| match line.id().split_once('\t') {
            Some((name, version)) => {
                Some(WorkItem::new(name.trim()).with_param(VERSION_PARAM, version.trim()))
            }
            None => {
                tracing::warn!("Skipping unparsable pkg query line: {}", line);
                None
            }
        })
        .collect()
}

/// `pkg rquery` exits nonzero and prints nothing for a package no
/// repository carries. That is a result, not a failure.
struct RqueryInvoker<I>(I);

impl<I: Invoker> Invoker for RqueryInvoker<I> {
    fn invoke(&self, item: WorkItem) -> Outcome {
        let outcome = self.0.invoke(item);
        if not_in_repository(&outcome) {
            outcome.with_status(Status::Captured {
                code: 0,
                stdout: String::new(),
            })
        } else {
            outcome
        }
    }
}

fn not_in_repository(outcome: &Outcome) -> bool {
    let silent_failure = matches!(
        outcome.status(),
        Status::Captured { code, stdout } if *code != 0 && stdout.trim().is_empty()
    );
    silent_failure && outcome.stderr_tail().is_empty()
}

impl BatchTool for PkgOutdated {
    fn name(&self) -> &'static str {
        "pkg-outdated"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["pkg"]
    }

    fn workload(&self) -> Workload {
        Workload::Io
    }

    fn capture_stdout(&self) -> bool {
        true
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        WorkListBuilder::from_command(&self.query()).map(installed_items)
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        Ok(Plan::single(
            CommandLine::new("pkg")
                .args(["rquery", "%v"])
                .arg(item.id()),
        ))
    }

    fn invoker<'a>(&'a self, options: InvokeOptions) -> Box<dyn Invoker + 'a> {
        Box::new(RqueryInvoker(ProcessInvoker::new(ToolPlanner(self), options)))
    }

    fn arrange(&self, report: &mut Report) {
        report.sort_by_key(|o| o.item().id().to_string());
    }

    fn render(&self, outcome: &Outcome) -> Option<String> {
        let Status::Captured { code: 0, stdout } = outcome.status() else {
            return Some(render_line(outcome));
        };

        let item = outcome.item();
        let local = item.param(VERSION_PARAM).unwrap_or("?");
        let remote = stdout.lines().next().map(str::trim).unwrap_or("");

        if remote.is_empty() {
            Some(format!("{} {}: not in any repository", item, local))
        } else if remote != local {
            Some(format!("{} {} -> {}", item, local, remote))
        } else if self.show_current {
            Some(format!("{} {}: up to date", item, local))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rquery(name: &str, local: &str, stdout: &str) -> Outcome {
        Outcome::new(
            WorkItem::new(name).with_param(VERSION_PARAM, local),
            Status::Captured {
                code: 0,
                stdout: stdout.to_string(),
            },
        )
    }

    #[test]
    fn query_lines_become_items() {
        let items = installed_items(WorkListBuilder::from_lines("curl\t8.5.0\nvim\t9.1.0\nbroken\n"));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id(), "curl");
        assert_eq!(items[0].param(VERSION_PARAM), Some("8.5.0"));
    }

    #[test]
    fn render_shows_only_changes_by_default() {
        let tool = PkgOutdated::new(Vec::new(), false);
        assert_eq!(
            tool.render(&rquery("curl", "8.5.0", "8.6.0\n")).as_deref(),
            Some("curl 8.5.0 -> 8.6.0")
        );
        assert_eq!(tool.render(&rquery("vim", "9.1.0", "9.1.0\n")), None);
        assert_eq!(
            tool.render(&rquery("local-port", "1.0", "")).as_deref(),
            Some("local-port 1.0: not in any repository")
        );
    }

    /// Answers every item with a fixed exit code, stdout and stderr.
    struct FakeRquery(i32, &'static str, &'static str);

    impl Invoker for FakeRquery {
        fn invoke(&self, item: WorkItem) -> Outcome {
            let tail = if self.2.is_empty() {
                Vec::new()
            } else {
                vec![self.2.to_string()]
            };
            Outcome::new(
                item,
                Status::Captured {
                    code: self.0,
                    stdout: self.1.to_string(),
                },
            )
            .with_stderr_tail(tail)
        }
    }

    #[test]
    fn package_missing_from_repositories_is_not_a_failure() {
        let tool = PkgOutdated::new(Vec::new(), false);
        let item = WorkItem::new("local-port").with_param(VERSION_PARAM, "1.0");

        let outcome = RqueryInvoker(FakeRquery(1, "", "")).invoke(item.clone());
        assert!(!outcome.is_failure());
        assert_eq!(
            tool.render(&outcome).as_deref(),
            Some("local-port 1.0: not in any repository")
        );

        let broken = RqueryInvoker(FakeRquery(1, "", "pkg: repository catalogue unavailable"))
            .invoke(item.clone());
        assert!(broken.is_failure());

        let found = RqueryInvoker(FakeRquery(0, "1.1\n", "")).invoke(item);
        assert_eq!(tool.render(&found).as_deref(), Some("local-port 1.0 -> 1.1"));
    }

    #[test]
    fn query_limits_to_named_packages() {
        let tool = PkgOutdated::new(vec!["curl".into()], false);
        assert_eq!(tool.query().to_string(), "pkg query '%n\t%v' curl");
    }

    #[test]
    fn plan_is_remote_query() {
        let plan = PkgOutdated::new(Vec::new(), false)
            .plan(&WorkItem::new("curl"))
            .unwrap();
        assert_eq!(plan.describe(), vec!["pkg rquery %v curl"]);
    }
}
