//! End-to-end: work list -> runner -> invoker -> report.

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use wst_core::process::{
    CommandLine, InvokeOptions, Invoker, Outcome, Plan, PlanError, ProcessInvoker, Status,
};
use wst_core::report::{Report, RunExit};
use wst_core::runner::{Runner, RunnerConfig, Workload};
use wst_core::work::{WorkItem, WorkListBuilder};

/// Fails `b.tif` with exit code 1, passes everything else.
struct StubInvoker;

impl Invoker for StubInvoker {
    fn invoke(&self, item: WorkItem) -> Outcome {
        let code = if item.id().ends_with("b.tif") { 1 } else { 0 };
        Outcome::new(item, Status::Exited(code))
    }
}

fn tif_items(dir: &Path) -> Vec<WorkItem> {
    fs::write(dir.join("a.tif"), b"").unwrap();
    fs::write(dir.join("b.tif"), b"").unwrap();
    fs::write(dir.join("readme.txt"), b"").unwrap();
    WorkListBuilder::new().extensions(&["tif"]).walk(&[dir])
}

fn code_of(report: &Report, name: &str) -> Option<i32> {
    report
        .outcomes()
        .iter()
        .find(|o| o.item().id().ends_with(name))
        .and_then(|o| o.status().code())
}

#[test]
fn one_failure_among_two_items() {
    let dir = tempdir().unwrap();
    let items = tif_items(dir.path());
    assert_eq!(items.len(), 2);

    let runner = Runner::new(RunnerConfig::new(Workload::Cpu).with_max_workers(2));
    let mut report = Report::from_outcomes(runner.run(items, &StubInvoker, |_| {}).unwrap());
    report.sort_by_key(|o| o.item().id().to_string());

    assert_eq!(report.len(), 2);
    assert_eq!(code_of(&report, "a.tif"), Some(0));
    assert_eq!(code_of(&report, "b.tif"), Some(1));
    assert_eq!(report.exit_code(), RunExit::ItemFailures);
    assert_eq!(report.summary(), "2 items, 1 ok, 1 failed, 0 dry-run");
}

#[cfg(unix)]
#[test]
fn real_processes_with_one_failure() {
    let dir = tempdir().unwrap();
    let items = tif_items(dir.path());

    let invoker = ProcessInvoker::new(
        |item: &WorkItem| -> Result<Plan, PlanError> {
            let script = if item.id().ends_with("b.tif") {
                "echo 'cannot read b.tif' >&2; exit 1"
            } else {
                "exit 0"
            };
            Ok(Plan::single(CommandLine::new("sh").arg("-c").arg(script)))
        },
        InvokeOptions::default(),
    );

    let runner = Runner::new(RunnerConfig::new(Workload::Cpu));
    let report = Report::from_outcomes(runner.run(items, &invoker, |_| {}).unwrap());

    assert_eq!(code_of(&report, "a.tif"), Some(0));
    assert_eq!(code_of(&report, "b.tif"), Some(1));

    let failed = report.failures().next().unwrap();
    assert_eq!(failed.stderr_tail(), &["cannot read b.tif".to_string()]);
    assert_eq!(report.exit_code().code(), 2);
}

#[cfg(unix)]
#[test]
fn dry_run_spawns_nothing_and_succeeds() {
    let dir = tempdir().unwrap();
    let items = tif_items(dir.path());
    let marker_dir = dir.path().to_path_buf();

    let invoker = ProcessInvoker::new(
        move |item: &WorkItem| -> Result<Plan, PlanError> {
            let name = Path::new(item.id()).file_name().unwrap_or_default().to_os_string();
            Ok(Plan::single(CommandLine::new("touch").arg(marker_dir.join(name).with_extension("ran"))))
        },
        InvokeOptions {
            dry_run: true,
            ..Default::default()
        },
    );

    let runner = Runner::new(RunnerConfig::new(Workload::Io));
    let report = Report::from_outcomes(runner.run(items, &invoker, |_| {}).unwrap());

    assert_eq!(report.dry_runs().count(), 2);
    assert!(report.outcomes().iter().all(|o| o.commands()[0].starts_with("touch ")));
    assert!(!dir.path().join("a.ran").exists());
    assert!(!dir.path().join("b.ran").exists());
    assert_eq!(report.exit_code(), RunExit::Success);
}
