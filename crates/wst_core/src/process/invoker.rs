//! External-process invoker.
//!
//! Runs one work item's plan to completion and turns whatever happened
//! into an `Outcome`. A nonzero exit is data, not an error: the invoker
//! never panics or bails on it.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;

use super::command::{CommandLine, Plan, Stage};
use super::outcome::{Outcome, Status};
use crate::logging::ItemLogger;
use crate::work::WorkItem;

/// Anything that can turn a work item into an outcome.
pub trait Invoker: Send + Sync {
    /// Process one item. Must not panic on item-level failures.
    fn invoke(&self, item: WorkItem) -> Outcome;
}

/// A work item could not be turned into a plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PlanError(pub String);

impl PlanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Builds the command plan for one item.
pub trait Planner: Send + Sync {
    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError>;
}

impl<F> Planner for F
where
    F: Fn(&WorkItem) -> Result<Plan, PlanError> + Send + Sync,
{
    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        self(item)
    }
}

/// Invocation options shared by every item of a run.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Report the plan without spawning anything.
    pub dry_run: bool,
    /// Keep stdout in the outcome.
    pub capture_stdout: bool,
    /// Number of stderr lines kept for failed items.
    pub error_tail: usize,
    /// Write one log file per item into this directory.
    pub item_log_dir: Option<PathBuf>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            capture_stdout: false,
            error_tail: 20,
            item_log_dir: None,
        }
    }
}

/// Invoker that runs a planner's commands as child processes.
pub struct ProcessInvoker<P> {
    planner: P,
    options: InvokeOptions,
}

impl<P: Planner> ProcessInvoker<P> {
    pub fn new(planner: P, options: InvokeOptions) -> Self {
        Self { planner, options }
    }

    pub fn options(&self) -> &InvokeOptions {
        &self.options
    }

    fn logger_for(&self, item: &WorkItem) -> ItemLogger {
        match &self.options.item_log_dir {
            Some(dir) => ItemLogger::new(item.id(), dir, self.options.error_tail)
                .unwrap_or_else(|e| {
                    tracing::warn!("Cannot open item log for {}: {}", item, e);
                    ItemLogger::tail_only(self.options.error_tail)
                }),
            None => ItemLogger::tail_only(self.options.error_tail),
        }
    }
}

impl<P: Planner> Invoker for ProcessInvoker<P> {
    fn invoke(&self, item: WorkItem) -> Outcome {
        let started = Instant::now();

        let plan = match self.planner.plan(&item) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("{}: {}", item, e);
                return Outcome::new(item, Status::Error(e.to_string()));
            }
        };
        let commands = plan.describe();
        let logger = self.logger_for(&item);

        if self.options.dry_run {
            for command in &commands {
                logger.dry_run(command);
                tracing::debug!("Would run: {}", command);
            }
            return Outcome::new(item, Status::DryRun).with_commands(commands);
        }

        let mut captured = String::new();
        let mut code = 0;

        for stage in plan.stages() {
            logger.command(&stage.to_string());
            tracing::debug!("Running: {}", stage);

            let run = match run_stage(stage) {
                Ok(run) => run,
                Err(e) => {
                    let message = format!("failed to run {}: {}", stage, e);
                    logger.note(&message);
                    return Outcome::new(item, Status::Error(message))
                        .with_commands(commands)
                        .with_elapsed(started.elapsed());
                }
            };

            logger.output(&run.stdout, false);
            logger.output(&run.stderr, true);
            logger.exit(run.code);

            if self.options.capture_stdout {
                captured.push_str(&run.stdout);
            }
            code = run.code;
            if code != 0 {
                break;
            }
        }

        let status = if self.options.capture_stdout {
            Status::Captured {
                code,
                stdout: captured,
            }
        } else {
            Status::Exited(code)
        };
        let tail = if code != 0 {
            logger.get_tail()
        } else {
            Vec::new()
        };

        Outcome::new(item, status)
            .with_commands(commands)
            .with_stderr_tail(tail)
            .with_elapsed(started.elapsed())
    }
}

/// What one stage produced.
#[derive(Debug)]
struct StageRun {
    code: i32,
    stdout: String,
    stderr: String,
}

fn run_stage(stage: &Stage) -> io::Result<StageRun> {
    match stage {
        Stage::Run(cmd) => run_single(cmd),
        Stage::Pipe(producer, consumer) => run_pipe(producer, consumer),
    }
}

fn run_single(cmd: &CommandLine) -> io::Result<StageRun> {
    let output = cmd.to_command().stdin(Stdio::null()).output()?;

    Ok(StageRun {
        code: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run `producer | consumer`. The stage fails if either side fails.
fn run_pipe(producer: &CommandLine, consumer: &CommandLine) -> io::Result<StageRun> {
    let mut producer_child = producer
        .to_command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let producer_stdout = producer_child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("producer stdout was not captured"))?;

    // Drain producer stderr on its own thread so a chatty producer cannot block
    let producer_stderr = producer_child.stderr.take();
    let stderr_reader = thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut stderr) = producer_stderr {
            let _ = stderr.read_to_string(&mut text);
        }
        text
    });

    let consumer_child = consumer
        .to_command()
        .stdin(Stdio::from(producer_stdout))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let consumer_output = match consumer_child.and_then(Child::wait_with_output) {
        Ok(output) => output,
        Err(e) => {
            abandon_producer(producer_child, stderr_reader);
            return Err(e);
        }
    };
    let producer_status = producer_child.wait()?;
    let mut stderr = stderr_reader.join().unwrap_or_default();
    stderr.push_str(&String::from_utf8_lossy(&consumer_output.stderr));

    let code = if producer_status.success() {
        exit_code(consumer_output.status)
    } else {
        exit_code(producer_status)
    };

    Ok(StageRun {
        code,
        stdout: String::from_utf8_lossy(&consumer_output.stdout).into_owned(),
        stderr,
    })
}

/// Kill and reap a producer whose consumer is gone, then join its stderr drain.
fn abandon_producer(mut child: Child, stderr_reader: JoinHandle<String>) {
    let _ = child.kill();
    let _ = child.wait();
    let _ = stderr_reader.join();
}

/// Exit code, mapping signal deaths to the shell's 128+N convention.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
