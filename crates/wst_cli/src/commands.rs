//! Subcommand execution.
//!
//! Every batch subcommand goes through `run_batch`: check required
//! programs once, build the work list, fan out, then print the report.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;

use wst_core::config::{ConfigError, ConfigManager, Settings};
use wst_core::logging::{init_tracing, init_tracing_with_file};
use wst_core::process::{require_tool, require_tools, InvokeOptions};
use wst_core::report::{Report, RunExit};
use wst_core::runner::{Runner, RunnerConfig};
use wst_core::status::net::{self, NetState};
use wst_core::tools::feeds::Feeds;
use wst_core::tools::flac2mp3::Flac2Mp3;
use wst_core::tools::git_dirty::GitDirty;
use wst_core::tools::git_mdates::GitMdates;
use wst_core::tools::pdf_clean::PdfClean;
use wst_core::tools::pkg_outdated::PkgOutdated;
use wst_core::tools::tiff2pdf::Tiff2Pdf;
use wst_core::tools::transcode::{Transcode, TranscodeOptions};
use wst_core::tools::{BatchTool, InvalidArgument};

use crate::cli::{Cli, Command, Flac2Mp3Args, GlobalArgs, InputArgs, NetrateArgs, TranscodeArgs};

/// Settings plus the per-run flags that override them.
struct RunContext {
    settings: Settings,
    config_dir: PathBuf,
    logs_dir: PathBuf,
    dry_run: bool,
    jobs: Option<usize>,
}

impl RunContext {
    /// Resolve `path` against the config directory when relative.
    fn config_relative(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}

/// Default config path: the platform config dir, e.g. ~/.config/wst/settings.toml
fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "wst")
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("settings.toml"))
}

fn load_config(explicit: Option<&Path>) -> Result<ConfigManager> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let mut manager = ConfigManager::new(&path);

    // An explicitly named config must exist; the default one is created
    let loaded = match explicit {
        Some(_) => manager.load(),
        None => manager.load_or_create(),
    };
    match loaded {
        Ok(()) => Ok(manager),
        Err(ConfigError::NotFound(p)) => bail!("config file not found: {}", p.display()),
        Err(e) => Err(e).with_context(|| format!("cannot load config {}", path.display())),
    }
}

/// Map a top-level error to its exit code.
pub fn classify(error: &anyhow::Error) -> RunExit {
    if error.downcast_ref::<InvalidArgument>().is_some() {
        RunExit::InvalidArgument
    } else {
        RunExit::Precondition
    }
}

/// Reject global flag values before anything is loaded.
fn check_globals(global: &GlobalArgs) -> Result<()> {
    if global.jobs == Some(0) {
        return Err(InvalidArgument::new("--jobs", "0", "must be at least 1").into());
    }
    Ok(())
}

pub fn execute(cli: Cli) -> Result<RunExit> {
    check_globals(&cli.global)?;

    let GlobalArgs {
        log,
        dry_run,
        jobs,
        config,
    } = cli.global;

    let manager = load_config(config.as_deref())?;
    let settings = manager.settings().clone();
    let level = log.unwrap_or(settings.logging.level);
    let logs_dir = manager.logs_folder();

    let _log_guard = if settings.logging.log_to_file {
        init_tracing_with_file(level, &logs_dir)
    } else {
        init_tracing(level);
        None
    };

    tracing::debug!("wst {} using {}", wst_core::version(), manager.path().display());

    let ctx = RunContext {
        config_dir: manager
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        settings,
        logs_dir,
        dry_run,
        jobs,
    };

    match cli.command {
        Command::Transcode(args) => transcode(&ctx, args),
        Command::Tiff2Pdf(args) => {
            let inputs = require_inputs(args.input)?;
            let tool = Tiff2Pdf::new(inputs, args.output.output_dir, args.output.overwrite);
            run_batch(&ctx, &tool)
        }
        Command::Flac2Mp3(args) => flac2mp3(&ctx, args),
        Command::PdfClean(args) => {
            let tool = PdfClean::new(require_inputs(args)?);
            run_batch(&ctx, &tool)
        }
        Command::GitDirty(args) => {
            let roots = if args.roots.is_empty() {
                vec![PathBuf::from(".")]
            } else {
                args.roots
            };
            run_batch(&ctx, &GitDirty::new(roots, args.all))
        }
        Command::GitMdates(args) => run_batch(&ctx, &GitMdates::new(args.repo)),
        Command::PkgOutdated(args) => run_batch(&ctx, &PkgOutdated::new(args.packages, args.all)),
        Command::Feeds(args) => {
            let list = args
                .list
                .unwrap_or_else(|| ctx.config_relative(Path::new(&ctx.settings.feeds.config_file)));
            let timeout = Duration::from_secs(ctx.settings.feeds.timeout_secs);
            let tool = Feeds::new(list, timeout).context("cannot set up HTTP client")?;
            run_batch(&ctx, &tool)
        }
        Command::Netrate(args) => netrate(&ctx, args),
    }
}

fn require_inputs(args: InputArgs) -> Result<Vec<PathBuf>> {
    if args.inputs.is_empty() {
        bail!("no input files or directories given");
    }
    Ok(args.inputs)
}

fn flac2mp3(ctx: &RunContext, args: Flac2Mp3Args) -> Result<RunExit> {
    let inputs = require_inputs(args.input)?;
    let quality = args.quality.unwrap_or(ctx.settings.audio.lame_quality);
    let tool = Flac2Mp3::new(inputs, quality, args.output.output_dir, args.output.overwrite)?;
    run_batch(ctx, &tool)
}

fn transcode(ctx: &RunContext, args: TranscodeArgs) -> Result<RunExit> {
    let inputs = require_inputs(args.input)?;

    let mut defaults = ctx.settings.transcode.clone();
    if let Some(profile) = &args.profile {
        defaults.profile = profile.parse()?;
        // A profile given on the command line brings its own default CRF
        defaults.crf = None;
    }
    let mut options = TranscodeOptions::from_settings(&defaults);
    if let Some(crf) = args.crf {
        options.crf = crf;
    }
    if let Some(bitrate) = args.audio_bitrate {
        options.audio_bitrate = bitrate;
    }
    options.start = args.start;
    options.scale = args.scale;
    options.output_dir = args.output.output_dir;
    options.overwrite = args.output.overwrite;

    let tool = Transcode::new(inputs, options)?;
    run_batch(ctx, &tool)
}

fn run_batch(ctx: &RunContext, tool: &dyn BatchTool) -> Result<RunExit> {
    require_tools(tool.required_programs())?;

    let items = tool
        .work_list()
        .with_context(|| format!("{}: cannot build work list", tool.name()))?;
    if items.is_empty() {
        println!("nothing to do");
        return Ok(RunExit::Success);
    }

    let logging = &ctx.settings.logging;
    let options = InvokeOptions {
        dry_run: ctx.dry_run,
        capture_stdout: tool.capture_stdout(),
        error_tail: logging.error_tail,
        item_log_dir: logging.item_logs.then(|| ctx.logs_dir.join(tool.name())),
    };

    let mut config = RunnerConfig::from_settings(tool.workload(), &ctx.settings.runner);
    if let Some(jobs) = ctx.jobs {
        config = config.with_max_workers(jobs);
    }

    let total = items.len();
    let mut done = 0;
    let invoker = tool.invoker(options);
    let outcomes = Runner::new(config).run(items, &*invoker, |outcome| {
        done += 1;
        if outcome.is_failure() {
            tracing::warn!("[{}/{}] {}: {}", done, total, outcome.item(), outcome.status());
        } else {
            tracing::info!("[{}/{}] {}: {}", done, total, outcome.item(), outcome.status());
        }
    })?;

    let mut report = Report::from_outcomes(outcomes);
    tool.arrange(&mut report);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report.write_with(&mut out, |o| tool.render(o))?;
    out.flush()?;

    Ok(report.exit_code())
}

fn netrate(ctx: &RunContext, args: NetrateArgs) -> Result<RunExit> {
    if args.interval == 0 {
        return Err(InvalidArgument::new("--interval", "0", "must be at least 1 second").into());
    }
    require_tool("netstat")?;

    if ctx.dry_run {
        println!("netrate: would run: netstat -ibn every {}s", args.interval);
        return Ok(RunExit::Success);
    }

    let interval = Duration::from_secs(args.interval);
    let mut state = NetState::default();
    let mut printed = 0;

    loop {
        let (rates, next) = net::poll(state, net::sample()?);
        state = next;

        if !rates.is_empty() {
            let line = rates
                .iter()
                .filter(|r| args.interfaces.is_empty() || args.interfaces.contains(&r.interface))
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("  ");
            println!("{}", line);
            printed += 1;
            if args.count.is_some_and(|count| printed >= count) {
                return Ok(RunExit::Success);
            }
        }
        thread::sleep(interval);
    }
}
