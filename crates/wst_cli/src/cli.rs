//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wst_core::logging::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "wst",
    version,
    propagate_version = true,
    disable_version_flag = true,
    about = "Workstation batch tools: convert, clean and report in parallel"
)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Version)]
    #[allow(dead_code)]
    version: (),

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Log level: trace, debug, info, warning or error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<LogLevel>,

    /// Print what would run without running it
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Number of parallel workers (default: from config, else automatic)
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Two-pass video encode to WebM (VP9) or Matroska (AV1)
    Transcode(TranscodeArgs),

    /// Convert TIFF scans to PDF
    #[command(name = "tiff2pdf")]
    Tiff2Pdf(ConvertArgs),

    /// Convert FLAC files to VBR MP3
    #[command(name = "flac2mp3")]
    Flac2Mp3(Flac2Mp3Args),

    /// Remove metadata from PDF files in place
    PdfClean(InputArgs),

    /// List git repositories with uncommitted or unpushed work
    GitDirty(GitDirtyArgs),

    /// List tracked files by last commit date, oldest first
    GitMdates(GitMdatesArgs),

    /// List installed packages with a different version in the repository
    PkgOutdated(PkgOutdatedArgs),

    /// Show the newest entry of each configured feed
    Feeds(FeedsArgs),

    /// Print network throughput per interface
    Netrate(NetrateArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Files or directories to process
    #[arg(value_name = "PATH")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write outputs here instead of next to each input
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Re-create outputs that already exist
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct TranscodeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Codec profile: vp9 or av1
    #[arg(short = 'p', long, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// Constant rate factor, 0-63
    #[arg(long, value_name = "N")]
    pub crf: Option<u32>,

    /// Start position, e.g. 00:01:30
    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,

    /// Scale to W:H, e.g. 1280:-2
    #[arg(long, value_name = "W:H")]
    pub scale: Option<String>,

    /// Opus audio bitrate, e.g. 96k
    #[arg(long, value_name = "RATE")]
    pub audio_bitrate: Option<String>,
}

#[derive(Debug, Args)]
pub struct Flac2Mp3Args {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// lame VBR quality, 0 (best) to 9
    #[arg(short = 'q', long, value_name = "N")]
    pub quality: Option<u32>,
}

#[derive(Debug, Args)]
pub struct GitDirtyArgs {
    /// Directories to search for repositories (default: current directory)
    #[arg(value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Also list clean repositories
    #[arg(short = 'a', long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct GitMdatesArgs {
    /// Repository to inspect
    #[arg(value_name = "REPO", default_value = ".")]
    pub repo: PathBuf,
}

#[derive(Debug, Args)]
pub struct PkgOutdatedArgs {
    /// Packages to check (default: every installed package)
    #[arg(value_name = "PKG")]
    pub packages: Vec<String>,

    /// Also list packages that are up to date
    #[arg(short = 'a', long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct FeedsArgs {
    /// Feed list (default: from config)
    #[arg(short = 'l', long, value_name = "PATH")]
    pub list: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct NetrateArgs {
    /// Seconds between samples
    #[arg(short = 'i', long, default_value_t = 1, value_name = "SECS")]
    pub interval: u64,

    /// Stop after this many lines (default: run until interrupted)
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<u64>,

    /// Only show these interfaces
    #[arg(value_name = "IFACE")]
    pub interfaces: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wst", "tiff2pdf", "-n", "-j", "3", "--log", "warning", "scans",
        ])
        .unwrap();
        assert!(cli.global.dry_run);
        assert_eq!(cli.global.jobs, Some(3));
        assert_eq!(cli.global.log, Some(LogLevel::Warn));
        match cli.command {
            Command::Tiff2Pdf(args) => assert_eq!(args.input.inputs, vec![PathBuf::from("scans")]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn transcode_options() {
        let cli = Cli::try_parse_from([
            "wst", "transcode", "--profile", "av1", "--crf", "28", "-o", "out", "a.mp4",
        ])
        .unwrap();
        let Command::Transcode(args) = cli.command else {
            panic!("expected transcode");
        };
        assert_eq!(args.profile.as_deref(), Some("av1"));
        assert_eq!(args.crf, Some(28));
        assert_eq!(args.output.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Cli::try_parse_from(["wst", "transcode", "--crf", "high"]).is_err());
        assert!(Cli::try_parse_from(["wst", "feeds", "--log", "loud"]).is_err());
    }

    #[test]
    fn short_v_prints_version() {
        let err = Cli::try_parse_from(["wst", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn version_flag_after_subcommand() {
        let err = Cli::try_parse_from(["wst", "tiff2pdf", "-v", "scans"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let err = Cli::try_parse_from(["wst", "netrate", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
