//! Two-pass video transcoding with ffmpeg.
//!
//! One tool with codec profiles instead of a script per target format:
//!
//! | profile | container | video        | audio   |
//! |---------|-----------|--------------|---------|
//! | vp9     | webm      | libvpx-vp9   | libopus |
//! | av1     | mkv       | libaom-av1   | libopus |
//!
//! Pass 1 writes its statistics to a per-item pass log in the temp
//! directory so parallel encodes never share one.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{item_path, output_path, skip_existing, BatchTool, InvalidArgument};
use crate::config::TranscodeSettings;
use crate::logging::sanitize_filename;
use crate::process::{CommandLine, Plan, PlanError};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

/// Input extensions picked up by a directory walk.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ts", "vob", "webm", "wmv",
];

const MAX_CRF: u32 = 63;

#[cfg(unix)]
const NULL_DEVICE: &str = "/dev/null";
#[cfg(not(unix))]
const NULL_DEVICE: &str = "NUL";

/// Target codec profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscodeProfile {
    #[default]
    Vp9,
    Av1,
}

impl TranscodeProfile {
    pub fn container(&self) -> &'static str {
        match self {
            TranscodeProfile::Vp9 => "webm",
            TranscodeProfile::Av1 => "mkv",
        }
    }

    pub fn video_codec(&self) -> &'static str {
        match self {
            TranscodeProfile::Vp9 => "libvpx-vp9",
            TranscodeProfile::Av1 => "libaom-av1",
        }
    }

    pub fn default_crf(&self) -> u32 {
        match self {
            TranscodeProfile::Vp9 => 32,
            TranscodeProfile::Av1 => 30,
        }
    }

    /// Encoder speed/threading flags.
    fn tuning(&self) -> &'static [&'static str] {
        match self {
            TranscodeProfile::Vp9 => &["-row-mt", "1", "-deadline", "good"],
            TranscodeProfile::Av1 => &["-row-mt", "1", "-cpu-used", "4"],
        }
    }
}

impl std::fmt::Display for TranscodeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscodeProfile::Vp9 => write!(f, "vp9"),
            TranscodeProfile::Av1 => write!(f, "av1"),
        }
    }
}

impl FromStr for TranscodeProfile {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vp9" | "webm" => Ok(TranscodeProfile::Vp9),
            "av1" => Ok(TranscodeProfile::Av1),
            _ => Err(InvalidArgument::new(
                "--profile",
                s,
                "expected one of: vp9, av1",
            )),
        }
    }
}

/// Per-run encoding options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeOptions {
    pub profile: TranscodeProfile,
    pub crf: u32,
    pub audio_bitrate: String,
    /// Seek position passed to `-ss`.
    pub start: Option<String>,
    /// Scale filter argument, `W:H`.
    pub scale: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

impl TranscodeOptions {
    /// Options from the `[transcode]` section.
    pub fn from_settings(settings: &TranscodeSettings) -> Self {
        Self {
            profile: settings.profile,
            crf: settings.crf.unwrap_or_else(|| settings.profile.default_crf()),
            audio_bitrate: settings.audio_bitrate.clone(),
            start: None,
            scale: None,
            output_dir: None,
            overwrite: false,
        }
    }

    /// Check every value ffmpeg would otherwise reject per item.
    pub fn validate(&self) -> Result<(), InvalidArgument> {
        if self.crf > MAX_CRF {
            return Err(InvalidArgument::new(
                "--crf",
                self.crf.to_string(),
                format!("must be 0-{}", MAX_CRF),
            ));
        }
        if let Some(start) = &self.start {
            if start.is_empty() || !start.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.') {
                return Err(InvalidArgument::new("--start", start, "expected [HH:]MM:SS[.ms] or seconds"));
            }
        }
        if let Some(scale) = &self.scale {
            let valid = scale
                .split_once(':')
                .map(|(w, h)| w.parse::<i32>().is_ok() && h.parse::<i32>().is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(InvalidArgument::new("--scale", scale, "expected W:H, e.g. 1280:-2"));
            }
        }
        Ok(())
    }
}

/// `wst transcode`
pub struct Transcode {
    inputs: Vec<PathBuf>,
    options: TranscodeOptions,
}

impl Transcode {
    pub fn new(inputs: Vec<PathBuf>, options: TranscodeOptions) -> Result<Self, InvalidArgument> {
        options.validate()?;
        Ok(Self { inputs, options })
    }

    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    fn output_for(&self, input: &Path) -> PathBuf {
        output_path(input, self.options.output_dir.as_deref(), self.options.profile.container())
    }

    /// ffmpeg arguments shared by both passes.
    fn base(&self, input: &Path) -> CommandLine {
        let mut cmd = CommandLine::new("ffmpeg")
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]);
        if let Some(start) = &self.options.start {
            cmd = cmd.arg("-ss").arg(start);
        }
        cmd = cmd
            .arg("-i")
            .arg(input)
            .arg("-c:v")
            .arg(self.options.profile.video_codec())
            .args(["-b:v", "0", "-crf"])
            .arg(self.options.crf.to_string())
            .args(self.options.profile.tuning());
        if let Some(scale) = &self.options.scale {
            cmd = cmd.arg("-vf").arg(format!("scale={}", scale));
        }
        cmd
    }
}

/// Pass log prefix unique to `input`.
fn passlog_for(input: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    std::env::temp_dir().join(format!(
        "wst-pass-{}-{:016x}",
        sanitize_filename(&stem),
        hasher.finish()
    ))
}

impl BatchTool for Transcode {
    fn name(&self) -> &'static str {
        "transcode"
    }

    fn required_programs(&self) -> &[&'static str] {
        &["ffmpeg"]
    }

    fn workload(&self) -> Workload {
        Workload::Cpu
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        let items = WorkListBuilder::new()
            .extensions(VIDEO_EXTENSIONS)
            .walk(&self.inputs);
        Ok(skip_existing(items, self.options.overwrite, |p| self.output_for(p)))
    }

    fn plan(&self, item: &WorkItem) -> Result<Plan, PlanError> {
        let input = item_path(item)?;
        let output = self.output_for(input);
        let passlog = passlog_for(input);

        let first = self
            .base(input)
            .arg("-pass")
            .arg("1")
            .arg("-passlogfile")
            .arg(&passlog)
            .args(["-an", "-f", "null", NULL_DEVICE]);

        let second = self
            .base(input)
            .arg("-pass")
            .arg("2")
            .arg("-passlogfile")
            .arg(&passlog)
            .args(["-c:a", "libopus", "-b:a"])
            .arg(&self.options.audio_bitrate)
            .arg(output);

        Ok(Plan::single(first).then(second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options() -> TranscodeOptions {
        TranscodeOptions::from_settings(&TranscodeSettings::default())
    }

    #[test]
    fn profile_parsing() {
        assert_eq!("vp9".parse::<TranscodeProfile>().unwrap(), TranscodeProfile::Vp9);
        assert_eq!("WEBM".parse::<TranscodeProfile>().unwrap(), TranscodeProfile::Vp9);
        assert_eq!("av1".parse::<TranscodeProfile>().unwrap(), TranscodeProfile::Av1);
        assert!("h264".parse::<TranscodeProfile>().is_err());
    }

    #[test]
    fn settings_default_crf_follows_profile() {
        let settings = TranscodeSettings {
            profile: TranscodeProfile::Av1,
            ..Default::default()
        };
        assert_eq!(TranscodeOptions::from_settings(&settings).crf, 30);
        assert_eq!(options().crf, 32);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad_crf = TranscodeOptions { crf: 64, ..options() };
        assert_eq!(bad_crf.validate().unwrap_err().name, "--crf");

        let bad_scale = TranscodeOptions {
            scale: Some("wide".into()),
            ..options()
        };
        assert_eq!(bad_scale.validate().unwrap_err().name, "--scale");

        let bad_start = TranscodeOptions {
            start: Some("1m30".into()),
            ..options()
        };
        assert!(Transcode::new(Vec::new(), bad_start).is_err());

        let good = TranscodeOptions {
            start: Some("00:01:30.5".into()),
            scale: Some("1280:-2".into()),
            ..options()
        };
        assert!(good.validate().is_ok());
    }

    #[test]
    fn two_pass_plan() {
        let tool = Transcode::new(Vec::new(), options()).unwrap();
        let plan = tool.plan(&WorkItem::from_path("/v/clip.mp4")).unwrap();
        let commands = plan.describe();

        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("-pass 1"));
        assert!(commands[0].contains("-an -f null"));
        assert!(commands[0].contains("libvpx-vp9"));
        assert!(commands[1].contains("-pass 2"));
        assert!(commands[1].contains("-c:a libopus -b:a 128k"));
        assert!(commands[1].ends_with("/v/clip.webm"));
    }

    #[test]
    fn plan_honours_start_and_scale() {
        let opts = TranscodeOptions {
            profile: TranscodeProfile::Av1,
            crf: 28,
            start: Some("90".into()),
            scale: Some("1280:-2".into()),
            output_dir: Some(PathBuf::from("/out")),
            ..options()
        };
        let tool = Transcode::new(Vec::new(), opts).unwrap();
        let commands = tool
            .plan(&WorkItem::from_path("/v/clip.vob"))
            .unwrap()
            .describe();

        assert!(commands[1].contains("-ss 90 -i /v/clip.vob"));
        assert!(commands[1].contains("libaom-av1 -b:v 0 -crf 28"));
        assert!(commands[1].contains("-vf scale=1280:-2"));
        assert!(commands[1].ends_with("/out/clip.mkv"));
    }

    #[test]
    fn pass_logs_differ_per_item() {
        assert_ne!(
            passlog_for(Path::new("/a/clip.mp4")),
            passlog_for(Path::new("/b/clip.mp4"))
        );
    }

    #[test]
    fn work_list_skips_finished_and_same_format() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("done.mp4"), b"").unwrap();
        fs::write(dir.path().join("done.webm"), b"").unwrap();
        fs::write(dir.path().join("todo.mkv"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let tool = Transcode::new(vec![dir.path().to_path_buf()], options()).unwrap();
        let items = tool.work_list().unwrap();

        assert_eq!(items.len(), 1);
        assert!(items[0].id().ends_with("todo.mkv"));
    }

    #[test]
    fn work_list_never_shares_an_output() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("clip.mp4"), b"").unwrap();
        fs::write(dir.path().join("clip.mkv"), b"").unwrap();

        let tool = Transcode::new(vec![dir.path().to_path_buf()], options()).unwrap();
        let items = tool.work_list().unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].id().ends_with("clip.mkv"));

        let nested = tempdir().unwrap();
        for sub in ["a", "b"] {
            fs::create_dir(nested.path().join(sub)).unwrap();
            fs::write(nested.path().join(sub).join("clip.mp4"), b"").unwrap();
        }
        let to_dir = TranscodeOptions {
            output_dir: Some(dir.path().join("out")),
            ..options()
        };
        let tool = Transcode::new(vec![nested.path().to_path_buf()], to_dir).unwrap();
        let items = tool.work_list().unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].id().ends_with("clip.mp4"));
    }

    #[test]
    fn missing_path_is_plan_error() {
        let tool = Transcode::new(Vec::new(), options()).unwrap();
        assert!(tool.plan(&WorkItem::new("no-path")).is_err());
    }
}
