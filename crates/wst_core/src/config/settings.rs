//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::tools::transcode::TranscodeProfile;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Worker pool sizing.
    #[serde(default)]
    pub runner: RunnerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Video transcoding defaults.
    #[serde(default)]
    pub transcode: TranscodeSettings,

    /// Audio conversion defaults.
    #[serde(default)]
    pub audio: AudioSettings,

    /// Channel feed checker.
    #[serde(default)]
    pub feeds: FeedSettings,
}

/// Identifies a top-level section of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Runner,
    Logging,
    Transcode,
    Audio,
    Feeds,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Runner,
        ConfigSection::Logging,
        ConfigSection::Transcode,
        ConfigSection::Audio,
        ConfigSection::Feeds,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Runner => "runner",
            ConfigSection::Logging => "logging",
            ConfigSection::Transcode => "transcode",
            ConfigSection::Audio => "audio",
            ConfigSection::Feeds => "feeds",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Runner => "Worker pool sizing (max_workers = 0 means auto)",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Transcode => "Video transcoding defaults",
            ConfigSection::Audio => "Audio conversion defaults",
            ConfigSection::Feeds => "Channel feed checker",
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerSettings {
    /// Hard cap on concurrent workers. Zero lets the workload hint decide.
    #[serde(default)]
    pub max_workers: usize,

    /// Workers per core for I/O-bound tools.
    #[serde(default = "default_io_multiplier")]
    pub io_multiplier: usize,
}

fn default_io_multiplier() -> usize {
    4
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_workers: 0,
            io_multiplier: default_io_multiplier(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Default level when neither `--log` nor `RUST_LOG` is given.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Also write the application log to a daily file in `logs_folder`.
    #[serde(default)]
    pub log_to_file: bool,

    /// Write one log file per work item with its commands and output.
    #[serde(default)]
    pub item_logs: bool,

    /// Number of stderr lines kept for failed items.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            logs_folder: default_logs_folder(),
            log_to_file: false,
            item_logs: false,
            error_tail: default_error_tail(),
        }
    }
}

/// Video transcoding defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscodeSettings {
    /// Codec profile.
    #[serde(default)]
    pub profile: TranscodeProfile,

    /// Constant rate factor. `None` uses the profile default.
    #[serde(default)]
    pub crf: Option<u32>,

    /// Opus audio bitrate, e.g. "128k".
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            profile: TranscodeProfile::default(),
            crf: None,
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

/// Audio conversion defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSettings {
    /// lame VBR quality, 0 (best) to 9.
    #[serde(default = "default_lame_quality")]
    pub lame_quality: u32,
}

fn default_lame_quality() -> u32 {
    2
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            lame_quality: default_lame_quality(),
        }
    }
}

/// Feed checker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSettings {
    /// JSON file listing the feeds to check.
    #[serde(default = "default_feeds_file")]
    pub config_file: String,

    /// HTTP timeout per feed, in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

fn default_feeds_file() -> String {
    "feeds.json".to_string()
}

fn default_feed_timeout() -> u64 {
    20
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            config_file: default_feeds_file(),
            timeout_secs: default_feed_timeout(),
        }
    }
}
