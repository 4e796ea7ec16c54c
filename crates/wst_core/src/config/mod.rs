//! Configuration management for workstation tools.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use wst_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/wst/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Max workers: {}", config.settings().runner.max_workers);
//!
//! config.settings_mut().runner.max_workers = 4;
//! config.update_section(ConfigSection::Runner).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, ConfigSection, FeedSettings, LoggingSettings, RunnerSettings, Settings,
    TranscodeSettings,
};
