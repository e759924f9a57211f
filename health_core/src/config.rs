//! Configuration file support for healthmerge.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/healthmerge/config.toml`.
//! Every field has a default, so a partial file (or none at all) is fine.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub window: DateWindow,

    #[serde(default)]
    pub diary: DiaryConfig,

    #[serde(default)]
    pub activity: ActivityConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// Input and output locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Food/exercise diary CSV
    #[serde(default = "default_diary_path")]
    pub diary: PathBuf,

    /// Directory holding the wearable-device CSV export
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Strength workout log CSV
    #[serde(default = "default_strength_path")]
    pub strength: PathBuf,

    /// Where merged and per-source outputs are written
    #[serde(default = "default_export_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            diary: default_diary_path(),
            export_dir: default_export_dir(),
            strength: default_strength_path(),
            output_dir: default_export_dir(),
        }
    }
}

/// Inclusive date range kept in the merged output
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    #[serde(default = "default_window_start")]
    pub start: NaiveDate,

    #[serde(default = "default_window_end")]
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            start: default_window_start(),
            end: default_window_end(),
        }
    }
}

/// Food diary parsing options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiaryConfig {
    /// Item-name prefix marking pre-aggregated summary rows
    #[serde(default = "default_summary_marker")]
    pub summary_marker: String,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            summary_marker: default_summary_marker(),
        }
    }
}

/// Activity classification for the wearable exercise export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Type codes counted as meditation (guided breathing, mindfulness)
    #[serde(default = "default_meditation_codes")]
    pub meditation_codes: Vec<i64>,

    /// Type codes for device-inferred passive periods, dropped entirely
    #[serde(default = "default_auto_detected_codes")]
    pub auto_detected_codes: Vec<i64>,

    /// File-name fragments marking auxiliary exercise side tables
    #[serde(default = "default_excluded_files")]
    pub excluded_files: Vec<String>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            meditation_codes: default_meditation_codes(),
            auto_detected_codes: default_auto_detected_codes(),
            excluded_files: default_excluded_files(),
        }
    }
}

/// Run behaviour
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RunConfig {
    /// Abort when a source file exists but cannot be read
    #[serde(default)]
    pub strict: bool,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("healthmerge")
}

fn default_diary_path() -> PathBuf {
    default_data_dir().join("mfp_diary.csv")
}

fn default_export_dir() -> PathBuf {
    default_data_dir().join("health_data")
}

fn default_strength_path() -> PathBuf {
    default_data_dir().join("strength_workouts.csv")
}

fn default_window_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 1).unwrap_or(NaiveDate::MIN)
}

fn default_window_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 21).unwrap_or(NaiveDate::MAX)
}

fn default_summary_marker() -> String {
    "Generic".into()
}

fn default_meditation_codes() -> Vec<i64> {
    vec![15002, 15003, 15005, 15006]
}

fn default_auto_detected_codes() -> Vec<i64> {
    vec![0]
}

fn default_excluded_files() -> Vec<String> {
    vec![
        "weather".into(),
        "custom_exercise".into(),
        "hr_zone".into(),
        "max_heart_rate".into(),
        "recovery_heart_rate".into(),
        "routine".into(),
        "periodization".into(),
    ]
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("healthmerge")
            .join("config.toml")
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.window.start > self.window.end {
            return Err(Error::Config(format!(
                "window start {} is after window end {}",
                self.window.start, self.window.end
            )));
        }

        if self.diary.summary_marker.trim().is_empty() {
            return Err(Error::Config(
                "diary.summary_marker must not be empty".into(),
            ));
        }

        if let Some(code) = self
            .activity
            .meditation_codes
            .iter()
            .find(|c| self.activity.auto_detected_codes.contains(c))
        {
            return Err(Error::Config(format!(
                "activity code {} is listed as both meditation and auto-detected",
                code
            )));
        }

        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
