//! Application configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/wsindicator/config.json`.  Every key is optional and
//! unknown keys are ignored; command-line flags override whatever the file
//! says.
//!
//! # Example
//!
//! ```json
//! {
//!   "komorebic": "C:\\Program Files\\komorebi\\bin\\komorebic.exe",
//!   "template": "M{monitor}:W{workspace} {name}",
//!   "poll_interval_ms": 1000,
//!   "fullscreen_probe": "win32",
//!   "indicator": { "opacity": 0.8, "margin_top": 6 }
//! }
//! ```

use crate::engine::{DEFAULT_DEBOUNCE, DEFAULT_FULLSCREEN_TOLERANCE};
use crate::indicator::DEFAULT_MARGIN_TOP;
use crate::komorebi::source::{DEFAULT_KOMOREBIC, DEFAULT_QUERY_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under `$XDG_CONFIG_HOME` and socket file stem.
pub const APP_NAME: &str = "wsindicator";

/// Which [`FullscreenProbe`](crate::traits::FullscreenProbe) to use.
///
/// Defaults to the foreground window on Windows and to Hyprland elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Win32,
    Hyprland,
    None,
}

impl Default for ProbeKind {
    fn default() -> Self {
        if cfg!(windows) {
            Self::Win32
        } else {
            Self::Hyprland
        }
    }
}

/// Top-level configuration.
///
/// A minimal `{}` file is valid; every field falls back to its compiled-in
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path or name of the `komorebic` executable.
    pub komorebic: PathBuf,
    /// Label template.  When absent the `--show-monitor` / `--show-name`
    /// flags decide.
    pub template: Option<String>,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub query_timeout_ms: u64,
    pub fullscreen_probe: ProbeKind,
    pub fullscreen_tolerance_px: i32,
    /// Control socket file stem under `$XDG_RUNTIME_DIR`.
    pub socket_name: String,
    pub indicator: IndicatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            komorebic: PathBuf::from(DEFAULT_KOMOREBIC),
            template: None,
            poll_interval_ms: 1000,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT.as_millis() as u64,
            fullscreen_probe: ProbeKind::default(),
            fullscreen_tolerance_px: DEFAULT_FULLSCREEN_TOLERANCE,
            socket_name: APP_NAME.to_string(),
            indicator: IndicatorConfig::default(),
        }
    }
}

/// Look of the indicator windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Window opacity, `0.0`–`1.0`.
    pub opacity: f64,
    /// Distance from the top edge of the monitor (px).
    pub margin_top: i32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            opacity: 0.7,
            margin_top: DEFAULT_MARGIN_TOP,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError("poll_interval_ms must be positive".into()));
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError("query_timeout_ms must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.indicator.opacity) {
            return Err(ConfigError(format!(
                "indicator.opacity must be within 0.0..=1.0, got {}",
                self.indicator.opacity
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// `$XDG_CONFIG_HOME/wsindicator`, falling back to `~/.config/wsindicator`.
pub fn config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join(APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.json"))
}

/// User stylesheet for the indicator windows.
pub fn default_css_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("style.css"))
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
