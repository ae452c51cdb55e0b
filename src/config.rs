//! Configuration loading and management
//!
//! Handles parsing of `calvault.toml` configuration files. The task folder is
//! always passed explicitly to the author and observer; nothing here is
//! process-global.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Configuration file name looked up in the working directory
pub const CONFIG_FILE: &str = "calvault.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the notes vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<PathBuf>,

    /// Task folder, relative to the vault or absolute
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: PathBuf,

    /// Marker literal appended to every authored file
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Change observer configuration
    #[serde(default)]
    pub observer: ObserverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault: None,
            tasks_dir: default_tasks_dir(),
            marker: default_marker(),
            observer: ObserverConfig::default(),
        }
    }
}

fn default_tasks_dir() -> PathBuf {
    PathBuf::from("Calendar Tasks")
}

fn default_marker() -> String {
    crate::author::DEFAULT_MARKER.to_string()
}

/// How the observer learns about new files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ObserverBackend {
    /// Native filesystem notifications
    Notify,
    /// Periodic directory scans
    Poll,
}

/// Change observer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Detection backend
    #[serde(default = "default_backend")]
    pub backend: ObserverBackend,

    /// Scan interval for the polling backend
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Glob patterns on file names the observer never reports
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_backend() -> ObserverBackend {
    ObserverBackend::Notify
}

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_ignore() -> Vec<String> {
    vec![".*".to_string()]
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            poll_interval_ms: default_poll_interval_ms(),
            ignore: default_ignore(),
        }
    }
}

impl ObserverConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Compiled ignore patterns
    pub fn ignore_patterns(&self) -> Result<Vec<glob::Pattern>> {
        self.ignore
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|err| {
                    Error::InvalidConfig(format!(
                        "observer.ignore: invalid glob pattern '{pattern}': {err}"
                    ))
                })
            })
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 1000 {
            return Err(Error::InvalidConfig(format!(
                "observer.poll_interval_ms must be within 1..=1000 (got {})",
                self.poll_interval_ms
            )));
        }
        for pattern in &self.ignore {
            if pattern.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "observer.ignore cannot include empty entries".to_string(),
                ));
            }
        }
        self.ignore_patterns()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `calvault.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `calvault.toml` from `dir`, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Per-user config file location
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "calvault")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Resolve configuration for the CLI.
    ///
    /// The first file found must load cleanly: an explicit path, then
    /// `calvault.toml` in `cwd`, then the per-user file. Defaults apply when
    /// none exists.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = cwd.join(CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }
        match Self::user_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Absolute or vault-relative task folder
    pub fn tasks_folder(&self) -> Result<PathBuf> {
        if self.tasks_dir.is_absolute() {
            return Ok(self.tasks_dir.clone());
        }
        match &self.vault {
            Some(vault) => Ok(vault.join(&self.tasks_dir)),
            None => Err(Error::InvalidConfig(
                "vault is not set and tasks_dir is relative".to_string(),
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.tasks_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("tasks_dir cannot be empty".to_string()));
        }
        if self.marker.trim().is_empty() {
            return Err(Error::InvalidConfig("marker cannot be empty".to_string()));
        }
        if self.marker.contains(['\n', '\r']) {
            return Err(Error::InvalidConfig(
                "marker must be a single line".to_string(),
            ));
        }
        self.observer.validate()?;
        Ok(())
    }
}
