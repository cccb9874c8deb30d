//! Panel configuration.
//!
//! Stored as JSON (`panel.json` in the OS config directory). Every field has
//! a default, so a partial file only overrides what it names.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::paths::AppPaths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Location(String),
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_command() -> Vec<String> {
    vec!["dune".into(), "exec".into(), "patchlings".into()]
}

fn default_headless_args() -> Vec<String> {
    vec!["--".into(), "--gui-headless".into()]
}

fn default_preflight() -> Vec<Vec<String>> {
    vec![
        vec!["dune".into(), "--version".into()],
        vec!["dune".into(), "build".into()],
    ]
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_startup_grace_ms() -> u64 {
    500
}

fn default_stop_grace_ms() -> u64 {
    200
}

fn default_terminate_timeout_ms() -> u64 {
    2000
}

fn default_restart_delay_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_max_iterations() -> u32 {
    10
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_plots_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    /// Shared directory holding the protocol files; also the child's cwd.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Program and arguments that run the simulation.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Append `headless_args` to `command`.
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_headless_args")]
    pub headless_args: Vec<String>,
    /// Commands that must succeed before the first launch.
    #[serde(default = "default_preflight")]
    pub preflight: Vec<Vec<String>>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_terminate_timeout_ms")]
    pub terminate_timeout_ms: u64,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// How long a locally issued pause/resume outranks a disagreeing status file.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Denominator of the "Iteration: t / N" label.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Where `game_history_*.json` files are written (relative to `workdir`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where chart images go (relative to `workdir`).
    #[serde(default = "default_plots_dir")]
    pub plots_dir: PathBuf,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            command: default_command(),
            headless: false,
            headless_args: default_headless_args(),
            preflight: default_preflight(),
            poll_interval_ms: default_poll_interval_ms(),
            startup_grace_ms: default_startup_grace_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            terminate_timeout_ms: default_terminate_timeout_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            settle_ms: default_settle_ms(),
            max_iterations: default_max_iterations(),
            data_dir: default_data_dir(),
            plots_dir: default_plots_dir(),
        }
    }
}

impl PanelConfig {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the OS config directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        let paths = AppPaths::locate().map_err(ConfigError::Location)?;
        Self::load(&paths.config_file())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Full argv of the simulation, headless marker included when enabled.
    pub fn launch_argv(&self) -> Vec<String> {
        let mut argv = self.command.clone();
        if self.headless {
            argv.extend(self.headless_args.iter().cloned());
        }
        argv
    }

    pub fn history_dir(&self) -> PathBuf {
        self.workdir.join(&self.data_dir)
    }

    pub fn plots_out_dir(&self) -> PathBuf {
        self.workdir.join(&self.plots_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
