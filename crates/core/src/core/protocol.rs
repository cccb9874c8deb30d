//! File protocol shared with the external simulation.
//!
//! Three files live in the shared working directory:
//! - `control.txt`: the latest command (written by us)
//! - `simulation_status.txt`: the simulation's own lifecycle state
//! - `grid_state.txt`: the latest grid snapshot
//!
//! There is no locking. Readers must treat any odd content as "not yet
//! written" and try again on the next poll.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, warn};

pub const CONTROL_FILE: &str = "control.txt";
pub const STATUS_FILE: &str = "simulation_status.txt";
pub const GRID_FILE: &str = "grid_state.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Stop,
}

impl ControlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlCommand::Start => "START",
            ControlCommand::Pause => "PAUSE",
            ControlCommand::Stop => "STOP",
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlCommand {
    type Err = UnknownWord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "START" => Ok(ControlCommand::Start),
            "PAUSE" => Ok(ControlCommand::Pause),
            "STOP" => Ok(ControlCommand::Stop),
            other => Err(UnknownWord(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationStatus {
    Waiting,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl SimulationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulationStatus::Waiting => "WAITING",
            SimulationStatus::Running => "RUNNING",
            SimulationStatus::Paused => "PAUSED",
            SimulationStatus::Stopped => "STOPPED",
            SimulationStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationStatus {
    type Err = UnknownWord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "WAITING" => Ok(SimulationStatus::Waiting),
            "RUNNING" => Ok(SimulationStatus::Running),
            "PAUSED" => Ok(SimulationStatus::Paused),
            "STOPPED" => Ok(SimulationStatus::Stopped),
            "COMPLETED" => Ok(SimulationStatus::Completed),
            other => Err(UnknownWord(other.to_string())),
        }
    }
}

/// A protocol word that is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol word: {0:?}")]
pub struct UnknownWord(pub String);

/// Locations of the three protocol files under one shared directory.
#[derive(Debug, Clone)]
pub struct ProtocolFiles {
    workdir: PathBuf,
}

impl ProtocolFiles {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn control_path(&self) -> PathBuf {
        self.workdir.join(CONTROL_FILE)
    }

    pub fn status_path(&self) -> PathBuf {
        self.workdir.join(STATUS_FILE)
    }

    pub fn grid_path(&self) -> PathBuf {
        self.workdir.join(GRID_FILE)
    }

    /// Overwrite the control file with `cmd`.
    pub fn write_command(&self, cmd: ControlCommand) -> io::Result<()> {
        fs::write(self.control_path(), cmd.as_str())?;
        debug!("control <- {}", cmd);
        Ok(())
    }

    /// Last command written, if any.
    pub fn read_command(&self) -> Option<ControlCommand> {
        let raw = fs::read_to_string(self.control_path()).ok()?;
        raw.parse().ok()
    }

    /// Current self-reported status, or `None` when the file is absent or
    /// holds anything other than a known status word.
    pub fn read_status(&self) -> Option<SimulationStatus> {
        let raw = fs::read_to_string(self.status_path()).ok()?;
        match raw.parse() {
            Ok(status) => Some(status),
            Err(e) => {
                // Usually a write caught halfway.
                debug!("ignoring status file: {}", e);
                None
            }
        }
    }

    /// Raw grid text, or `None` when the file is absent, unreadable or blank.
    pub fn read_grid_text(&self) -> Option<String> {
        let raw = fs::read_to_string(self.grid_path()).ok()?;
        if raw.trim().is_empty() {
            None
        } else {
            Some(raw)
        }
    }

    /// Remove leftovers from a previous run so nothing stale is displayed.
    pub fn clear_stale(&self) {
        for path in [self.control_path(), self.status_path(), self.grid_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed stale {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("could not remove {}: {}", path.display(), e),
            }
        }
    }
}
