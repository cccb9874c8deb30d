//! Launching and terminating the external simulation process.

use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PanelConfig;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no simulation command configured")]
    EmptyCommand,
    #[error("{program} is not installed or not in PATH: {source}")]
    ToolMissing {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed:\n{stderr}")]
    CheckFailed { command: String, stderr: String },
    #[error("failed to start simulation `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// How a running child was brought down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    AlreadyExited,
    Graceful,
    Forced,
}

#[derive(Debug, Clone)]
pub struct SimulationLauncher {
    argv: Vec<String>,
    workdir: PathBuf,
    preflight: Vec<Vec<String>>,
}

impl SimulationLauncher {
    pub fn new(argv: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            workdir: workdir.into(),
            preflight: Vec::new(),
        }
    }

    pub fn from_config(config: &PanelConfig) -> Self {
        Self {
            argv: config.launch_argv(),
            workdir: config.workdir.clone(),
            preflight: config.preflight.clone(),
        }
    }

    pub fn with_preflight(mut self, checks: Vec<Vec<String>>) -> Self {
        self.preflight = checks;
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Run every configured check command; all must exit successfully.
    pub fn preflight(&self) -> Result<(), LaunchError> {
        for check in &self.preflight {
            let Some((program, args)) = check.split_first() else {
                continue;
            };
            let command = check.join(" ");
            debug!("preflight: {}", command);

            let output = Command::new(program)
                .args(args)
                .current_dir(&self.workdir)
                .stdin(Stdio::null())
                .output()
                .map_err(|source| LaunchError::ToolMissing {
                    program: program.clone(),
                    source,
                })?;

            if !output.status.success() {
                return Err(LaunchError::CheckFailed {
                    command,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn spawn(&self) -> Result<Child, LaunchError> {
        let (program, args) = self.argv.split_first().ok_or(LaunchError::EmptyCommand)?;
        let child = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: self.argv.join(" "),
                source,
            })?;
        info!("simulation started (pid {})", child.id());
        Ok(child)
    }
}

/// Ask the child to exit, wait up to `timeout`, then kill it.
pub fn terminate(child: &mut Child, timeout: Duration) -> io::Result<TerminateOutcome> {
    if child.try_wait()?.is_some() {
        return Ok(TerminateOutcome::AlreadyExited);
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
            warn!("SIGTERM to pid {} failed: {}", child.id(), e);
        }
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(TerminateOutcome::Graceful);
            }
            if std::time::Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        warn!("pid {} ignored SIGTERM for {:?}; killing", child.id(), timeout);
    }
    #[cfg(not(unix))]
    let _ = timeout;

    match child.kill() {
        Ok(()) => {}
        // Exited between the last poll and the kill.
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => return Err(e),
    }
    child.wait()?;
    Ok(TerminateOutcome::Forced)
}
