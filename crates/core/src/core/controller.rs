//! The control panel's state record and its operations.
//!
//! One `Controller` owns the simulation child process and everything the
//! panel shows about it. The UI calls the operations from its event loop and
//! calls [`Controller::poll_tick`] from a repeating timer; nothing here spawns
//! threads.
//!
//! Two sources of truth are kept apart:
//! - the child handle decides whether the *process* is alive;
//! - the status file decides what the *simulation* is doing (paused, done...).

use std::process::Child;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::grid::{GridBoard, GridSnapshot, GridSurface, RedrawKind};
use crate::launcher::{self, LaunchError, SimulationLauncher};
use crate::protocol::{ControlCommand, ProtocolFiles, SimulationStatus};

pub const PAUSE_LABEL: &str = "Pause";
pub const RESUME_LABEL: &str = "Resume";

/// Everything the panel displays besides the grid itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub status_text: String,
    pub iteration_text: String,
    pub pause_label: &'static str,
    pub start_enabled: bool,
    pub pause_enabled: bool,
    pub stop_enabled: bool,
    pub restart_enabled: bool,
}

impl PanelView {
    fn idle(max_iterations: u32) -> Self {
        Self {
            status_text: "Ready to start simulation. Click 'Start Simulation' to begin.".to_string(),
            iteration_text: iteration_label(0, max_iterations),
            pause_label: PAUSE_LABEL,
            start_enabled: true,
            pause_enabled: false,
            stop_enabled: false,
            restart_enabled: false,
        }
    }
}

fn iteration_label(time: u64, max_iterations: u32) -> String {
    format!("Iteration: {} / {}", time, max_iterations)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Monitoring is off; the timer may stop rescheduling.
    Inactive,
    /// The child exited since the last tick. Monitoring is now off.
    ProcessExited,
    Polled {
        status: Option<SimulationStatus>,
        redraw: Option<RedrawKind>,
    },
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    poll_interval: Duration,
    startup_grace: Duration,
    stop_grace: Duration,
    terminate_timeout: Duration,
    restart_delay: Duration,
    settle: Duration,
}

impl Timing {
    fn from_config(config: &PanelConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            startup_grace: Duration::from_millis(config.startup_grace_ms),
            stop_grace: Duration::from_millis(config.stop_grace_ms),
            terminate_timeout: Duration::from_millis(config.terminate_timeout_ms),
            restart_delay: Duration::from_millis(config.restart_delay_ms),
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

pub struct Controller {
    launcher: SimulationLauncher,
    files: ProtocolFiles,
    timing: Timing,
    max_iterations: u32,

    child: Option<Child>,
    paused: bool,
    monitoring: bool,
    preflight_passed: bool,
    /// Locally issued pause/resume not yet confirmed by the status file.
    pending: Option<(ControlCommand, Instant)>,
    last_status: Option<SimulationStatus>,
    /// Set by `start`; the next tick blanks the surface before drawing.
    clear_surface: bool,

    board: GridBoard,
    view: PanelView,
}

impl Controller {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            launcher: SimulationLauncher::from_config(config),
            files: ProtocolFiles::new(&config.workdir),
            timing: Timing::from_config(config),
            max_iterations: config.max_iterations,
            child: None,
            paused: false,
            monitoring: false,
            preflight_passed: false,
            pending: None,
            last_status: None,
            clear_surface: false,
            board: GridBoard::new(),
            view: PanelView::idle(config.max_iterations),
        }
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn board(&self) -> &GridBoard {
        &self.board
    }

    pub fn files(&self) -> &ProtocolFiles {
        &self.files
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    pub fn last_status(&self) -> Option<SimulationStatus> {
        self.last_status
    }

    pub fn poll_interval(&self) -> Duration {
        self.timing.poll_interval
    }

    /// Launch the simulation and tell it to go. No-op while a child is held.
    ///
    /// Preflight checks run before the first launch only; a failure aborts
    /// without starting anything.
    pub fn start(&mut self) -> Result<(), LaunchError> {
        if self.child.is_some() {
            debug!("start ignored: simulation already launched");
            return Ok(());
        }

        if !self.preflight_passed {
            self.launcher.preflight()?;
            self.preflight_passed = true;
        }

        self.files.clear_stale();
        let child = self.launcher.spawn()?;
        self.child = Some(child);

        // The simulation needs a moment before it watches the control file.
        thread::sleep(self.timing.startup_grace);
        self.send(ControlCommand::Start);

        self.paused = false;
        self.pending = None;
        self.last_status = None;
        self.monitoring = true;
        self.board.reset();
        self.clear_surface = true;

        self.view = PanelView {
            status_text: "Simulation started".to_string(),
            iteration_text: iteration_label(0, self.max_iterations),
            pause_label: PAUSE_LABEL,
            start_enabled: false,
            pause_enabled: true,
            stop_enabled: true,
            restart_enabled: true,
        };
        Ok(())
    }

    /// Pause a running simulation, or resume a paused one.
    pub fn toggle_pause(&mut self) {
        if self.child.is_none() {
            return;
        }

        let cmd = if self.paused {
            ControlCommand::Start
        } else {
            ControlCommand::Pause
        };
        self.send(cmd);
        self.pending = Some((cmd, Instant::now()));
        self.set_paused(!self.paused);
        self.view.status_text = if self.paused {
            "Simulation paused"
        } else {
            "Simulation resumed"
        }
        .to_string();
    }

    /// Ask the simulation to stop, then make sure the process is gone.
    /// Best effort: termination problems are logged, never returned.
    pub fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            self.send(ControlCommand::Stop);
            thread::sleep(self.timing.stop_grace);

            match launcher::terminate(&mut child, self.timing.terminate_timeout) {
                Ok(outcome) => info!("simulation stopped ({:?})", outcome),
                Err(e) => warn!("failed to terminate simulation: {}", e),
            }
        }

        self.reset_controls();
        self.view.status_text = "Simulation stopped".to_string();
    }

    /// Stop, give the old process time to let go of the shared files, start.
    pub fn restart(&mut self) -> Result<(), LaunchError> {
        self.stop();
        thread::sleep(self.timing.restart_delay);
        self.start()
    }

    /// Window-close path.
    pub fn shutdown(&mut self) {
        if self.child.is_some() {
            self.stop();
        }
    }

    /// One monitoring pass. Never fails: anything half-written is skipped and
    /// picked up on a later tick.
    pub fn poll_tick(&mut self, surface: &mut impl GridSurface) -> TickOutcome {
        if !self.monitoring {
            return TickOutcome::Inactive;
        }
        if self.clear_surface {
            surface.rebuild(0, 0);
            self.clear_surface = false;
        }

        let exited = match self.child.as_mut() {
            Some(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    info!("simulation exited: {}", status);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    debug!("try_wait failed: {}", e);
                    false
                }
            },
            None => true,
        };

        if exited {
            // Show whatever the final snapshot was before going idle.
            self.refresh_grid(surface);
            self.child = None;
            self.reset_controls();
            self.view.status_text = "Simulation completed".to_string();
            return TickOutcome::ProcessExited;
        }

        let status = self.files.read_status();
        if let Some(status) = status {
            self.reconcile(status);
        }
        let redraw = self.refresh_grid(surface);
        self.refresh_status_text();

        TickOutcome::Polled { status, redraw }
    }

    fn refresh_grid(&mut self, surface: &mut impl GridSurface) -> Option<RedrawKind> {
        let text = self.files.read_grid_text()?;
        let Some(snapshot) = GridSnapshot::parse(&text) else {
            debug!("grid snapshot incomplete; retrying next tick");
            return None;
        };
        let kind = self.board.apply(&snapshot, surface);
        self.view.iteration_text = iteration_label(snapshot.time, self.max_iterations);
        Some(kind)
    }

    /// Fold a self-reported status into local state. The status file wins,
    /// except against a pause/resume we issued moments ago that the
    /// simulation has not read yet.
    fn reconcile(&mut self, status: SimulationStatus) {
        if let Some((cmd, issued_at)) = self.pending {
            let confirmed = matches!(
                (cmd, status),
                (ControlCommand::Pause, SimulationStatus::Paused)
                    | (ControlCommand::Start, SimulationStatus::Running)
            );
            if confirmed || issued_at.elapsed() >= self.timing.settle {
                self.pending = None;
            }
        }
        let settling = self.pending.is_some();

        match status {
            SimulationStatus::Paused if !settling => {
                if !self.paused {
                    info!("simulation paused itself");
                }
                self.set_paused(true);
            }
            SimulationStatus::Running if !settling => self.set_paused(false),
            SimulationStatus::Completed => {
                self.set_paused(false);
                self.view.pause_enabled = false;
            }
            _ => {}
        }
        if self.last_status != Some(status) {
            debug!("status -> {}", status);
        }
        self.last_status = Some(status);
    }

    fn refresh_status_text(&mut self) {
        let text = match (self.last_status, self.paused) {
            (Some(SimulationStatus::Completed), _) => "Simulation completed".to_string(),
            (Some(SimulationStatus::Stopped), _) => "Simulation stopped".to_string(),
            (_, true) => "Simulation paused".to_string(),
            (Some(SimulationStatus::Waiting), _) => {
                "Simulation waiting for start command".to_string()
            }
            _ => match self.board.time() {
                Some(t) => format!("Simulation running - Iteration {}", t),
                None => return,
            },
        };
        self.view.status_text = text;
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.view.pause_label = if paused { RESUME_LABEL } else { PAUSE_LABEL };
    }

    fn reset_controls(&mut self) {
        self.paused = false;
        self.monitoring = false;
        self.pending = None;
        self.view.pause_label = PAUSE_LABEL;
        self.view.start_enabled = true;
        self.view.pause_enabled = false;
        self.view.stop_enabled = false;
        self.view.restart_enabled = false;
    }

    fn send(&self, cmd: ControlCommand) {
        if let Err(e) = self.files.write_command(cmd) {
            warn!("failed to write control command {}: {}", cmd, e);
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TextSurface;

    fn quiet_config(dir: &std::path::Path) -> PanelConfig {
        PanelConfig {
            workdir: dir.to_path_buf(),
            command: vec!["sh".into(), "-c".into(), "sleep 30".into()],
            preflight: Vec::new(),
            startup_grace_ms: 0,
            stop_grace_ms: 0,
            terminate_timeout_ms: 500,
            restart_delay_ms: 0,
            settle_ms: 1000,
            ..PanelConfig::default()
        }
    }

    #[test]
    fn idle_controller_ignores_pause_and_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Controller::new(&quiet_config(dir.path()));
        let mut surface = TextSurface::default();

        c.toggle_pause();
        assert!(!c.is_paused());
        assert!(!dir.path().join("control.txt").exists());
        assert_eq!(c.poll_tick(&mut surface), TickOutcome::Inactive);
        assert!(c.view().start_enabled);
        assert_eq!(c.view().iteration_text, "Iteration: 0 / 10");
    }

    #[test]
    fn failed_preflight_leaves_nothing_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = quiet_config(dir.path());
        cfg.preflight = vec![vec!["definitely-not-a-real-tool-xyz".into()]];
        let mut c = Controller::new(&cfg);

        assert!(c.start().is_err());
        assert!(!c.is_running());
        assert!(!c.is_monitoring());
        assert!(c.view().start_enabled);
    }

    #[cfg(unix)]
    #[test]
    fn pending_pause_outranks_stale_running_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Controller::new(&quiet_config(dir.path()));
        let mut surface = TextSurface::default();
        c.start().unwrap();

        std::fs::write(dir.path().join("simulation_status.txt"), "RUNNING").unwrap();
        c.toggle_pause();
        assert_eq!(std::fs::read_to_string(dir.path().join("control.txt")).unwrap(), "PAUSE");

        c.poll_tick(&mut surface);
        assert!(c.is_paused(), "stale RUNNING must not undo a fresh pause");
        assert_eq!(c.view().pause_label, RESUME_LABEL);

        std::fs::write(dir.path().join("simulation_status.txt"), "PAUSED").unwrap();
        c.poll_tick(&mut surface);
        std::fs::write(dir.path().join("simulation_status.txt"), "RUNNING").unwrap();
        c.poll_tick(&mut surface);
        assert!(!c.is_paused(), "confirmed pause no longer outranks the status file");

        c.stop();
    }

    #[cfg(unix)]
    #[test]
    fn self_reported_pause_and_completion_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Controller::new(&quiet_config(dir.path()));
        let mut surface = TextSurface::default();
        c.start().unwrap();

        std::fs::write(dir.path().join("simulation_status.txt"), "PAUSED").unwrap();
        c.poll_tick(&mut surface);
        assert!(c.is_paused());
        assert_eq!(c.view().status_text, "Simulation paused");

        std::fs::write(dir.path().join("simulation_status.txt"), "COMPLETED").unwrap();
        c.poll_tick(&mut surface);
        assert!(!c.is_paused());
        assert!(!c.view().pause_enabled);
        assert_eq!(c.view().status_text, "Simulation completed");
        assert!(c.is_running(), "status alone does not end the process lifecycle");

        c.stop();
        assert!(!c.is_running());
        assert_eq!(c.view().status_text, "Simulation stopped");
    }
}
