//! # patchlings
//!
//! Control-panel plumbing for the external Patchlings grid simulation.
//!
//! The simulation itself runs as a separate process. This crate launches it,
//! talks to it through three plain-text files in a shared working directory,
//! and turns the JSON history it leaves behind into chart-ready series.
//!
//! ## Quick Start
//!
//! ```no_run
//! use patchlings::prelude::*;
//!
//! let config = PanelConfig::default();
//! let mut controller = Controller::new(&config);
//! let mut surface = TextSurface::default();
//!
//! controller.start().expect("simulation failed to launch");
//! loop {
//!     std::thread::sleep(controller.poll_interval());
//!     if let TickOutcome::ProcessExited = controller.poll_tick(&mut surface) {
//!         break;
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: control/status/grid files shared with the simulation
//! - [`grid`]: grid snapshot parsing and the flicker-free redraw board
//! - [`launcher`]: preflight checks, spawning and two-stage termination
//! - [`controller`]: the panel state record and its operations
//! - [`history`]: persisted game history and derived series
//! - [`config`] / [`paths`]: panel configuration and its location

#[path = "core/protocol.rs"]
pub mod protocol;

#[path = "core/grid.rs"]
pub mod grid;

#[path = "core/launcher.rs"]
pub mod launcher;

#[path = "core/controller.rs"]
pub mod controller;

#[path = "core/history.rs"]
pub mod history;

#[path = "core/config.rs"]
pub mod config;

#[path = "core/paths.rs"]
pub mod paths;

/// Prelude module for convenient imports.
///
/// ```
/// use patchlings::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::PanelConfig;
    pub use crate::controller::{Controller, PanelView, TickOutcome};
    pub use crate::grid::{GridBoard, GridSnapshot, GridSurface, RedrawKind, TextSurface};
    pub use crate::history::{
        derive_behavior_summary, derive_timeseries, load, locate_latest_history,
        BehaviorSummary, GameHistory, HistoryError, TimeSeries,
    };
    pub use crate::launcher::{LaunchError, SimulationLauncher};
    pub use crate::protocol::{ControlCommand, ProtocolFiles, SimulationStatus};
}
