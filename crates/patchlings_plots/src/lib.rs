//! # patchlings_plots
//!
//! Turns the newest persisted game history into PNG charts.
//!
//! ```no_run
//! let report = patchlings_plots::run("data".as_ref(), ".".as_ref()).unwrap();
//! for chart in &report.charts {
//!     println!("{}", chart.display());
//! }
//! ```

use std::path::{Path, PathBuf};

use patchlings::history::{self, BehaviorSummary, HistoryError, TimeSeries};
use tracing::info;

pub mod charts;

pub use charts::{render_all, AGES_CHART, SURVIVAL_CHART, TERRAIN_CHART, TILES_CHART};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render {chart}: {message}")]
    Render { chart: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct PlotReport {
    pub history_file: PathBuf,
    pub summary: Vec<BehaviorSummary>,
    pub series: TimeSeries,
    pub charts: Vec<PathBuf>,
}

/// Locate, load, summarize and render. Nothing is written unless the history
/// loads cleanly.
pub fn run(data_dir: &Path, out_dir: &Path) -> Result<PlotReport, PlotError> {
    let history_file = history::locate_latest_history(data_dir)?;
    info!("using {}", history_file.display());
    let states = history::load(&history_file)?;

    let summary = history::derive_behavior_summary(&states);
    for s in &summary {
        info!(
            "{:<14} players={:<3} mean unique tiles={:.1}",
            s.behavior, s.players, s.mean_unique_tiles
        );
    }
    let series = history::derive_timeseries(&states);

    let charts = render_all(&summary, &series, out_dir)?;
    Ok(PlotReport {
        history_file,
        summary,
        series,
        charts,
    })
}
