//! Renders charts for the newest game history.
//!
//! Examples:
//!   patchlings-plots
//!   patchlings-plots --data data --out plots
//!
//! Without flags the data and output directories come from the panel config.

use std::path::PathBuf;
use std::process;

use patchlings::config::PanelConfig;
use patchlings::history::HistoryError;
use patchlings_plots::PlotError;

fn usage() -> ! {
    eprintln!("usage: patchlings-plots [--config PATH] [--data DIR] [--out DIR]");
    process::exit(2);
}

fn make_error(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut config_path: Option<PathBuf> = None;
    let mut data_dir: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(args.next().map(PathBuf::from).unwrap_or_else(|| usage())),
            "--data" => data_dir = Some(args.next().map(PathBuf::from).unwrap_or_else(|| usage())),
            "--out" => out_dir = Some(args.next().map(PathBuf::from).unwrap_or_else(|| usage())),
            "-h" | "--help" => usage(),
            other => make_error(&format!("unexpected argument: {other}")),
        }
    }

    let config = match &config_path {
        Some(path) => PanelConfig::load(path),
        None => PanelConfig::load_default(),
    }
    .unwrap_or_else(|e| make_error(&e.to_string()));

    let data_dir = data_dir.unwrap_or_else(|| config.history_dir());
    let out_dir = out_dir.unwrap_or_else(|| config.plots_out_dir());

    match patchlings_plots::run(&data_dir, &out_dir) {
        Ok(report) => {
            println!("history: {}", report.history_file.display());
            for s in &report.summary {
                println!(
                    "  {:<14} {:>3} players  {:>6.1} unique tiles",
                    s.behavior, s.players, s.mean_unique_tiles
                );
            }
            for chart in &report.charts {
                println!("wrote {}", chart.display());
            }
        }
        Err(PlotError::History(HistoryError::NoHistoryFiles(dir))) => {
            make_error(&format!("No game history files found in {}", dir.display()))
        }
        Err(e) => make_error(&e.to_string()),
    }
}
