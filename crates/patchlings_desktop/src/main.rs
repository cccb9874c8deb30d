//! Patchlings control panel - Slint UI client
//! Launches the simulation and follows it through the shared protocol files.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use patchlings::config::PanelConfig;
use patchlings::controller::{Controller, TickOutcome};
use patchlings::grid::{GridSurface, BLANK_TILE};
use patchlings::history::HistoryError;
use patchlings_plots::PlotError;
use slint::{ComponentHandle, Model, ModelRc, Timer, TimerMode, VecModel};
use tracing::{info, warn};

slint::include_modules!();

/// Grid cells backed by the model the window renders from.
struct SlintSurface {
    cells: Rc<VecModel<GridCell>>,
    width: usize,
}

impl GridSurface for SlintSurface {
    fn rebuild(&mut self, height: usize, width: usize) {
        self.width = width;
        let cells: Vec<GridCell> = (0..height)
            .flat_map(|row| {
                (0..width).map(move |col| GridCell {
                    row: row as i32,
                    col: col as i32,
                    symbol: BLANK_TILE.into(),
                })
            })
            .collect();
        self.cells.set_vec(cells);
    }

    fn set_symbol(&mut self, row: usize, col: usize, symbol: &str) {
        let index = row * self.width + col;
        if let Some(mut cell) = self.cells.row_data(index) {
            cell.symbol = symbol.into();
            self.cells.set_row_data(index, cell);
        }
    }
}

struct Panel {
    ui: slint::Weak<MainWindow>,
    controller: RefCell<Controller>,
    surface: RefCell<SlintSurface>,
    timer: Timer,
    history_dir: PathBuf,
    plots_dir: PathBuf,
}

impl Panel {
    /// Push the controller's view into the window.
    fn sync(&self) {
        let Some(ui) = self.ui.upgrade() else {
            return;
        };
        let controller = self.controller.borrow();
        let view = controller.view();
        ui.set_status_text(view.status_text.as_str().into());
        ui.set_iteration_text(view.iteration_text.as_str().into());
        ui.set_pause_label(view.pause_label.into());
        ui.set_start_enabled(view.start_enabled);
        ui.set_pause_enabled(view.pause_enabled);
        ui.set_stop_enabled(view.stop_enabled);
        ui.set_restart_enabled(view.restart_enabled);
        ui.set_grid_rows(controller.board().height() as i32);
        ui.set_grid_cols(controller.board().width() as i32);
    }

    fn show_message(&self, text: String) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_message(text.into());
        }
    }

    fn tick(&self) {
        let outcome = {
            let mut surface = self.surface.borrow_mut();
            self.controller.borrow_mut().poll_tick(&mut *surface)
        };
        self.sync();
        if matches!(outcome, TickOutcome::Inactive | TickOutcome::ProcessExited) {
            self.timer.stop();
        }
    }

    /// (Re)arm the repeating poll for the current monitoring session.
    fn start_polling(self: &Rc<Self>) {
        let weak: Weak<Panel> = Rc::downgrade(self);
        let interval = self.controller.borrow().poll_interval();
        self.timer.start(TimerMode::Repeated, interval, move || {
            if let Some(panel) = weak.upgrade() {
                panel.tick();
            }
        });
    }

    fn on_start(self: &Rc<Self>) {
        let result = self.controller.borrow_mut().start();
        self.sync();
        match result {
            Ok(()) => self.start_polling(),
            Err(e) => {
                warn!("start failed: {}", e);
                self.show_message(format!("Failed to start simulation:\n{e}"));
            }
        }
    }

    fn on_restart(self: &Rc<Self>) {
        self.timer.stop();
        let result = self.controller.borrow_mut().restart();
        self.sync();
        match result {
            Ok(()) => self.start_polling(),
            Err(e) => {
                warn!("restart failed: {}", e);
                self.show_message(format!("Failed to restart simulation:\n{e}"));
            }
        }
    }

    fn on_toggle_pause(&self) {
        self.controller.borrow_mut().toggle_pause();
        self.sync();
    }

    fn on_stop(&self) {
        self.timer.stop();
        self.controller.borrow_mut().stop();
        self.sync();
    }

    fn on_make_plots(&self) {
        match patchlings_plots::run(&self.history_dir, &self.plots_dir) {
            Ok(report) => {
                let names: Vec<String> = report
                    .charts
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect();
                self.show_message(format!(
                    "Plots saved to {}:\n{}",
                    self.plots_dir.display(),
                    names.join("\n")
                ));
            }
            Err(PlotError::History(HistoryError::NoHistoryFiles(dir))) => {
                self.show_message(format!("No game history files found in {}", dir.display()));
            }
            Err(e) => {
                warn!("plot generation failed: {}", e);
                self.show_message(format!("Failed to generate plots:\n{e}"));
            }
        }
    }

    fn on_close(&self) {
        self.timer.stop();
        self.controller.borrow_mut().shutdown();
    }
}

fn main() -> Result<(), slint::PlatformError> {
    tracing_subscriber::fmt::init();

    let config = PanelConfig::load_default().unwrap_or_else(|e| {
        warn!("using default panel config: {}", e);
        PanelConfig::default()
    });
    info!("simulation workdir: {}", config.workdir.display());

    let ui = MainWindow::new()?;
    let cells = Rc::new(VecModel::<GridCell>::default());
    ui.set_cells(ModelRc::from(cells.clone()));

    let panel = Rc::new(Panel {
        ui: ui.as_weak(),
        controller: RefCell::new(Controller::new(&config)),
        surface: RefCell::new(SlintSurface { cells, width: 0 }),
        timer: Timer::default(),
        history_dir: config.history_dir(),
        plots_dir: config.plots_out_dir(),
    });
    panel.sync();

    {
        let p = panel.clone();
        ui.on_start_clicked(move || p.on_start());
    }
    {
        let p = panel.clone();
        ui.on_pause_clicked(move || p.on_toggle_pause());
    }
    {
        let p = panel.clone();
        ui.on_stop_clicked(move || p.on_stop());
    }
    {
        let p = panel.clone();
        ui.on_restart_clicked(move || p.on_restart());
    }
    {
        let p = panel.clone();
        ui.on_make_plots_clicked(move || p.on_make_plots());
    }
    {
        let ui_weak = ui.as_weak();
        ui.on_dismiss_message(move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_message("".into());
            }
        });
    }
    {
        let p = panel.clone();
        ui.window().on_close_requested(move || {
            p.on_close();
            slint::CloseRequestResponse::HideWindow
        });
    }

    let result = ui.run();
    panel.on_close();
    result
}
