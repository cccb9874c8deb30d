//! Headless control panel for the Patchlings simulation.
//!
//! Examples:
//!   patchlings-cli run --headless
//!   patchlings-cli send pause
//!   patchlings-cli status
//!   patchlings-cli grid
//!   patchlings-cli paths
//!   patchlings-cli init-config
//!
//! Configuration comes from `<config dir>/patchlings/panel.json`; override with
//! `--config path`. `--workdir dir` overrides the shared protocol directory.

use std::path::PathBuf;
use std::process;
use std::thread;

use patchlings::config::PanelConfig;
use patchlings::controller::{Controller, TickOutcome};
use patchlings::grid::{GridBoard, GridSnapshot, TextSurface};
use patchlings::paths::AppPaths;
use patchlings::protocol::{ControlCommand, ProtocolFiles};
use tracing::info;

fn usage() -> ! {
    eprintln!(
        "usage: patchlings-cli [--config PATH] [--workdir DIR] <command>\n\
         \n\
         commands:\n\
         \x20 run [--headless]        launch the simulation and follow it until it exits\n\
         \x20 send start|pause|stop   write a control command for a running simulation\n\
         \x20 status                  print the self-reported status and time step\n\
         \x20 grid                    print the latest grid snapshot\n\
         \x20 paths                   print configuration locations\n\
         \x20 init-config             write a default panel.json if none exists"
    );
    process::exit(2);
}

fn make_error(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

struct Options {
    config_path: Option<PathBuf>,
    workdir: Option<PathBuf>,
    headless: bool,
    rest: Vec<String>,
}

fn parse_options(raw: Vec<String>) -> Options {
    let mut opts = Options {
        config_path: None,
        workdir: None,
        headless: false,
        rest: Vec::new(),
    };
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                opts.config_path = Some(it.next().map(PathBuf::from).unwrap_or_else(|| usage()))
            }
            "--workdir" => {
                opts.workdir = Some(it.next().map(PathBuf::from).unwrap_or_else(|| usage()))
            }
            "--headless" => opts.headless = true,
            "-h" | "--help" => usage(),
            _ => opts.rest.push(arg),
        }
    }
    opts
}

fn load_config(opts: &Options) -> PanelConfig {
    let loaded = match &opts.config_path {
        Some(path) => PanelConfig::load(path),
        None => PanelConfig::load_default(),
    };
    let mut config = loaded.unwrap_or_else(|e| make_error(&e.to_string()));
    if let Some(dir) = &opts.workdir {
        config.workdir = dir.clone();
    }
    if opts.headless {
        config.headless = true;
    }
    config
}

fn run(config: &PanelConfig) {
    let mut controller = Controller::new(config);
    let mut surface = TextSurface::default();

    if let Err(e) = controller.start() {
        make_error(&e.to_string());
    }
    println!("{}", controller.view().status_text);

    let mut last_time = None;
    let mut last_status_text = String::new();
    loop {
        thread::sleep(controller.poll_interval());
        let outcome = controller.poll_tick(&mut surface);

        let board = controller.board();
        if board.time().is_some() && board.time() != last_time {
            last_time = board.time();
            println!("{}", controller.view().iteration_text);
            print!("{}", board.render_text());
        }
        let view = controller.view();
        if view.status_text != last_status_text {
            last_status_text.clone_from(&view.status_text);
            println!("{}", last_status_text);
        }

        if matches!(outcome, TickOutcome::ProcessExited | TickOutcome::Inactive) {
            break;
        }
    }
    info!("monitoring finished");
}

fn main() {
    tracing_subscriber::fmt::init();

    let opts = parse_options(std::env::args().skip(1).collect());
    if opts.rest.is_empty() {
        usage();
    }

    match opts.rest[0].as_str() {
        "run" => run(&load_config(&opts)),
        "send" => {
            if opts.rest.len() < 2 {
                usage();
            }
            let cmd: ControlCommand = opts.rest[1]
                .to_uppercase()
                .parse()
                .unwrap_or_else(|_| make_error("send takes start|pause|stop"));
            let config = load_config(&opts);
            let files = ProtocolFiles::new(&config.workdir);
            if let Err(e) = files.write_command(cmd) {
                make_error(&format!("failed to write {}: {e}", files.control_path().display()));
            }
            println!("sent {cmd}");
        }
        "status" => {
            let config = load_config(&opts);
            let files = ProtocolFiles::new(&config.workdir);
            match files.read_status() {
                Some(status) => println!("status: {status}"),
                None => println!("status: (none)"),
            }
            match files.read_command() {
                Some(cmd) => println!("last command: {cmd}"),
                None => println!("last command: (none)"),
            }
            match files.read_grid_text().as_deref().and_then(GridSnapshot::parse) {
                Some(snap) => println!(
                    "grid: {}x{} at iteration {} / {}",
                    snap.height, snap.width, snap.time, config.max_iterations
                ),
                None => println!("grid: (none)"),
            }
        }
        "grid" => {
            let config = load_config(&opts);
            let files = ProtocolFiles::new(&config.workdir);
            let Some(snap) = files.read_grid_text().as_deref().and_then(GridSnapshot::parse) else {
                make_error("no complete grid snapshot available");
            };
            let mut board = GridBoard::new();
            board.apply(&snap, &mut TextSurface::default());
            println!("time {}", snap.time);
            print!("{}", board.render_text());
        }
        "paths" => match AppPaths::locate() {
            Ok(paths) => {
                println!("Config directory: {}", paths.config_dir().display());
                println!("Config file: {}", paths.config_file().display());
            }
            Err(e) => make_error(&e),
        },
        "init-config" => {
            let paths = AppPaths::new().unwrap_or_else(|e| make_error(&e));
            let path = opts.config_path.clone().unwrap_or_else(|| paths.config_file());
            if path.exists() {
                println!("{} already exists", path.display());
                return;
            }
            if let Err(e) = PanelConfig::default().save(&path) {
                make_error(&e.to_string());
            }
            println!("wrote {}", path.display());
        }
        _ => usage(),
    }
}
