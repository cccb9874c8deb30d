//! Drives the controller against a small shell script that speaks the same
//! file protocol as the real simulation.
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use patchlings::prelude::*;

/// Waits for START, then writes one grid per step until `steps` are done.
/// Honors PAUSE and STOP from the control file.
fn fake_simulation(steps: u32) -> String {
    format!(
        r#"echo WAITING > simulation_status.txt
until [ "$(cat control.txt 2>/dev/null)" = START ]; do sleep 0.02; done
t=0
while [ $t -lt {steps} ]; do
  case "$(cat control.txt 2>/dev/null)" in
    STOP) echo STOPPED > simulation_status.txt; exit 0 ;;
    PAUSE) echo PAUSED > simulation_status.txt ;;
    *) echo RUNNING > simulation_status.txt
       printf '2 3 %d\n🌲🌊🧍\n⬛⬛⬛\n' "$t" > grid_state.txt
       t=$((t+1)) ;;
  esac
  sleep 0.05
done
echo COMPLETED > simulation_status.txt
"#
    )
}

fn config(dir: &Path, script: &str) -> PanelConfig {
    PanelConfig {
        workdir: dir.to_path_buf(),
        command: vec!["sh".into(), "-c".into(), script.into()],
        preflight: Vec::new(),
        poll_interval_ms: 20,
        startup_grace_ms: 50,
        stop_grace_ms: 0,
        terminate_timeout_ms: 1000,
        restart_delay_ms: 0,
        ..PanelConfig::default()
    }
}

/// Tick until `done` holds or `limit` passes.
fn tick_until(
    c: &mut Controller,
    surface: &mut TextSurface,
    limit: Duration,
    mut done: impl FnMut(&Controller, TickOutcome) -> bool,
) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        thread::sleep(c.poll_interval());
        let outcome = c.poll_tick(surface);
        if done(c, outcome) {
            return true;
        }
    }
    false
}

#[test]
fn runs_to_completion_and_shows_final_grid() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = Controller::new(&config(dir.path(), &fake_simulation(3)));
    let mut surface = TextSurface::default();

    c.start().unwrap();
    assert!(c.is_running());
    assert!(!c.view().start_enabled);
    assert_eq!(c.files().read_command(), Some(ControlCommand::Start));

    let exited = tick_until(&mut c, &mut surface, Duration::from_secs(10), |_, o| {
        o == TickOutcome::ProcessExited
    });
    assert!(exited);

    assert!(!c.is_running());
    assert!(!c.is_monitoring());
    assert_eq!(c.view().status_text, "Simulation completed");
    assert!(c.view().start_enabled);
    assert_eq!(c.board().time(), Some(2));
    assert_eq!(c.view().iteration_text, "Iteration: 2 / 10");
    assert_eq!(surface.line(0).as_deref(), Some("🌲🌊🧍"));
    // One blank-out on start, one rebuild for the first 2x3 snapshot.
    assert_eq!(surface.rebuilds(), 2);

    assert_eq!(c.poll_tick(&mut surface), TickOutcome::Inactive);
}

#[test]
fn pause_and_resume_follow_the_status_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = Controller::new(&config(dir.path(), &fake_simulation(10_000)));
    let mut surface = TextSurface::default();
    c.start().unwrap();

    assert!(tick_until(&mut c, &mut surface, Duration::from_secs(10), |c, _| {
        c.board().time().is_some()
    }));

    c.toggle_pause();
    assert!(c.is_paused());
    assert_eq!(c.view().pause_label, "Resume");
    assert!(tick_until(&mut c, &mut surface, Duration::from_secs(10), |c, _| {
        c.last_status() == Some(SimulationStatus::Paused)
    }));
    assert!(c.is_paused());

    // Let any in-flight write land, then the grid must hold still.
    tick_until(&mut c, &mut surface, Duration::from_millis(200), |_, _| false);
    let frozen = c.board().time();
    tick_until(&mut c, &mut surface, Duration::from_millis(300), |_, _| false);
    assert_eq!(c.board().time(), frozen);
    assert_eq!(c.view().status_text, "Simulation paused");

    c.toggle_pause();
    assert!(!c.is_paused());
    assert!(tick_until(&mut c, &mut surface, Duration::from_secs(10), |c, _| {
        c.board().time() > frozen
    }));

    c.stop();
    assert!(!c.is_running());
    assert_eq!(c.files().read_command(), Some(ControlCommand::Stop));
    assert_eq!(c.view().status_text, "Simulation stopped");
    assert!(!c.view().pause_enabled);
}

#[test]
fn start_twice_keeps_the_first_process() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = Controller::new(&config(dir.path(), &fake_simulation(10_000)));
    c.start().unwrap();
    let pid = c.pid();
    c.start().unwrap();
    assert_eq!(c.pid(), pid);
    c.stop();
}

#[test]
fn restart_never_shows_the_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let files = ProtocolFiles::new(dir.path());
    fs::write(files.grid_path(), "1 1 99\nX\n").unwrap();
    fs::write(files.status_path(), "COMPLETED").unwrap();

    let mut c = Controller::new(&config(dir.path(), "sleep 30"));
    let mut surface = TextSurface::default();
    c.start().unwrap();

    assert!(!files.grid_path().exists());
    assert!(!files.status_path().exists());
    assert_eq!(files.read_command(), Some(ControlCommand::Start));

    // The old run's last frame lingers on disk and on screen.
    fs::write(files.grid_path(), "1 1 7\nX\n").unwrap();
    c.poll_tick(&mut surface);
    assert_eq!(c.board().time(), Some(7));

    c.restart().unwrap();
    assert!(c.is_running());
    assert!(!files.grid_path().exists());

    c.poll_tick(&mut surface);
    assert!(surface.rows().is_empty());
    assert_eq!(c.board().time(), None);
    assert_eq!(c.view().iteration_text, "Iteration: 0 / 10");
    c.stop();
}

#[test]
fn stop_tolerates_a_process_that_already_left() {
    let dir = tempfile::tempdir().unwrap();
    let mut c = Controller::new(&config(dir.path(), "exit 0"));
    c.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    c.stop();
    assert!(!c.is_running());
    assert!(c.view().start_enabled);
    assert!(!c.view().stop_enabled);
}
