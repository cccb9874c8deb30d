//! Rendering a usable history: the four fixed charts, rewritten on every run.

use std::fs;
use std::path::{Path, PathBuf};

use patchlings::history;
use patchlings_plots::{render_all, run, AGES_CHART, SURVIVAL_CHART, TERRAIN_CHART, TILES_CHART};
use serde_json::json;

fn write_history(dir: &Path, name: &str, with_board: bool) {
    let board = |land: &[&str]| {
        json!({ "cells": land.iter().map(|l| json!({ "land_type": l })).collect::<Vec<_>>() })
    };
    let mut states = vec![
        json!({
            "time": 0,
            "players": [
                { "behavior": "RandomWalk", "alive": true, "visited_tiles": [[0, 0]], "age": 1 },
                { "behavior": "Stationary", "alive": true, "visited_tiles": [{ "x": 2, "y": 2 }], "age": 1 },
            ],
        }),
        json!({
            "time": 1,
            "players": [
                { "behavior": "RandomWalk", "alive": true, "visited_tiles": [[0, 0], [0, 1]], "age": 2 },
                { "behavior": "Stationary", "alive": false, "visited_tiles": [{ "x": 2, "y": 2 }], "age": 1 },
            ],
        }),
    ];
    if with_board {
        states[0]["board"] = board(&["Grass", "Water", "Grass"]);
        states[1]["board"] = board(&["Grass", "Sand", "Rock"]);
    }
    fs::write(dir.join(name), serde_json::to_string(&states).unwrap()).unwrap();
}

fn expected(out: &Path) -> Vec<PathBuf> {
    [SURVIVAL_CHART, AGES_CHART, TILES_CHART, TERRAIN_CHART]
        .iter()
        .map(|name| out.join(name))
        .collect()
}

fn pngs_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

#[test]
fn writes_the_four_fixed_charts_and_overwrites_them() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_history(data.path(), "game_history_1.json", true);

    let report = run(data.path(), out.path()).unwrap();
    assert_eq!(report.charts, expected(out.path()));
    assert!(report.series.has_board_data());
    for chart in &report.charts {
        assert!(fs::metadata(chart).unwrap().len() > 0, "{}", chart.display());
    }
    assert_eq!(
        pngs_in(out.path()),
        vec![
            "player_ages_over_time.png",
            "player_survival_over_time.png",
            "player_unique_tiles.png",
            "terrain_distribution_over_time.png",
        ]
    );

    // A second run lands on the same files rather than adding new ones.
    let again = run(data.path(), out.path()).unwrap();
    assert_eq!(again.charts, report.charts);
    assert_eq!(pngs_in(out.path()).len(), 4);
}

#[test]
fn missing_board_still_yields_a_terrain_placeholder() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_history(data.path(), "game_history_1.json", false);

    let report = run(data.path(), out.path()).unwrap();
    assert!(!report.series.has_board_data());
    assert_eq!(report.charts, expected(out.path()));
    let terrain = out.path().join(TERRAIN_CHART);
    assert!(fs::metadata(&terrain).unwrap().len() > 0);
}

#[test]
fn render_all_creates_a_missing_output_directory() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_history(data.path(), "game_history_7.json", true);

    let states = history::load(&data.path().join("game_history_7.json")).unwrap();
    let summary = history::derive_behavior_summary(&states);
    let series = history::derive_timeseries(&states);

    let nested = out.path().join("plots").join("latest");
    let charts = render_all(&summary, &series, &nested).unwrap();
    assert_eq!(charts, expected(&nested));
    assert!(charts.iter().all(|p| p.is_file()));
}
