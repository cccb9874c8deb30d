//! Chart rendering. Every chart goes to a fixed filename and is overwritten
//! on each run.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use patchlings::history::{BehaviorSummary, NamedSeries, TimeSeries};
use plotters::prelude::*;
use tracing::{info, warn};

use crate::PlotError;

pub const SURVIVAL_CHART: &str = "player_survival_over_time.png";
pub const AGES_CHART: &str = "player_ages_over_time.png";
pub const TILES_CHART: &str = "player_unique_tiles.png";
pub const TERRAIN_CHART: &str = "terrain_distribution_over_time.png";

const SIZE: (u32, u32) = (1000, 600);

type DrawResult = Result<(), Box<dyn Error>>;

pub fn render_all(
    summary: &[BehaviorSummary],
    series: &TimeSeries,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, PlotError> {
    fs::create_dir_all(out_dir).map_err(|source| PlotError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(4);
    let mut emit = |name: &'static str, draw: &dyn Fn(&Path) -> DrawResult| {
        let path = out_dir.join(name);
        draw(&path).map_err(|e| PlotError::Render {
            chart: name,
            message: e.to_string(),
        })?;
        info!("chart saved to {}", path.display());
        written.push(path);
        Ok::<(), PlotError>(())
    };

    emit(SURVIVAL_CHART, &|p| draw_survival(series, p))?;
    emit(AGES_CHART, &|p| draw_ages(series, p))?;
    emit(TILES_CHART, &|p| draw_unique_tiles(summary, p))?;
    if series.has_board_data() {
        emit(TERRAIN_CHART, &|p| draw_terrain(series, p))?;
    } else {
        warn!("no board data recorded; terrain chart is a placeholder");
        emit(TERRAIN_CHART, &|p| draw_placeholder(p, "No board data recorded for this run"))?;
    }

    Ok(written)
}

/// x-range covering every time index; widened when there is a single point.
fn time_range(times: &[i64]) -> std::ops::Range<i64> {
    let lo = times.iter().copied().min().unwrap_or(0);
    let hi = times.iter().copied().max().unwrap_or(0);
    if hi > lo {
        lo..hi
    } else {
        lo..lo + 1
    }
}

fn y_ceiling(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn max_of<T: Copy + Into<f64>>(series: &[NamedSeries<T>]) -> f64 {
    series
        .iter()
        .flat_map(|s| s.values.iter().copied().map(Into::into))
        .fold(0.0, f64::max)
}

fn draw_survival(series: &TimeSeries, path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, (SIZE.0, SIZE.1 + 200)).into_drawing_area();
    root.fill(&WHITE)?;
    let (top, bottom) = root.split_vertically((SIZE.1 / 2 + 100) as i32);
    let xs = time_range(&series.times);

    let counts: Vec<NamedSeries<f64>> = series
        .alive_by_behavior
        .iter()
        .map(|s| NamedSeries {
            name: s.name.clone(),
            values: s.values.iter().map(|&v| v as f64).collect(),
        })
        .collect();
    let total_max = series.total_alive.iter().copied().max().unwrap_or(0) as f64;

    let mut chart = ChartBuilder::on(&top)
        .caption("Players Alive Over Time", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(xs.clone(), 0.0..y_ceiling(max_of(&counts).max(total_max)))?;
    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Alive Players")
        .draw()?;

    for (i, s) in counts.iter().enumerate() {
        let points = series.times.iter().copied().zip(s.values.iter().copied());
        chart
            .draw_series(LineSeries::new(points, Palette99::pick(i).stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2))
            });
    }
    let totals = series
        .times
        .iter()
        .copied()
        .zip(series.total_alive.iter().map(|&v| v as f64));
    chart
        .draw_series(LineSeries::new(totals, BLACK.stroke_width(3)))?
        .label("Total")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(3)));
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let mut rate = ChartBuilder::on(&bottom)
        .caption("Survival Rate (% of initial players)", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(xs, 0.0..105.0)?;
    rate.configure_mesh()
        .x_desc("Time Step")
        .y_desc("Survival %")
        .draw()?;
    let points = series
        .times
        .iter()
        .copied()
        .zip(series.survival_rate.iter().copied());
    rate.draw_series(LineSeries::new(points, RED.stroke_width(2)))?;

    root.present()?;
    Ok(())
}

fn draw_ages(series: &TimeSeries, path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Player Ages Over Time", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(
            time_range(&series.times),
            0.0..y_ceiling(max_of(&series.mean_age_by_behavior)),
        )?;
    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Mean Age (alive players)")
        .draw()?;

    for (i, s) in series.mean_age_by_behavior.iter().enumerate() {
        let points = series.times.iter().copied().zip(s.values.iter().copied());
        chart
            .draw_series(LineSeries::new(points, Palette99::pick(i).stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2))
            });
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_unique_tiles(summary: &[BehaviorSummary], path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = summary.len().max(1) as i32;
    let y_max = y_ceiling(summary.iter().map(|s| s.mean_unique_tiles).fold(0.0, f64::max));
    let names: Vec<String> = summary.iter().map(|s| s.behavior.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption("Unique Tiles Visited by Behavior", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Player Behavior")
        .y_desc("Mean Unique Tiles Visited")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(summary.iter().enumerate().map(|(i, s)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i as i32), 0.0),
                (SegmentValue::Exact(i as i32 + 1), s.mean_unique_tiles),
            ],
            Palette99::pick(i).mix(0.8).filled(),
        );
        bar.set_margin(0, 0, 15, 15);
        bar
    }))?;
    chart.draw_series(summary.iter().enumerate().map(|(i, s)| {
        Text::new(
            format!("{:.1} (n={})", s.mean_unique_tiles, s.players),
            (SegmentValue::CenterOf(i as i32), s.mean_unique_tiles),
            ("sans-serif", 14),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_terrain(series: &TimeSeries, path: &Path) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Terrain Composition Over Time", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(
            time_range(&series.times),
            0.0..y_ceiling(
                series
                    .land_by_type
                    .iter()
                    .flat_map(|s| s.values.iter().map(|&v| v as f64))
                    .fold(0.0, f64::max),
            ),
        )?;
    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Tiles")
        .draw()?;

    for (i, s) in series.land_by_type.iter().enumerate() {
        let points = series
            .times
            .iter()
            .copied()
            .zip(s.values.iter().map(|&v| v as f64));
        chart
            .draw_series(LineSeries::new(points, Palette99::pick(i).stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2))
            });
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_placeholder(path: &Path, message: &str) -> DrawResult {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    root.draw(&Text::new(
        message.to_string(),
        (SIZE.0 as i32 / 4, SIZE.1 as i32 / 2),
        ("sans-serif", 28),
    ))?;
    root.present()?;
    Ok(())
}
