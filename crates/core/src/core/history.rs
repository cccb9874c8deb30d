//! Persisted game history and the statistics derived from it.
//!
//! The simulation writes `data/game_history_<timestamp>.json` once a run
//! completes: a JSON array with one state object per time step.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const HISTORY_PREFIX: &str = "game_history_";

/// Behaviors that always get a series, whether or not they appear in a run.
pub const TRACKED_BEHAVIORS: [&str; 3] = ["RandomWalk", "CautiousWalk", "Stationary"];

/// Land types counted per time step when the board is recorded.
pub const TRACKED_LAND_TYPES: [&str; 5] = ["Grass", "Forest", "Water", "Sand", "Rock"];

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("no game_history_* files found in {0}")]
    NoHistoryFiles(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed history {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A visited tile, written either as `[x, y]` or `{"x": .., "y": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tile {
    Pair(i64, i64),
    Point { x: i64, y: i64 },
}

impl Tile {
    pub fn coords(self) -> (i64, i64) {
        match self {
            Tile::Pair(x, y) | Tile::Point { x, y } => (x, y),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub behavior: String,
    pub alive: bool,
    #[serde(default)]
    pub visited_tiles: Vec<Tile>,
    #[serde(default)]
    pub age: Option<u32>,
}

impl Player {
    /// Size of the visited set; repeated entries count once.
    pub fn unique_tiles(&self) -> usize {
        self.visited_tiles
            .iter()
            .map(|t| t.coords())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub land_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub time: i64,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub board: Option<Board>,
}

pub type GameHistory = Vec<GameState>;

/// Newest `game_history_*` file in `dir`, by creation time.
pub fn locate_latest_history(dir: &Path) -> Result<PathBuf, HistoryError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(HistoryError::NoHistoryFiles(dir.to_path_buf()))
        }
        Err(source) => {
            return Err(HistoryError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let is_history = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(HISTORY_PREFIX));
        if !is_history || !path.is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        // Not every filesystem records birth time.
        let stamp = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        debug!("history candidate {}", path.display());

        let is_newer = match &newest {
            None => true,
            Some((best, best_path)) => stamp > *best || (stamp == *best && path > *best_path),
        };
        if is_newer {
            newest = Some((stamp, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| HistoryError::NoHistoryFiles(dir.to_path_buf()))
}

pub fn load(path: &Path) -> Result<GameHistory, HistoryError> {
    let raw = fs::read_to_string(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let history: GameHistory = serde_json::from_str(&raw).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!("loaded {} states from {}", history.len(), path.display());
    Ok(history)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorSummary {
    pub behavior: String,
    pub players: usize,
    pub mean_unique_tiles: f64,
}

/// Per-behavior player count and mean visited-tile count in the final state.
///
/// Tracked behaviors are always listed (with zeros when absent), followed by
/// any other behavior that appears, in name order.
pub fn derive_behavior_summary(history: &[GameState]) -> Vec<BehaviorSummary> {
    let mut groups: HashMap<&str, (usize, usize)> = HashMap::new();
    if let Some(last) = history.last() {
        for p in &last.players {
            let entry = groups.entry(p.behavior.as_str()).or_default();
            entry.0 += 1;
            entry.1 += p.unique_tiles();
        }
    }

    let mut extra: Vec<&str> = groups
        .keys()
        .copied()
        .filter(|b| !TRACKED_BEHAVIORS.contains(b))
        .collect();
    extra.sort_unstable();

    TRACKED_BEHAVIORS
        .iter()
        .copied()
        .chain(extra)
        .map(|behavior| {
            let (players, tiles) = groups.get(behavior).copied().unwrap_or((0, 0));
            let mean_unique_tiles = if players == 0 {
                0.0
            } else {
                tiles as f64 / players as f64
            };
            BehaviorSummary {
                behavior: behavior.to_string(),
                players,
                mean_unique_tiles,
            }
        })
        .collect()
}

/// One named series aligned with [`TimeSeries::times`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries<T> {
    pub name: String,
    pub values: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    /// `time` of each state, in file order.
    pub times: Vec<i64>,
    /// Alive players per tracked behavior.
    pub alive_by_behavior: Vec<NamedSeries<usize>>,
    pub total_alive: Vec<usize>,
    /// Alive players as a percentage of the first state's player count,
    /// rounded to one decimal.
    pub survival_rate: Vec<f64>,
    /// Mean age of alive players per tracked behavior (0 when unknown).
    pub mean_age_by_behavior: Vec<NamedSeries<f64>>,
    /// Tile counts per tracked land type. Empty when no state has a board.
    pub land_by_type: Vec<NamedSeries<usize>>,
}

impl TimeSeries {
    pub fn has_board_data(&self) -> bool {
        !self.land_by_type.is_empty()
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn derive_timeseries(history: &[GameState]) -> TimeSeries {
    let times: Vec<i64> = history.iter().map(|s| s.time).collect();

    let alive_by_behavior = TRACKED_BEHAVIORS
        .iter()
        .map(|&b| NamedSeries {
            name: b.to_string(),
            values: history
                .iter()
                .map(|s| s.players.iter().filter(|p| p.alive && p.behavior == b).count())
                .collect(),
        })
        .collect();

    let total_alive: Vec<usize> = history
        .iter()
        .map(|s| s.players.iter().filter(|p| p.alive).count())
        .collect();

    // The denominator is fixed at the first state even if players are later
    // removed from the record instead of flagged dead.
    let initial = history.first().map_or(0, |s| s.players.len());
    let survival_rate = total_alive
        .iter()
        .map(|&alive| {
            if initial == 0 {
                0.0
            } else {
                round1(alive as f64 * 100.0 / initial as f64)
            }
        })
        .collect();

    let mean_age_by_behavior = TRACKED_BEHAVIORS
        .iter()
        .map(|&b| NamedSeries {
            name: b.to_string(),
            values: history
                .iter()
                .map(|s| {
                    let ages: Vec<u32> = s
                        .players
                        .iter()
                        .filter(|p| p.alive && p.behavior == b)
                        .filter_map(|p| p.age)
                        .collect();
                    if ages.is_empty() {
                        0.0
                    } else {
                        ages.iter().map(|&a| f64::from(a)).sum::<f64>() / ages.len() as f64
                    }
                })
                .collect(),
        })
        .collect();

    let land_by_type = if history.iter().any(|s| s.board.is_some()) {
        TRACKED_LAND_TYPES
            .iter()
            .map(|&land| NamedSeries {
                name: land.to_string(),
                values: history
                    .iter()
                    .map(|s| {
                        s.board.as_ref().map_or(0, |b| {
                            b.cells.iter().filter(|c| c.land_type == land).count()
                        })
                    })
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    TimeSeries {
        times,
        alive_by_behavior,
        total_alive,
        survival_rate,
        mean_age_by_behavior,
        land_by_type,
    }
}
