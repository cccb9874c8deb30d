//! Grid snapshots written by the simulation and the board that displays them.
//!
//! Wire format (UTF-8):
//!
//! ```text
//! <height> <width> <time>
//! <width symbols>      x height
//! ```
//!
//! One symbol is one `char`; emoji tiles are multi-byte but still one symbol.

use std::fmt::Write as _;

/// Symbol shown in freshly created cells until a snapshot fills them in.
pub const BLANK_TILE: &str = "⬜";

/// Largest board accepted from the wire. Anything bigger is treated like any
/// other malformed header.
pub const MAX_CELLS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    pub height: usize,
    pub width: usize,
    pub time: u64,
    /// Rows as written. A row may be shorter than `width`.
    pub rows: Vec<Vec<String>>,
}

impl GridSnapshot {
    /// Parse snapshot text. Returns `None` for anything that does not look
    /// like a complete header followed by at least one row; the caller keeps
    /// whatever it displayed before.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.trim().lines();
        let header = lines.next()?;

        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 3 {
            return None;
        }
        let height: usize = fields[0].parse().ok()?;
        let width: usize = fields[1].parse().ok()?;
        let time: u64 = fields[2].parse().ok()?;
        if height.checked_mul(width)? > MAX_CELLS {
            return None;
        }

        let body: Vec<&str> = lines.collect();
        if body.is_empty() {
            return None;
        }

        let rows = body
            .into_iter()
            .take(height)
            .map(|line| {
                line.trim_end_matches('\r')
                    .chars()
                    .take(width)
                    .map(String::from)
                    .collect()
            })
            .collect();

        Some(Self {
            height,
            width,
            time,
            rows,
        })
    }
}

/// Presentation seam: whatever actually draws the cells.
pub trait GridSurface {
    /// Drop every cell and create `height * width` blank ones.
    fn rebuild(&mut self, height: usize, width: usize);

    /// Change the symbol of one existing cell.
    fn set_symbol(&mut self, row: usize, col: usize, symbol: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawKind {
    /// Dimensions changed; every cell was recreated.
    Rebuilt,
    /// Same dimensions; this many cells changed symbol in place.
    Patched(usize),
}

/// What is currently on screen.
#[derive(Debug, Clone, Default)]
pub struct GridBoard {
    height: usize,
    width: usize,
    time: Option<u64>,
    cells: Vec<String>,
}

impl GridBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Time step of the last applied snapshot.
    pub fn time(&self) -> Option<u64> {
        self.time
    }

    pub fn symbol(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.cells.get(row * self.width + col).map(String::as_str)
    }

    /// Bring the board (and `surface`) in line with `snapshot`.
    pub fn apply(&mut self, snapshot: &GridSnapshot, surface: &mut impl GridSurface) -> RedrawKind {
        let rebuilt = snapshot.height != self.height || snapshot.width != self.width;
        if rebuilt {
            self.height = snapshot.height;
            self.width = snapshot.width;
            self.cells = vec![BLANK_TILE.to_string(); self.height * self.width];
            surface.rebuild(self.height, self.width);
        }
        self.time = Some(snapshot.time);

        let mut changed = 0usize;
        for (r, row) in snapshot.rows.iter().enumerate().take(self.height) {
            for (c, symbol) in row.iter().enumerate().take(self.width) {
                let idx = r * self.width + c;
                if self.cells[idx] != *symbol {
                    self.cells[idx].clone_from(symbol);
                    surface.set_symbol(r, c, symbol);
                    changed += 1;
                }
            }
        }

        if rebuilt {
            RedrawKind::Rebuilt
        } else {
            RedrawKind::Patched(changed)
        }
    }

    /// Forget everything, e.g. when a new run starts.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn render_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.iter().map(String::len).sum::<usize>() + self.height);
        for r in 0..self.height {
            for c in 0..self.width {
                let _ = write!(out, "{}", self.cells[r * self.width + c]);
            }
            out.push('\n');
        }
        out
    }
}

/// In-memory surface used by the CLI and by tests.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    rows: Vec<Vec<String>>,
    rebuilds: usize,
    updates: usize,
}

impl TextSurface {
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn line(&self, row: usize) -> Option<String> {
        self.rows.get(row).map(|r| r.concat())
    }
}

impl GridSurface for TextSurface {
    fn rebuild(&mut self, height: usize, width: usize) {
        self.rows = vec![vec![BLANK_TILE.to_string(); width]; height];
        self.rebuilds += 1;
    }

    fn set_symbol(&mut self, row: usize, col: usize, symbol: &str) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = symbol.to_string();
            self.updates += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_text(board: &mut GridBoard, surface: &mut TextSurface, text: &str) -> Option<RedrawKind> {
        GridSnapshot::parse(text).map(|snap| board.apply(&snap, surface))
    }

    #[test]
    fn parses_multibyte_symbols_one_per_cell() {
        let snap = GridSnapshot::parse("2 3 7\n🌲🌊🧍\n⬛⬛⬛\n").unwrap();
        assert_eq!((snap.height, snap.width, snap.time), (2, 3, 7));
        assert_eq!(snap.rows[0], vec!["🌲", "🌊", "🧍"]);
        assert_eq!(snap.rows[1].len(), 3);
    }

    #[test]
    fn rejects_bad_headers_and_headers_alone() {
        for text in [
            "",
            "2 2 1",
            "2 2\nab\ncd",
            "2 2 1 9\nab\ncd",
            "two 2 1\nab\ncd",
            "2 2 -1\nab\ncd",
        ] {
            assert!(GridSnapshot::parse(text).is_none(), "accepted {text:?}");
        }
    }

    #[test]
    fn rejects_oversized_dimensions() {
        for text in [
            "4294967296 4294967296 0\nab\n",
            "18446744073709551615 2 0\nab\n",
            "100000 100000 0\nab\n",
        ] {
            assert!(GridSnapshot::parse(text).is_none(), "accepted {text:?}");
        }

        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();
        apply_text(&mut board, &mut surface, "1 2 4\nab").unwrap();
        assert!(apply_text(&mut board, &mut surface, "100000 100000 5\nab").is_none());
        assert_eq!(board.time(), Some(4));
        assert_eq!(surface.rebuilds(), 1);

        let side = 1 << 10;
        assert!(GridSnapshot::parse(&format!("{side} {side} 0\nab\n")).is_some());
    }

    #[test]
    fn rejected_text_leaves_board_untouched() {
        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();
        apply_text(&mut board, &mut surface, "1 2 4\nab").unwrap();

        assert!(apply_text(&mut board, &mut surface, "1 2\nzz").is_none());
        assert!(apply_text(&mut board, &mut surface, "1 2 5").is_none());

        assert_eq!(board.time(), Some(4));
        assert_eq!(board.symbol(0, 0), Some("a"));
        assert_eq!(surface.line(0).as_deref(), Some("ab"));
    }

    #[test]
    fn same_dimensions_patch_in_place() {
        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();

        assert_eq!(
            apply_text(&mut board, &mut surface, "2 2 0\nab\ncd"),
            Some(RedrawKind::Rebuilt)
        );
        assert_eq!(
            apply_text(&mut board, &mut surface, "2 2 1\nab\nxd"),
            Some(RedrawKind::Patched(1))
        );
        assert_eq!(
            apply_text(&mut board, &mut surface, "2 2 2\nab\nxd"),
            Some(RedrawKind::Patched(0))
        );

        assert_eq!(surface.rebuilds(), 1);
        assert_eq!(surface.line(1).as_deref(), Some("xd"));
        assert_eq!(board.time(), Some(2));
    }

    #[test]
    fn dimension_change_rebuilds() {
        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();
        apply_text(&mut board, &mut surface, "1 1 0\na").unwrap();
        let kind = apply_text(&mut board, &mut surface, "2 1 1\nb\nc").unwrap();

        assert_eq!(kind, RedrawKind::Rebuilt);
        assert_eq!(surface.rebuilds(), 2);
        assert_eq!(board.render_text(), "b\nc\n");
    }

    #[test]
    fn short_rows_keep_previous_symbols() {
        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();
        apply_text(&mut board, &mut surface, "2 3 0\nabc\ndef").unwrap();
        apply_text(&mut board, &mut surface, "2 3 1\nx\nyz").unwrap();

        assert_eq!(board.render_text(), "xbc\nyzf\n");
        assert_eq!(surface.line(0).as_deref(), Some("xbc"));
    }

    #[test]
    fn missing_rows_after_rebuild_stay_blank() {
        let mut board = GridBoard::new();
        let mut surface = TextSurface::default();
        apply_text(&mut board, &mut surface, "2 2 0\nab").unwrap();

        assert_eq!(board.symbol(1, 0), Some(BLANK_TILE));
        assert_eq!(board.symbol(2, 0), None);
    }
}
