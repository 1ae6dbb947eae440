//! Board geometry, cells, continuous positions and square encoding.
//!
//! A [`Cell`] is an integer `(row, col)` pair. A [`Position`] is the
//! continuous counterpart used while a piece slides between cells; rounding a
//! position gives the cell the piece currently occupies for collision and
//! admission purposes.
//!
//! Squares use the two-part algebraic form: a file letter for the column
//! (`a` = column 0) followed by a rank number for the row (`1` = row 0), so
//! `"e2"` is `Cell { row: 1, col: 4 }`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A discrete board cell.
///
/// Coordinates are signed so that relative offsets can be added freely; use
/// [`Board::contains`] to check that a cell is on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    /// Row index, `0 <= row < height` when on the board.
    pub row: i32,
    /// Column index, `0 <= col < width` when on the board.
    pub col: i32,
}

impl Cell {
    /// Create a cell from a row and a column.
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Offset this cell by `(d_row, d_col)`, saturating at the `i32` range.
    ///
    /// A saturated cell is never on any board, so callers filter it out with
    /// [`Board::contains`].
    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row.saturating_add(d_row), self.col.saturating_add(d_col))
    }

    /// Straight-line distance in cells.
    pub fn euclidean(self, other: Cell) -> f64 {
        let dr = f64::from(other.row - self.row);
        let dc = f64::from(other.col - self.col);
        (dr * dr + dc * dc).sqrt()
    }

    /// King-move distance: adjacent cells (including diagonals) are 1 apart.
    pub fn chebyshev(self, other: Cell) -> u32 {
        let dr = (other.row - self.row).unsigned_abs();
        let dc = (other.col - self.col).unsigned_abs();
        dr.max(dc)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<Cell> for Position {
    fn from(cell: Cell) -> Self {
        Position {
            row: f64::from(cell.row),
            col: f64::from(cell.col),
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A continuous position in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Fractional row.
    pub row: f64,
    /// Fractional column.
    pub col: f64,
}

impl Position {
    /// Linear interpolation from `from` to `to` by `t` in `[0, 1]`.
    pub fn lerp(from: Cell, to: Cell, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let a = Position::from(from);
        let b = Position::from(to);
        Self {
            row: a.row + (b.row - a.row) * t,
            col: a.col + (b.col - a.col) * t,
        }
    }

    /// The nearest cell (halves round away from zero).
    pub fn nearest_cell(self) -> Cell {
        Cell::new(self.row.round() as i32, self.col.round() as i32)
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Fixed board geometry for a game session.
///
/// `cell_px` is carried for the rendering collaborator only; the core never
/// reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Pixel size of one cell, for rendering.
    #[serde(default = "default_cell_px")]
    pub cell_px: u32,
}

fn default_cell_px() -> u32 {
    80
}

impl Default for Board {
    /// A standard 8x8 board with 80px cells.
    fn default() -> Self {
        Self::new(8, 8)
    }
}

impl Board {
    /// Create a board with the default pixel cell size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cell_px: default_cell_px(),
        }
    }

    /// Whether `cell` lies on the board.
    pub fn contains(&self, cell: Cell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as u32) < self.height
            && (cell.col as u32) < self.width
    }

    /// Return `cell` unchanged if it is on the board.
    pub fn check(&self, cell: Cell) -> Result<Cell, CoreError> {
        if self.contains(cell) {
            Ok(cell)
        } else {
            Err(CoreError::OutOfBounds {
                cell,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Encode a cell as an algebraic square (`(1, 4)` -> `"e2"`).
    ///
    /// Columns beyond `z` have no letter; the cell is still encoded (with
    /// `?` as the file) so that diagnostics never fail.
    pub fn square(&self, cell: Cell) -> String {
        let file = u8::try_from(cell.col)
            .ok()
            .filter(|c| *c < 26)
            .map_or('?', |c| char::from(b'a' + c));
        format!("{file}{}", cell.row + 1)
    }

    /// Decode an algebraic square, rejecting anything off the board.
    pub fn parse_square(&self, square: &str) -> Result<Cell, CoreError> {
        let invalid = || CoreError::InvalidSquare {
            square: square.to_owned(),
        };
        let mut chars = square.chars();
        let file = chars.next().ok_or_else(invalid)?.to_ascii_lowercase();
        if !file.is_ascii_lowercase() {
            return Err(invalid());
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let rank: i32 = digits.parse().map_err(|_| invalid())?;
        if rank < 1 {
            return Err(invalid());
        }
        let col = i32::from(file as u8 - b'a');
        self.check(Cell::new(rank - 1, col))
    }

    /// Iterate every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32)
            .flat_map(move |row| (0..self.width as i32).map(move |col| Cell::new(row, col)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_encoding_matches_file_and_rank() {
        let board = Board::default();
        assert_eq!(board.square(Cell::new(1, 4)), "e2");
        assert_eq!(board.square(Cell::new(0, 0)), "a1");
        assert_eq!(board.square(Cell::new(7, 7)), "h8");
        assert_eq!(board.parse_square("e2"), Ok(Cell::new(1, 4)));
        assert_eq!(board.parse_square("H8"), Ok(Cell::new(7, 7)));
    }

    #[test]
    fn parse_square_rejects_garbage_and_off_board() {
        let board = Board::default();
        assert!(matches!(
            board.parse_square(""),
            Err(CoreError::InvalidSquare { .. })
        ));
        assert!(matches!(
            board.parse_square("e0"),
            Err(CoreError::InvalidSquare { .. })
        ));
        assert!(matches!(
            board.parse_square("4e"),
            Err(CoreError::InvalidSquare { .. })
        ));
        assert!(matches!(
            board.parse_square("i1"),
            Err(CoreError::OutOfBounds { .. })
        ));
        assert!(matches!(
            board.parse_square("a9"),
            Err(CoreError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rank_must_be_plain_digits() {
        let board = Board::default();
        for square in ["e+2", "e-2", "e 2", "e2 ", "e"] {
            assert!(
                matches!(board.parse_square(square), Err(CoreError::InvalidSquare { .. })),
                "{square:?} should not decode"
            );
        }
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let far = Cell::new(1, 1).offset(i32::MAX, i32::MIN);
        assert_eq!(far, Cell::new(i32::MAX, i32::MIN + 1));
        assert!(!Board::default().contains(far));
    }

    #[test]
    fn larger_boards_accept_multi_digit_ranks() {
        let board = Board::new(10, 12);
        assert_eq!(board.parse_square("j12"), Ok(Cell::new(11, 9)));
        assert_eq!(board.square(Cell::new(11, 9)), "j12");
    }

    #[test]
    fn distances() {
        let a = Cell::new(0, 0);
        assert_eq!(a.chebyshev(Cell::new(1, 1)), 1);
        assert_eq!(a.chebyshev(Cell::new(3, -2)), 3);
        assert!((a.euclidean(Cell::new(3, 4)) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn lerp_and_rounding() {
        let p = Position::lerp(Cell::new(6, 4), Cell::new(5, 4), 0.4);
        assert!((p.row - 5.6).abs() < 1e-9);
        assert_eq!(p.nearest_cell(), Cell::new(6, 4));

        let p = Position::lerp(Cell::new(6, 4), Cell::new(5, 4), 0.6);
        assert_eq!(p.nearest_cell(), Cell::new(5, 4));

        // t is clamped.
        let p = Position::lerp(Cell::new(0, 0), Cell::new(2, 2), 3.0);
        assert_eq!(p, Position::from(Cell::new(2, 2)));
    }

    #[test]
    fn contains_and_cells() {
        let board = Board::new(3, 2);
        assert!(board.contains(Cell::new(1, 2)));
        assert!(!board.contains(Cell::new(2, 0)));
        assert!(!board.contains(Cell::new(0, -1)));
        assert_eq!(board.cells().count(), 6);
    }
}
