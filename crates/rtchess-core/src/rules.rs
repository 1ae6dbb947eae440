//! Per-piece-type move offsets.
//!
//! A [`MoveRuleSet`] is a static table of relative `(dx, dy)` offsets: `dx`
//! moves along columns, `dy` along rows. It is loaded once per piece type and
//! shared read-only (behind an `Arc`) by every piece of that type.
//!
//! # File format
//!
//! One offset per line, `dx,dy`. Blank lines and lines starting with `#` are
//! ignored, and anything after a `:` is treated as an annotation and dropped:
//!
//! ```text
//! # knight
//! 1,2
//! 2,1:capture
//! -1,-2
//! ```
//!
//! Malformed lines are skipped with a warning. A file that is missing,
//! unreadable or yields no offsets falls back to [`MoveRuleSet::DEFAULT_OFFSETS`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::{Board, Cell};

/// Reachable-cell table for one piece type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRuleSet {
    offsets: Vec<(i32, i32)>,
}

impl Default for MoveRuleSet {
    /// The four orthogonal single steps.
    fn default() -> Self {
        Self::new(Self::DEFAULT_OFFSETS.to_vec())
    }
}

impl MoveRuleSet {
    /// Fallback offsets: up, down, right, left.
    pub const DEFAULT_OFFSETS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

    /// Build a rule set from explicit `(dx, dy)` offsets.
    pub fn new(offsets: Vec<(i32, i32)>) -> Self {
        Self { offsets }
    }

    /// Parse the text format described in the module docs.
    pub fn parse(text: &str) -> Self {
        let mut offsets = Vec::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let body = line.split(':').next().unwrap_or_default();
            match parse_offset(body) {
                Some(offset) => offsets.push(offset),
                None => warn!(line = line_no + 1, text = %line, "skipping malformed move rule"),
            }
        }
        if offsets.is_empty() {
            warn!("move rule text yielded no offsets; using defaults");
            return Self::default();
        }
        Self::new(offsets)
    }

    /// Read and parse a rule file, falling back to defaults on any I/O error.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "move rule file unavailable; using defaults");
                Self::default()
            }
        }
    }

    /// The raw `(dx, dy)` offsets.
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Every on-board cell reachable from `from` in one application of a rule.
    pub fn reachable(&self, from: Cell, board: &Board) -> Vec<Cell> {
        self.offsets
            .iter()
            .map(|&(dx, dy)| from.offset(dy, dx))
            .filter(|cell| board.contains(*cell))
            .collect()
    }

    /// Whether `to` is reachable from `from`.
    pub fn allows(&self, from: Cell, to: Cell, board: &Board) -> bool {
        board.contains(to)
            && self
                .offsets
                .iter()
                .any(|&(dx, dy)| from.offset(dy, dx) == to)
    }
}

/// Offsets are limited to the `i16` range; anything wider is malformed.
fn parse_offset(body: &str) -> Option<(i32, i32)> {
    let mut parts = body.split(',').map(str::trim);
    let dx: i16 = parts.next()?.parse().ok()?;
    let dy: i16 = parts.next()?.parse().ok()?;
    Some((i32::from(dx), i32::from(dy)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_annotations() {
        let rules = MoveRuleSet::parse("# knight\n1,2\n 2 , 1:capture\n\n-1,-2\n");
        assert_eq!(rules.offsets(), &[(1, 2), (2, 1), (-1, -2)]);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let rules = MoveRuleSet::parse("1,0\nnot a rule\n3\n0,x\n0,1");
        assert_eq!(rules.offsets(), &[(1, 0), (0, 1)]);
    }

    #[test]
    fn oversized_offsets_are_skipped() {
        let rules = MoveRuleSet::parse("2147483647,0\n0,1\n-40000,2\n");
        assert_eq!(rules.offsets(), &[(0, 1)]);

        let board = Board::default();
        assert!(rules.allows(Cell::new(1, 1), Cell::new(2, 1), &board));
        assert!(!rules.allows(Cell::new(1, 1), Cell::new(1, 2), &board));
    }

    #[test]
    fn extreme_offsets_never_reach_the_board() {
        let rules = MoveRuleSet::new(vec![(i32::MAX, 0), (0, i32::MIN)]);
        let board = Board::default();
        assert!(!rules.allows(Cell::new(1, 1), Cell::new(1, 2), &board));
        assert!(rules.reachable(Cell::new(7, 7), &board).is_empty());
    }

    #[test]
    fn empty_or_garbage_falls_back_to_default() {
        assert_eq!(MoveRuleSet::parse(""), MoveRuleSet::default());
        assert_eq!(
            MoveRuleSet::parse("default=all_directions\n"),
            MoveRuleSet::default()
        );
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let rules = MoveRuleSet::load(Path::new("/definitely/not/here/moves.txt"));
        assert_eq!(rules, MoveRuleSet::default());
    }

    #[test]
    fn reachable_is_bounded_by_board() {
        let board = Board::default();
        let rules = MoveRuleSet::default();
        let mut corner = rules.reachable(Cell::new(0, 0), &board);
        corner.sort();
        assert_eq!(corner, vec![Cell::new(0, 1), Cell::new(1, 0)]);
        assert_eq!(rules.reachable(Cell::new(4, 4), &board).len(), 4);
    }

    #[test]
    fn dx_is_columns_dy_is_rows() {
        let board = Board::default();
        let rules = MoveRuleSet::new(vec![(2, 1)]);
        assert!(rules.allows(Cell::new(0, 0), Cell::new(1, 2), &board));
        assert!(!rules.allows(Cell::new(0, 0), Cell::new(2, 1), &board));
    }
}
