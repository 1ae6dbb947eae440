//! Timestamped move and jump commands.
//!
//! A [`Command`] is an immutable intent addressed to one piece. Its `params`
//! carry the origin and destination as algebraic squares, which keeps the
//! command independent of any in-memory board representation and makes it
//! trivially serializable for replay logs.
//!
//! # Example
//!
//! ```
//! use rtchess_core::prelude::*;
//!
//! let board = Board::default();
//! let cmd = Command::movement(
//!     120,
//!     PieceId::new("NW_1"),
//!     CommandKind::Jump,
//!     Cell::new(0, 1),
//!     Cell::new(2, 2),
//!     &board,
//! );
//! assert_eq!(cmd.params, vec!["b1".to_owned(), "c3".to_owned()]);
//! assert_eq!(cmd.squares(&board), Ok((Cell::new(0, 1), Cell::new(2, 2))));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Cell};
use crate::piece::PieceId;
use crate::CoreError;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// What a command asks the piece to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    /// Slide to an adjacent cell; the piece is grounded throughout.
    Move,
    /// Hop up to a few cells; the piece is airborne until it lands.
    Jump,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Move => f.write_str("Move"),
            CommandKind::Jump => f.write_str("Jump"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A timestamped intent for a single piece.
///
/// `timestamp` is in milliseconds since game start. `params` is
/// `[origin_square, destination_square]` for both command kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Milliseconds since game start.
    pub timestamp: u64,
    /// The piece this command is addressed to.
    pub piece_id: PieceId,
    /// Move or Jump.
    pub kind: CommandKind,
    /// `[origin, destination]` as algebraic squares.
    pub params: Vec<String>,
}

impl Command {
    /// Build a command from raw parts.
    pub fn new(
        timestamp: u64,
        piece_id: PieceId,
        kind: CommandKind,
        params: Vec<String>,
    ) -> Self {
        Self {
            timestamp,
            piece_id,
            kind,
            params,
        }
    }

    /// Build a command from an origin and destination cell.
    pub fn movement(
        timestamp: u64,
        piece_id: PieceId,
        kind: CommandKind,
        from: Cell,
        to: Cell,
        board: &Board,
    ) -> Self {
        Self::new(
            timestamp,
            piece_id,
            kind,
            vec![board.square(from), board.square(to)],
        )
    }

    /// Whether this is a jump.
    pub fn is_jump(&self) -> bool {
        self.kind == CommandKind::Jump
    }

    /// Decode the destination square.
    pub fn destination(&self, board: &Board) -> Result<Cell, CoreError> {
        let square = self.params.get(1).ok_or_else(|| self.missing_params())?;
        board.parse_square(square)
    }

    /// Decode `(origin, destination)`.
    pub fn squares(&self, board: &Board) -> Result<(Cell, Cell), CoreError> {
        match self.params.as_slice() {
            [from, to, ..] => Ok((board.parse_square(from)?, board.parse_square(to)?)),
            _ => Err(self.missing_params()),
        }
    }

    fn missing_params(&self) -> CoreError {
        CoreError::MissingParams {
            piece: self.piece_id.to_string(),
            got: self.params.len(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}ms {} [{}]",
            self.kind,
            self.timestamp,
            self.piece_id,
            self.params.join(" -> ")
        )
    }
}
