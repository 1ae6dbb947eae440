//! rtchess core -- piece model for turnless, real-time chess.
//!
//! Both players issue commands whenever they like. Instead of alternating
//! turns, each piece carries its own timing state: an action (a slide or a
//! jump) runs for a duration derived from the command, and a cooldown window
//! follows it during which the piece can neither act, capture, nor be
//! captured.
//!
//! This crate holds the leaf data model the engine is built on:
//!
//! - [`board`]: cells, board geometry and algebraic square encoding.
//! - [`side`]: the two players.
//! - [`command`]: timestamped move/jump commands.
//! - [`rules`]: per-piece-type relative move offsets.
//! - [`motion`]: continuous position, action phases and cooldown windows.
//! - [`state`]: the per-piece state machine binding rules and motion.
//! - [`piece`]: piece identity plus owned state.
//!
//! # Quick Start
//!
//! ```
//! use rtchess_core::prelude::*;
//!
//! let board = Board::new(8, 8);
//! let code: PieceCode = "PW".parse().unwrap();
//! let mut piece = Piece::new(
//!     PieceId::new("PW_0"),
//!     code,
//!     0,
//!     PieceStateMachine::new(
//!         std::sync::Arc::new(MoveRuleSet::default()),
//!         std::sync::Arc::new(StateGraph::default()),
//!         MotionModel::new(Cell::new(1, 4), MotionConfig::default()),
//!     ),
//! );
//!
//! let cmd = Command::movement(0, piece.id().clone(), CommandKind::Move, Cell::new(1, 4), Cell::new(2, 4), &board);
//! piece.on_command(&cmd, 0, &board).unwrap();
//!
//! piece.update(250);
//! assert_eq!(piece.cell(), Cell::new(2, 4));
//! assert!(!piece.motion().can_be_captured(250));
//! assert!(piece.motion().can_be_captured(4250));
//! ```

#![deny(unsafe_code)]

pub mod board;
pub mod command;
pub mod motion;
pub mod piece;
pub mod rules;
pub mod side;
pub mod state;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by core model operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A square string could not be decoded (`"e2"` style expected).
    #[error("invalid square '{square}': expected a file letter followed by a rank number")]
    InvalidSquare { square: String },

    /// A cell lies outside the board.
    #[error("cell {cell} is outside the {width}x{height} board")]
    OutOfBounds {
        cell: board::Cell,
        width: u32,
        height: u32,
    },

    /// A movement command did not carry `[origin, destination]` squares.
    #[error("command for piece '{piece}' needs 2 square params, got {got}")]
    MissingParams { piece: String, got: usize },

    /// A piece code was not a known `<type><side>` pair such as `"PW"`.
    #[error("unknown piece code '{code}'")]
    UnknownPieceCode { code: String },

    /// The current state has not existed for the minimum dwell time yet.
    #[error("state entered at {entered_ms}ms is not eligible for a transition until {eligible_ms}ms")]
    DwellNotElapsed { entered_ms: u64, eligible_ms: u64 },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::board::{Board, Cell, Position};
    pub use crate::command::{Command, CommandKind};
    pub use crate::motion::{CooldownWindow, MotionConfig, MotionModel, MotionState, Phase};
    pub use crate::piece::{Piece, PieceCode, PieceId, PieceKind};
    pub use crate::rules::MoveRuleSet;
    pub use crate::side::Side;
    pub use crate::state::{
        PieceStateMachine, RenderHandle, StateBlueprint, StateGraph, TransitionError,
        UnhandledCommand,
    };
    pub use crate::CoreError;
}
