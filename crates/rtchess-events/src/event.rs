//! Game events emitted by the engine.
//!
//! Each variant has a stable wire name ([`GameEvent::name`]) that subscribers
//! key on: `piece_moved`, `piece_captured` and `game_over`.
//!
//! # Example
//!
//! ```
//! use rtchess_core::prelude::*;
//! use rtchess_events::GameEvent;
//!
//! let event = GameEvent::PieceCaptured {
//!     captured: PieceId::new("PB_8"),
//!     capturing: PieceId::new("NW_1"),
//!     cell: Cell::new(2, 2),
//!     at_ms: 1300,
//! };
//! assert_eq!(event.name(), "piece_captured");
//! assert_eq!(event.pieces().count(), 2);
//! ```

use rtchess_core::board::Cell;
use rtchess_core::command::CommandKind;
use rtchess_core::piece::PieceId;
use rtchess_core::side::Side;
use serde::{Deserialize, Serialize};

/// Name of [`GameEvent::PieceMoved`].
pub const PIECE_MOVED: &str = "piece_moved";
/// Name of [`GameEvent::PieceCaptured`].
pub const PIECE_CAPTURED: &str = "piece_captured";
/// Name of [`GameEvent::GameOver`].
pub const GAME_OVER: &str = "game_over";

/// Something observers may want to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A command was applied to a piece.
    PieceMoved {
        piece: PieceId,
        kind: CommandKind,
        from: Cell,
        to: Cell,
        at_ms: u64,
    },
    /// A piece was removed by collision arbitration.
    PieceCaptured {
        captured: PieceId,
        capturing: PieceId,
        cell: Cell,
        at_ms: u64,
    },
    /// One side ran out of pieces. `winner` is `None` on a draw.
    GameOver {
        winner: Option<Side>,
        winner_piece: Option<PieceId>,
        at_ms: u64,
    },
}

impl GameEvent {
    /// Wire name used for subscriptions.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::PieceMoved { .. } => PIECE_MOVED,
            GameEvent::PieceCaptured { .. } => PIECE_CAPTURED,
            GameEvent::GameOver { .. } => GAME_OVER,
        }
    }

    /// Simulation time the event refers to.
    pub fn at_ms(&self) -> u64 {
        match self {
            GameEvent::PieceMoved { at_ms, .. }
            | GameEvent::PieceCaptured { at_ms, .. }
            | GameEvent::GameOver { at_ms, .. } => *at_ms,
        }
    }

    /// Every piece the event mentions.
    pub fn pieces(&self) -> impl Iterator<Item = &PieceId> {
        let (a, b) = match self {
            GameEvent::PieceMoved { piece, .. } => (Some(piece), None),
            GameEvent::PieceCaptured {
                captured, capturing, ..
            } => (Some(captured), Some(capturing)),
            GameEvent::GameOver { winner_piece, .. } => (winner_piece.as_ref(), None),
        };
        a.into_iter().chain(b)
    }

    /// Whether the event mentions `id`.
    pub fn involves(&self, id: &PieceId) -> bool {
        self.pieces().any(|p| p == id)
    }
}
