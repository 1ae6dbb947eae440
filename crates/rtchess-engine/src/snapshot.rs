//! Read-only world snapshots with BLAKE3 hashing.
//!
//! A [`WorldSnapshot`] is a plain-data view of every active piece plus the
//! clock reading, tick count, selections and outcome. Renderers and tools
//! read the game through it, and determinism tests compare its
//! [`hash`](WorldSnapshot::hash).
//!
//! # Usage
//!
//! ```
//! use rtchess_engine::prelude::*;
//!
//! let clock = ManualClock::new(0);
//! let mut tick_loop = TickLoop::standard(EngineConfig::default(), Box::new(clock)).unwrap();
//! tick_loop.tick();
//!
//! let snapshot = tick_loop.capture_snapshot().unwrap();
//! assert_eq!(snapshot.tick, 1);
//! assert_eq!(snapshot.pieces.len(), 32);
//! assert_eq!(snapshot.hash.len(), 64);
//! assert!(snapshot.verify().is_ok());
//! ```
//!
//! # What Is NOT Captured
//!
//! - Inputs still waiting in the command queue.
//! - Event bus subscribers and the event journal.
//! - Per-tick diagnostics.

use rtchess_core::board::{Board, Cell, Position};
use rtchess_core::motion::{CooldownWindow, Phase};
use rtchess_core::piece::{Piece, PieceCode, PieceId};
use rtchess_core::side::Side;
use serde::{Deserialize, Serialize};

use crate::tick::TickLoop;
use crate::world::Outcome;

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("snapshot hash mismatch: recorded {recorded}, recomputed {recomputed}")]
    HashMismatch { recorded: String, recomputed: String },
}

// ---------------------------------------------------------------------------
// PieceSnapshot
// ---------------------------------------------------------------------------

/// One active piece as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    pub id: PieceId,
    pub code: PieceCode,
    pub side: Side,
    /// Name of the current behavioral state.
    pub state: String,
    /// Rounded board cell.
    pub cell: Cell,
    /// Continuous position, for smooth rendering.
    pub position: Position,
    pub phase: Phase,
    pub target_cell: Option<Cell>,
    pub cooldown: Option<CooldownWindow>,
    pub last_move_ms: Option<u64>,
    pub cooldown_end_ms: u64,
}

impl PieceSnapshot {
    fn of(piece: &Piece) -> Self {
        let motion = piece.motion();
        Self {
            id: piece.id().clone(),
            code: piece.code(),
            side: piece.side(),
            state: piece.machine().state_name().to_string(),
            cell: piece.cell(),
            position: piece.pos(),
            phase: motion.phase(),
            target_cell: motion.target_cell(),
            cooldown: motion.cooldown(),
            last_move_ms: piece.last_move_ms(),
            cooldown_end_ms: piece.cooldown_end_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorldSnapshot
// ---------------------------------------------------------------------------

/// A serializable view of the whole game at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Ticks executed at the time of capture.
    pub tick: u64,
    /// Clock reading of the last tick.
    pub now_ms: u64,
    pub board: Board,
    /// Active pieces in world order.
    pub pieces: Vec<PieceSnapshot>,
    pub white_selection: Option<PieceId>,
    pub black_selection: Option<PieceId>,
    pub outcome: Outcome,
    /// BLAKE3 hex digest of every other field.
    pub hash: String,
}

impl WorldSnapshot {
    /// Look up a piece by id.
    pub fn piece(&self, id: &PieceId) -> Option<&PieceSnapshot> {
        self.pieces.iter().find(|p| &p.id == id)
    }

    /// Recompute the hash and compare it with the recorded one.
    pub fn verify(&self) -> Result<(), SnapshotError> {
        let recomputed = compute_hash(self)?;
        if recomputed != self.hash {
            return Err(SnapshotError::HashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

fn compute_hash(snapshot: &WorldSnapshot) -> Result<String, SnapshotError> {
    #[derive(Serialize)]
    struct HashableState<'a> {
        tick: u64,
        now_ms: u64,
        board: &'a Board,
        pieces: &'a [PieceSnapshot],
        white_selection: &'a Option<PieceId>,
        black_selection: &'a Option<PieceId>,
        outcome: &'a Outcome,
    }

    let hashable = HashableState {
        tick: snapshot.tick,
        now_ms: snapshot.now_ms,
        board: &snapshot.board,
        pieces: &snapshot.pieces,
        white_selection: &snapshot.white_selection,
        black_selection: &snapshot.black_selection,
        outcome: &snapshot.outcome,
    };
    let json_bytes = serde_json::to_vec(&hashable)?;
    Ok(blake3::hash(&json_bytes).to_hex().to_string())
}

// ---------------------------------------------------------------------------
// TickLoop integration
// ---------------------------------------------------------------------------

impl TickLoop {
    /// Capture the current world.
    pub fn capture_snapshot(&self) -> Result<WorldSnapshot, SnapshotError> {
        let world = self.world();
        let mut snapshot = WorldSnapshot {
            tick: self.tick_count(),
            now_ms: self.now_ms(),
            board: *world.board(),
            pieces: world.pieces().iter().map(PieceSnapshot::of).collect(),
            white_selection: world.selection(Side::White).cloned(),
            black_selection: world.selection(Side::Black).cloned(),
            outcome: world.outcome().clone(),
            hash: String::new(),
        };
        snapshot.hash = compute_hash(&snapshot)?;
        Ok(snapshot)
    }

    /// BLAKE3 hex digest of the current world.
    pub fn state_hash(&self) -> Result<String, SnapshotError> {
        Ok(self.capture_snapshot()?.hash)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rtchess_core::command::{Command, CommandKind};

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EngineConfig;
    use crate::template::{Placement, TemplateLibrary};

    fn duel(clock: &ManualClock) -> TickLoop {
        let config = EngineConfig::default();
        let library = Arc::new(TemplateLibrary::builtin(&config));
        let setup = [
            Placement::new("QW".parse().unwrap(), Cell::new(0, 3)),
            Placement::new("QB".parse().unwrap(), Cell::new(7, 3)),
        ];
        TickLoop::from_setup(config, library, &setup, Box::new(clock.clone())).unwrap()
    }

    #[test]
    fn snapshot_describes_pieces() {
        let clock = ManualClock::new(0);
        let tick_loop = duel(&clock);
        let snapshot = tick_loop.capture_snapshot().unwrap();

        let queen = snapshot.piece(&PieceId::new("QW_0")).unwrap();
        assert_eq!(queen.side, Side::White);
        assert_eq!(queen.state, "idle");
        assert_eq!(queen.cell, Cell::new(0, 3));
        assert_eq!(queen.phase, Phase::Idle);
        assert_eq!(queen.last_move_ms, None);
        assert_eq!(snapshot.outcome, Outcome::Ongoing);
    }

    #[test]
    fn identical_worlds_hash_identically() {
        let a = duel(&ManualClock::new(0));
        let b = duel(&ManualClock::new(0));
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[test]
    fn movement_changes_the_hash() {
        let clock = ManualClock::new(0);
        let mut tick_loop = duel(&clock);
        let before = tick_loop.state_hash().unwrap();

        tick_loop.queue().push(Command::movement(
            0,
            PieceId::new("QW_0"),
            CommandKind::Move,
            Cell::new(0, 3),
            Cell::new(1, 3),
            &Board::default(),
        ));
        tick_loop.tick();
        let after = tick_loop.capture_snapshot().unwrap();
        assert_ne!(before, after.hash);
        assert_eq!(after.piece(&PieceId::new("QW_0")).unwrap().state, "move");
    }

    #[test]
    fn tampering_is_detected() {
        let tick_loop = duel(&ManualClock::new(0));
        let mut snapshot = tick_loop.capture_snapshot().unwrap();
        assert!(snapshot.verify().is_ok());

        snapshot.now_ms = 999;
        assert!(matches!(
            snapshot.verify(),
            Err(SnapshotError::HashMismatch { .. })
        ));
    }

    #[test]
    fn snapshot_survives_json() {
        let tick_loop = duel(&ManualClock::new(0));
        let snapshot = tick_loop.capture_snapshot().unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert!(back.verify().is_ok());
    }
}
