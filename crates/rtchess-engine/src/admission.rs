//! Command admission.
//!
//! The [`CommandProcessor`] is the single gatekeeper between raw intents and
//! piece state. A request is checked against the piece's timing state, the
//! board and the other pieces, in this order:
//!
//! 1. the game is still running and the piece exists
//! 2. the command's destination square decodes
//! 3. the piece is not cooling down
//! 4. the piece's current state has existed for the minimum dwell time
//! 5. the destination differs from the piece's cell
//! 6. the destination is on the board
//! 7. the distance fits the command kind (Chebyshev: 1 for a move, 3 for a jump)
//! 8. optionally, the destination is in the piece type's move rules
//! 9. the destination is not held by a piece of the same side
//!
//! An enemy on the destination is fine: the capture is settled later by the
//! collision resolver. An accepted request is rewritten into a canonical
//! [`Command`] stamped with the admission time, and the piece's cooldown and
//! last-move time are armed immediately. A rejected request leaves every
//! piece untouched.

use rtchess_core::board::Cell;
use rtchess_core::command::{Command, CommandKind};
use rtchess_core::piece::PieceId;
use rtchess_core::CoreError;
use tracing::debug;

use crate::config::AdmissionConfig;
use crate::world::SimulationWorld;

// ---------------------------------------------------------------------------
// AdmissionRejected
// ---------------------------------------------------------------------------

/// Why a command was not admitted. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionRejected {
    #[error("game is over")]
    GameOver,

    #[error("no active piece '{piece}'")]
    UnknownPiece { piece: PieceId },

    #[error("malformed command for '{piece}': {source}")]
    MalformedCommand {
        piece: PieceId,
        #[source]
        source: CoreError,
    },

    #[error("'{piece}' is in cooldown until {until_ms}ms")]
    InCooldown { piece: PieceId, until_ms: u64 },

    #[error("'{piece}' cannot change state before {eligible_ms}ms")]
    DwellNotElapsed { piece: PieceId, eligible_ms: u64 },

    #[error("'{piece}' is already at {cell}")]
    SamePosition { piece: PieceId, cell: Cell },

    #[error("destination {cell} for '{piece}' is out of bounds")]
    OutOfBounds { piece: PieceId, cell: Cell },

    #[error("{kind} of '{piece}' covers {distance} cells, limit is {max}")]
    DistanceExceeded {
        piece: PieceId,
        kind: CommandKind,
        distance: u32,
        max: u32,
    },

    #[error("'{piece}' has no rule from {from} to {to}")]
    NotInMoveRules { piece: PieceId, from: Cell, to: Cell },

    #[error("destination {cell} for '{piece}' is held by own piece '{occupant}'")]
    OwnPieceOccupied {
        piece: PieceId,
        cell: Cell,
        occupant: PieceId,
    },
}

// ---------------------------------------------------------------------------
// CommandProcessor
// ---------------------------------------------------------------------------

/// Validates requests and arms accepted ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProcessor {
    policy: AdmissionConfig,
}

impl CommandProcessor {
    pub fn new(policy: AdmissionConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdmissionConfig {
        &self.policy
    }

    /// Admit an external command. Only its piece, kind and destination are
    /// used; origin and timestamp are taken from the world and `now_ms`.
    pub fn admit(
        &self,
        world: &mut SimulationWorld,
        command: &Command,
        now_ms: u64,
    ) -> Result<Command, AdmissionRejected> {
        let piece = command.piece_id.clone();
        if world.is_game_over() {
            return Err(AdmissionRejected::GameOver);
        }
        if world.piece(&piece).is_none() {
            return Err(AdmissionRejected::UnknownPiece { piece });
        }
        let dest = match command.destination(world.board()) {
            Ok(cell) => cell,
            // Off-board squares still decode to a cell; bounds are checked
            // in order below.
            Err(CoreError::OutOfBounds { cell, .. }) => cell,
            Err(source) => return Err(AdmissionRejected::MalformedCommand { piece, source }),
        };
        self.admit_to(world, &piece, command.kind, dest, now_ms)
    }

    /// Admit a request to send `piece` to `dest`.
    pub fn admit_to(
        &self,
        world: &mut SimulationWorld,
        piece_id: &PieceId,
        kind: CommandKind,
        dest: Cell,
        now_ms: u64,
    ) -> Result<Command, AdmissionRejected> {
        self.check(world, piece_id, kind, dest, now_ms)?;

        let board = *world.board();
        let piece = world
            .piece_mut(piece_id)
            .ok_or_else(|| AdmissionRejected::UnknownPiece {
                piece: piece_id.clone(),
            })?;
        let origin = piece.cell();
        let cooldown = piece.motion().config().cooldown_ms(kind);
        piece.arm_admission(now_ms, cooldown);

        let command = Command::movement(now_ms, piece_id.clone(), kind, origin, dest, &board);
        debug!(piece = %piece_id, command = %command, "command admitted");
        Ok(command)
    }

    /// Run every check without mutating anything.
    pub fn check(
        &self,
        world: &SimulationWorld,
        piece_id: &PieceId,
        kind: CommandKind,
        dest: Cell,
        now_ms: u64,
    ) -> Result<(), AdmissionRejected> {
        if world.is_game_over() {
            return Err(AdmissionRejected::GameOver);
        }
        let piece = world
            .piece(piece_id)
            .ok_or_else(|| AdmissionRejected::UnknownPiece {
                piece: piece_id.clone(),
            })?;
        let reject_piece = || piece_id.clone();

        let motion = piece.motion();
        if !motion.can_capture(now_ms) || now_ms < piece.cooldown_end_ms() {
            let until_ms = motion
                .cooldown()
                .map_or(0, |w| w.end_ms())
                .max(piece.cooldown_end_ms());
            return Err(AdmissionRejected::InCooldown {
                piece: reject_piece(),
                until_ms,
            });
        }

        if !piece.machine().can_transition(now_ms) {
            return Err(AdmissionRejected::DwellNotElapsed {
                piece: reject_piece(),
                eligible_ms: piece.machine().dwell_eligible_ms(),
            });
        }

        let origin = piece.cell();
        if origin == dest {
            return Err(AdmissionRejected::SamePosition {
                piece: reject_piece(),
                cell: dest,
            });
        }

        let board = world.board();
        if !board.contains(dest) {
            return Err(AdmissionRejected::OutOfBounds {
                piece: reject_piece(),
                cell: dest,
            });
        }

        let distance = origin.chebyshev(dest);
        let max = match kind {
            CommandKind::Move => self.policy.max_move_distance,
            CommandKind::Jump => self.policy.max_jump_distance,
        };
        if distance > max {
            return Err(AdmissionRejected::DistanceExceeded {
                piece: reject_piece(),
                kind,
                distance,
                max,
            });
        }

        if self.policy.enforce_move_rules && !piece.machine().rules().allows(origin, dest, board) {
            return Err(AdmissionRejected::NotInMoveRules {
                piece: reject_piece(),
                from: origin,
                to: dest,
            });
        }

        let side = piece.side();
        if let Some(own) = world
            .occupants(dest)
            .find(|p| p.side() == side && p.id() != piece_id)
        {
            return Err(AdmissionRejected::OwnPieceOccupied {
                piece: reject_piece(),
                cell: dest,
                occupant: own.id().clone(),
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
