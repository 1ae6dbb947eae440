//! Piece identity and owned state.
//!
//! A [`Piece`] couples a stable [`PieceId`], its [`PieceCode`] (kind and
//! side), a creation sequence number used for deterministic tie-breaking,
//! and its own [`PieceStateMachine`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::{Board, Cell, Position};
use crate::command::Command;
use crate::motion::MotionModel;
use crate::side::Side;
use crate::state::{PieceStateMachine, TransitionError};
use crate::CoreError;

// ---------------------------------------------------------------------------
// PieceId
// ---------------------------------------------------------------------------

/// Stable, unique piece identifier such as `"PW_3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PieceId(String);

impl PieceId {
    /// Wrap an identifier string.
    pub fn new(id: &str) -> Self {
        Self(id.to_owned())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// PieceKind / PieceCode
// ---------------------------------------------------------------------------

/// Chess piece type. Only used for identity and rule lookup; every kind
/// follows the same timing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// All kinds in back-rank order of first appearance.
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Single uppercase letter used in piece codes.
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    /// Parse a kind letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<PieceKind> {
        PieceKind::ALL
            .into_iter()
            .find(|k| k.letter() == letter.to_ascii_uppercase())
    }
}

/// Kind plus side, written as two letters: `"PW"`, `"KB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceCode {
    pub kind: PieceKind,
    pub side: Side,
}

impl PieceCode {
    pub fn new(kind: PieceKind, side: Side) -> Self {
        Self { kind, side }
    }
}

impl FromStr for PieceCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || CoreError::UnknownPieceCode { code: s.to_owned() };
        let mut chars = s.chars();
        let (Some(k), Some(sd), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(unknown());
        };
        let kind = PieceKind::from_letter(k).ok_or_else(unknown)?;
        let side = Side::from_letter(sd).ok_or_else(unknown)?;
        Ok(Self { kind, side })
    }
}

impl fmt::Display for PieceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.letter(), self.side.letter())
    }
}

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// One piece on the board.
#[derive(Debug, Clone)]
pub struct Piece {
    id: PieceId,
    code: PieceCode,
    seq: u64,
    machine: PieceStateMachine,
    last_move_ms: Option<u64>,
    cooldown_end_ms: u64,
}

impl Piece {
    /// Create a piece. `seq` is the factory's creation counter.
    pub fn new(id: PieceId, code: PieceCode, seq: u64, machine: PieceStateMachine) -> Self {
        Self {
            id,
            code,
            seq,
            machine,
            last_move_ms: None,
            cooldown_end_ms: 0,
        }
    }

    /// Route a command through the state machine.
    ///
    /// A command kind the current state does not handle re-arms the current
    /// state with it and is logged, not rejected.
    pub fn on_command(&mut self, command: &Command, now_ms: u64, board: &Board) -> Result<(), CoreError> {
        match self.machine.transition(command, now_ms, board) {
            Ok(next) => {
                self.machine = next;
                Ok(())
            }
            Err(TransitionError::Unhandled(unhandled)) => {
                warn!(
                    piece = %self.id,
                    state = %unhandled.state,
                    kind = %unhandled.kind,
                    "no transition for command; re-arming current state"
                );
                self.machine = *unhandled.rearmed;
                Ok(())
            }
            Err(TransitionError::Invalid(e)) => Err(e),
        }
    }

    /// Advance to `now_ms`. Returns `true` if an action finished.
    pub fn update(&mut self, now_ms: u64) -> bool {
        self.machine.update(now_ms)
    }

    /// Land a due jump. Returns `true` if it landed.
    pub fn land_if_due(&mut self, now_ms: u64) -> bool {
        self.machine.land_if_due(now_ms)
    }

    /// Record an accepted command: its timestamp orders collisions, and
    /// `cooldown_end_ms` blocks further commands admitted before the
    /// action is applied.
    pub fn arm_admission(&mut self, now_ms: u64, cooldown_ms: u64) {
        self.last_move_ms = Some(now_ms);
        self.cooldown_end_ms = now_ms + cooldown_ms;
    }

    pub fn id(&self) -> &PieceId {
        &self.id
    }

    pub fn code(&self) -> PieceCode {
        self.code
    }

    pub fn side(&self) -> Side {
        self.code.side
    }

    /// Creation sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn machine(&self) -> &PieceStateMachine {
        &self.machine
    }

    pub fn motion(&self) -> &MotionModel {
        self.machine.motion()
    }

    /// Teleport the piece; used by setup code.
    pub fn place(&mut self, cell: Cell) {
        self.machine.motion_mut().set_position(cell);
    }

    /// Nearest cell of the current position.
    pub fn cell(&self) -> Cell {
        self.motion().cell_pos()
    }

    /// Continuous position.
    pub fn pos(&self) -> Position {
        self.motion().pos()
    }

    /// Timestamp of the last accepted command, `None` if never commanded.
    pub fn last_move_ms(&self) -> Option<u64> {
        self.last_move_ms
    }

    /// Admission-time cooldown end.
    pub fn cooldown_end_ms(&self) -> u64 {
        self.cooldown_end_ms
    }
}
