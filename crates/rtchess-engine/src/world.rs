//! The simulation world: active pieces, player selections and the outcome.
//!
//! [`SimulationWorld`] is owned by the tick loop and passed by reference to
//! each subsystem. Pieces keep their insertion order, which is the
//! deterministic iteration order for every pass over the board.

use rtchess_core::board::{Board, Cell};
use rtchess_core::piece::{Piece, PieceId};
use rtchess_core::side::Side;
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// State of the game as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// Both sides still have pieces.
    #[default]
    Ongoing,
    /// `side` captured every enemy piece; `piece` is one of its survivors.
    Won { side: Side, piece: PieceId },
    /// Both sides were emptied at the same time.
    Draw,
}

impl Outcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, Outcome::Ongoing)
    }

    /// Winning side, if any.
    pub fn winner(&self) -> Option<Side> {
        match self {
            Outcome::Won { side, .. } => Some(*side),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// WorldError
// ---------------------------------------------------------------------------

/// Errors from direct world manipulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("piece '{0}' already exists")]
    DuplicatePiece(PieceId),
    #[error("piece '{piece}' placed outside the board at {cell}")]
    OffBoard { piece: PieceId, cell: Cell },
}

// ---------------------------------------------------------------------------
// SimulationWorld
// ---------------------------------------------------------------------------

/// All mutable game state.
#[derive(Debug, Clone)]
pub struct SimulationWorld {
    board: Board,
    pieces: Vec<Piece>,
    selections: [Option<PieceId>; 2],
    outcome: Outcome,
}

fn slot(side: Side) -> usize {
    match side {
        Side::White => 0,
        Side::Black => 1,
    }
}

impl SimulationWorld {
    /// An empty world on `board`.
    pub fn new(board: Board) -> Self {
        Self {
            board,
            pieces: Vec::new(),
            selections: [None, None],
            outcome: Outcome::Ongoing,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    // -- pieces -------------------------------------------------------------

    /// Add a piece. Ids must be unique and the piece must be on the board.
    pub fn spawn(&mut self, piece: Piece) -> Result<(), WorldError> {
        if self.piece(piece.id()).is_some() {
            return Err(WorldError::DuplicatePiece(piece.id().clone()));
        }
        if !self.board.contains(piece.cell()) {
            return Err(WorldError::OffBoard {
                piece: piece.id().clone(),
                cell: piece.cell(),
            });
        }
        self.pieces.push(piece);
        Ok(())
    }

    /// Remove a piece permanently, clearing any selection of it.
    pub fn remove(&mut self, id: &PieceId) -> Option<Piece> {
        let idx = self.index_of(id)?;
        for selection in &mut self.selections {
            if selection.as_ref() == Some(id) {
                *selection = None;
            }
        }
        Some(self.pieces.remove(idx))
    }

    /// Active pieces in insertion order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub(crate) fn pieces_mut(&mut self) -> &mut [Piece] {
        &mut self.pieces
    }

    pub fn index_of(&self, id: &PieceId) -> Option<usize> {
        self.pieces.iter().position(|p| p.id() == id)
    }

    pub fn piece(&self, id: &PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id() == id)
    }

    pub fn piece_mut(&mut self, id: &PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.id() == id)
    }

    /// Pieces whose rounded position is `cell`, airborne ones included.
    pub fn occupants(&self, cell: Cell) -> impl Iterator<Item = &Piece> {
        self.pieces.iter().filter(move |p| p.cell() == cell)
    }

    /// Number of active pieces owned by `side`.
    pub fn count(&self, side: Side) -> usize {
        self.pieces.iter().filter(|p| p.side() == side).count()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Advance every piece to `now_ms`. Returns how many actions finished.
    pub fn update_pieces(&mut self, now_ms: u64) -> usize {
        self.pieces
            .iter_mut()
            .map(|p| p.update(now_ms))
            .filter(|finished| *finished)
            .count()
    }

    // -- selections ---------------------------------------------------------

    pub fn selection(&self, side: Side) -> Option<&PieceId> {
        self.selections[slot(side)].as_ref()
    }

    /// Select `id` for `side`. Returns `false` (and leaves the selection
    /// untouched) if the piece does not exist or belongs to the other side.
    pub fn select(&mut self, side: Side, id: &PieceId) -> bool {
        match self.piece(id) {
            Some(p) if p.side() == side => {
                self.selections[slot(side)] = Some(id.clone());
                true
            }
            _ => false,
        }
    }

    pub fn clear_selection(&mut self, side: Side) {
        self.selections[slot(side)] = None;
    }

    // -- outcome ------------------------------------------------------------

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_over()
    }

    /// Decide the outcome if one side has run out of pieces.
    ///
    /// Once decided the outcome never changes; later calls return `true`
    /// without touching it.
    pub fn check_game_over(&mut self) -> bool {
        if self.outcome.is_over() {
            return true;
        }
        let white = self.count(Side::White);
        let black = self.count(Side::Black);
        self.outcome = match (white, black) {
            (0, 0) => Outcome::Draw,
            (_, 0) => self.won_by(Side::White),
            (0, _) => self.won_by(Side::Black),
            _ => return false,
        };
        info!(outcome = ?self.outcome, "game over");
        true
    }

    fn won_by(&self, side: Side) -> Outcome {
        match self.pieces.iter().find(|p| p.side() == side) {
            Some(piece) => Outcome::Won {
                side,
                piece: piece.id().clone(),
            },
            None => Outcome::Draw,
        }
    }
}
