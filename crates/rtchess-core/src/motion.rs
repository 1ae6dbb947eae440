//! Continuous motion, action phases and cooldown windows for one piece.
//!
//! The [`MotionModel`] owns a piece's spatial state. A validated command
//! starts an *action*:
//!
//! - **Move** slides the piece from origin to destination. The duration is
//!   the Euclidean distance divided by the slide rate. The piece stays on the
//!   board (grounded) and cannot be captured until the action and its
//!   cooldown are over.
//! - **Jump** keeps the piece airborne at its origin for a fixed duration and
//!   then lands it on the destination. An airborne piece can neither capture
//!   nor be captured.
//!
//! Every action arms a cooldown window that starts when the action ends. The
//! capture predicates are `flag && !in_cooldown(now)`, and the cooldown test
//! is true from the moment the action starts until the window closes, so a
//! piece is unavailable for the whole `[T, T + D + C)` interval.
//!
//! # Example
//!
//! ```
//! use rtchess_core::prelude::*;
//!
//! let board = Board::default();
//! let mut motion = MotionModel::new(Cell::new(6, 4), MotionConfig::default());
//! let cmd = Command::movement(0, PieceId::new("PB_0"), CommandKind::Move, Cell::new(6, 4), Cell::new(5, 4), &board);
//! motion.apply(&cmd, &board).unwrap();
//! assert_eq!(motion.action_duration_ms(), 250);
//!
//! motion.update(125);
//! assert!((motion.pos().row - 5.5).abs() < 1e-9);
//!
//! motion.update(250);
//! assert_eq!(motion.phase(), Phase::Idle);
//! assert_eq!(motion.cell_pos(), Cell::new(5, 4));
//! assert!(!motion.can_be_captured(4249));
//! assert!(motion.can_be_captured(4250));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::board::{Board, Cell, Position};
use crate::command::{Command, CommandKind};
use crate::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Slide speed in cells per second.
pub const SLIDE_CELLS_PER_SEC: f64 = 4.0;
/// Cooldown after a slide completes.
pub const MOVE_COOLDOWN_MS: u64 = 4000;
/// Airborne time of a jump.
pub const JUMP_DURATION_MS: u64 = 1000;
/// Cooldown after a jump lands.
pub const JUMP_COOLDOWN_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// MotionConfig
// ---------------------------------------------------------------------------

/// Timing parameters for a piece type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Slide speed in cells per second. Must be positive.
    pub slide_cells_per_sec: f64,
    /// Cooldown after a slide, in milliseconds.
    pub move_cooldown_ms: u64,
    /// Airborne time of a jump, in milliseconds.
    pub jump_duration_ms: u64,
    /// Cooldown after a jump, in milliseconds.
    pub jump_cooldown_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            slide_cells_per_sec: SLIDE_CELLS_PER_SEC,
            move_cooldown_ms: MOVE_COOLDOWN_MS,
            jump_duration_ms: JUMP_DURATION_MS,
            jump_cooldown_ms: JUMP_COOLDOWN_MS,
        }
    }
}

impl MotionConfig {
    /// Slide duration between two cells: `round(distance / rate * 1000)`.
    pub fn slide_duration_ms(&self, from: Cell, to: Cell) -> u64 {
        (from.euclidean(to) / self.slide_cells_per_sec * 1000.0).round() as u64
    }

    /// Cooldown that follows an action of the given kind.
    pub fn cooldown_ms(&self, kind: CommandKind) -> u64 {
        match kind {
            CommandKind::Move => self.move_cooldown_ms,
            CommandKind::Jump => self.jump_cooldown_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase / CooldownWindow
// ---------------------------------------------------------------------------

/// What a piece is physically doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// At rest on a cell.
    Idle,
    /// Sliding toward the target cell (grounded).
    Moving,
    /// In the air above the origin cell, landing on the target.
    Jumping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Moving => "moving",
            Phase::Jumping => "jumping",
        };
        f.write_str(s)
    }
}

/// A half-open interval `[start_ms, start_ms + duration_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownWindow {
    /// When the window opens (the end of the action).
    pub start_ms: u64,
    /// How long it stays open.
    pub duration_ms: u64,
}

impl CooldownWindow {
    /// First millisecond at which the piece is available again.
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }
}

// ---------------------------------------------------------------------------
// MotionState
// ---------------------------------------------------------------------------

/// Plain-data view of a piece's motion, suitable for snapshots and renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    /// Continuous position in cell units.
    pub current_position: Position,
    /// Where the current action started.
    pub origin_cell: Cell,
    /// Destination of the current action; `None` whenever `phase` is `Idle`.
    pub target_cell: Option<Cell>,
    /// Idle, Moving or Jumping.
    pub phase: Phase,
    /// Command timestamp of the current (or last) action.
    pub action_start_ms: u64,
    /// Duration of the current (or last) action.
    pub action_duration_ms: u64,
    /// Cooldown armed by the last action, if any.
    pub cooldown: Option<CooldownWindow>,
    /// Whether the current action allows this piece to be captured.
    pub capturable: bool,
    /// Whether the current action allows this piece to capture.
    pub can_capture: bool,
}

// ---------------------------------------------------------------------------
// MotionModel
// ---------------------------------------------------------------------------

/// Owns and advances a single piece's spatial state over time.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionModel {
    config: MotionConfig,
    state: MotionState,
}

impl MotionModel {
    /// A model at rest on `cell` with no cooldown.
    pub fn new(cell: Cell, config: MotionConfig) -> Self {
        Self {
            config,
            state: MotionState {
                current_position: cell.into(),
                origin_cell: cell,
                target_cell: None,
                phase: Phase::Idle,
                action_start_ms: 0,
                action_duration_ms: 0,
                cooldown: None,
                capturable: true,
                can_capture: true,
            },
        }
    }

    /// Reset action state from a validated command.
    ///
    /// The command timestamp, not the wall clock, anchors the action window.
    /// Fails without touching the model if the command's squares do not
    /// decode on `board`.
    pub fn apply(&mut self, command: &Command, board: &Board) -> Result<(), CoreError> {
        let (from, to) = command.squares(board)?;
        let start = command.timestamp;
        let duration = match command.kind {
            CommandKind::Move => self.config.slide_duration_ms(from, to),
            CommandKind::Jump => self.config.jump_duration_ms,
        };

        let s = &mut self.state;
        s.current_position = from.into();
        s.origin_cell = from;
        s.target_cell = Some(to);
        s.action_start_ms = start;
        s.action_duration_ms = duration;
        s.cooldown = Some(CooldownWindow {
            start_ms: start + duration,
            duration_ms: self.config.cooldown_ms(command.kind),
        });
        s.capturable = false;
        match command.kind {
            CommandKind::Move => {
                s.phase = Phase::Moving;
                s.can_capture = true;
            }
            CommandKind::Jump => {
                s.phase = Phase::Jumping;
                s.can_capture = false;
            }
        }

        trace!(
            piece = %command.piece_id,
            kind = %command.kind,
            from = %from,
            to = %to,
            duration_ms = duration,
            "motion armed"
        );
        Ok(())
    }

    /// Advance to `now_ms`. Returns `true` if the action finished during
    /// this call.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let s = &mut self.state;
        let Some(target) = s.target_cell else {
            return false;
        };
        if s.phase == Phase::Idle {
            return false;
        }

        let elapsed = now_ms.saturating_sub(s.action_start_ms);
        if elapsed >= s.action_duration_ms {
            s.current_position = target.into();
            s.origin_cell = target;
            s.target_cell = None;
            s.phase = Phase::Idle;
            // The cooldown window keeps both predicates false until it closes.
            s.capturable = true;
            s.can_capture = true;
            return true;
        }

        if s.phase == Phase::Moving {
            let t = elapsed as f64 / s.action_duration_ms as f64;
            s.current_position = Position::lerp(s.origin_cell, target, t);
        }
        false
    }

    /// Land a jump whose airborne time has elapsed. Returns `true` if it
    /// landed.
    pub fn land_if_due(&mut self, now_ms: u64) -> bool {
        self.state.phase == Phase::Jumping && self.update(now_ms)
    }

    /// Teleport to `cell` and drop any in-flight action. Cooldowns persist.
    pub fn set_position(&mut self, cell: Cell) {
        let s = &mut self.state;
        s.current_position = cell.into();
        s.origin_cell = cell;
        s.target_cell = None;
        s.phase = Phase::Idle;
        s.capturable = true;
        s.can_capture = true;
    }

    // -- predicates ---------------------------------------------------------

    /// Whether `now_ms` precedes the end of the armed cooldown window.
    pub fn is_in_cooldown(&self, now_ms: u64) -> bool {
        self.state
            .cooldown
            .is_some_and(|window| now_ms < window.end_ms())
    }

    /// Whether this piece may be captured at `now_ms`.
    pub fn can_be_captured(&self, now_ms: u64) -> bool {
        self.state.capturable && !self.is_in_cooldown(now_ms)
    }

    /// Whether this piece may capture (and therefore act) at `now_ms`.
    pub fn can_capture(&self, now_ms: u64) -> bool {
        self.state.can_capture && !self.is_in_cooldown(now_ms)
    }

    /// Whether the piece is out of collision checks.
    pub fn is_airborne(&self) -> bool {
        self.state.phase == Phase::Jumping
    }

    // -- accessors ----------------------------------------------------------

    /// Unrounded position for interpolated rendering.
    pub fn pos(&self) -> Position {
        self.state.current_position
    }

    /// Nearest cell; used for collision grouping and admission.
    pub fn cell_pos(&self) -> Cell {
        self.state.current_position.nearest_cell()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Destination of the in-flight action.
    pub fn target_cell(&self) -> Option<Cell> {
        self.state.target_cell
    }

    /// Duration of the current or last action.
    pub fn action_duration_ms(&self) -> u64 {
        self.state.action_duration_ms
    }

    /// Start of the current or last action.
    pub fn action_start_ms(&self) -> u64 {
        self.state.action_start_ms
    }

    /// The armed cooldown window, if any action has run.
    pub fn cooldown(&self) -> Option<CooldownWindow> {
        self.state.cooldown
    }

    /// Progress of the in-flight action in `[0, 1]`; `1.0` when idle.
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.state.phase == Phase::Idle || self.state.action_duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.state.action_start_ms);
        (elapsed as f64 / self.state.action_duration_ms as f64).min(1.0)
    }

    /// Progress through the cooldown window in `[0, 1]`; `1.0` when not
    /// cooling down, `0.0` while the action itself is still running.
    pub fn cooldown_progress(&self, now_ms: u64) -> f64 {
        match self.state.cooldown {
            Some(w) if now_ms < w.end_ms() && w.duration_ms > 0 => {
                let elapsed = now_ms.saturating_sub(w.start_ms);
                (elapsed as f64 / w.duration_ms as f64).min(1.0)
            }
            _ => 1.0,
        }
    }

    /// Timing parameters.
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Replace timing parameters for future actions.
    pub fn set_config(&mut self, config: MotionConfig) {
        self.config = config;
    }

    /// Plain-data view.
    pub fn state(&self) -> &MotionState {
        &self.state
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
