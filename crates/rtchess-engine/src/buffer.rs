//! Pending command buffer.
//!
//! Admitted commands are collected in a [`CommandBuffer`] during a tick and
//! applied to their pieces afterwards in strict insertion order (FIFO). A
//! command whose piece vanished or whose transition fails is skipped and
//! reported; it never aborts the rest of the batch.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use rtchess_core::prelude::*;
//! use rtchess_engine::buffer::CommandBuffer;
//! use rtchess_engine::config::EngineConfig;
//! use rtchess_engine::template::{PieceFactory, TemplateLibrary};
//! use rtchess_engine::world::SimulationWorld;
//!
//! let mut factory = PieceFactory::new(Arc::new(TemplateLibrary::builtin(&EngineConfig::default())));
//! let mut world = SimulationWorld::new(Board::default());
//! world.spawn(factory.create("PW".parse().unwrap(), Cell::new(1, 0)).unwrap()).unwrap();
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.push(Command::movement(0, PieceId::new("PW_0"), CommandKind::Move, Cell::new(1, 0), Cell::new(2, 0), world.board()));
//!
//! let applied = buffer.apply(&mut world, 0);
//! assert!(applied[0].applied_successfully);
//! assert!(buffer.is_empty());
//! ```

use rtchess_core::board::Cell;
use rtchess_core::command::Command;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::world::SimulationWorld;

// ---------------------------------------------------------------------------
// AppliedCommand
// ---------------------------------------------------------------------------

/// A command after [`CommandBuffer::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCommand {
    pub command: Command,
    /// Position in the buffer.
    pub command_index: u32,
    /// `(origin, destination)` when the squares decoded.
    pub squares: Option<(Cell, Cell)>,
    pub applied_successfully: bool,
    /// Why the command was skipped.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure: Option<String>,
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Counters from the last [`CommandBuffer::apply`] call.
///
/// `conflict_count` is the number of pieces addressed by more than one
/// command in the batch; all of them are attempted in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub conflict_count: usize,
    pub failed_count: usize,
    pub success_count: usize,
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// FIFO of admitted commands awaiting application.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    last_apply_report: ApplyReport,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command at the back.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every pending command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Report from the last [`apply`](Self::apply) call.
    pub fn last_apply_report(&self) -> &ApplyReport {
        &self.last_apply_report
    }

    /// Route every pending command to its piece, oldest first, and empty
    /// the buffer. Every command is returned, failed ones included.
    pub fn apply(&mut self, world: &mut SimulationWorld, now_ms: u64) -> Vec<AppliedCommand> {
        let commands = std::mem::take(&mut self.commands);

        let mut seen = std::collections::HashMap::new();
        for cmd in &commands {
            *seen.entry(&cmd.piece_id).or_insert(0usize) += 1;
        }
        let conflict_count = seen.values().filter(|&&n| n > 1).count();

        let board = *world.board();
        let mut report = ApplyReport {
            conflict_count,
            ..ApplyReport::default()
        };
        let mut applied = Vec::with_capacity(commands.len());

        for (index, command) in commands.into_iter().enumerate() {
            let squares = command.squares(&board).ok();
            let result = match world.piece_mut(&command.piece_id) {
                Some(piece) => piece.on_command(&command, now_ms, &board).map_err(|e| e.to_string()),
                None => Err(format!("piece '{}' is no longer active", command.piece_id)),
            };
            let failure = match result {
                Ok(()) => {
                    report.success_count += 1;
                    None
                }
                Err(reason) => {
                    report.failed_count += 1;
                    warn!(command = %command, reason = %reason, "command skipped");
                    Some(reason)
                }
            };
            applied.push(AppliedCommand {
                command,
                command_index: index as u32,
                squares,
                applied_successfully: failure.is_none(),
                failure,
            });
        }

        self.last_apply_report = report;
        applied
    }
}
