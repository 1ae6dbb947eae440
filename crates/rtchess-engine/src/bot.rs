//! Seeded random player.
//!
//! [`RandomPlayer`] picks one of its side's available pieces and a target
//! the [`CommandProcessor`] would accept right now. The same seed against
//! the same world always yields the same commands.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rtchess_core::board::Cell;
use rtchess_core::command::{Command, CommandKind};
use rtchess_core::side::Side;
use tracing::trace;

use crate::admission::CommandProcessor;
use crate::world::SimulationWorld;

/// Chance that a generated command is a jump.
pub const DEFAULT_JUMP_CHANCE: f64 = 0.25;

/// Random command source for one side.
#[derive(Debug, Clone)]
pub struct RandomPlayer {
    side: Side,
    rng: Pcg64,
    jump_chance: f64,
}

impl RandomPlayer {
    pub fn new(side: Side, seed: u64) -> Self {
        Self {
            side,
            rng: Pcg64::seed_from_u64(seed),
            jump_chance: DEFAULT_JUMP_CHANCE,
        }
    }

    /// Set the jump probability, clamped to `[0, 1]`.
    pub fn with_jump_chance(mut self, chance: f64) -> Self {
        self.jump_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Propose an admissible command, or `None` if no own piece can act.
    pub fn next_command(
        &mut self,
        world: &SimulationWorld,
        processor: &CommandProcessor,
        now_ms: u64,
    ) -> Option<Command> {
        let mut own: Vec<_> = world
            .pieces()
            .iter()
            .filter(|p| p.side() == self.side)
            .collect();
        own.shuffle(&mut self.rng);

        let kind = if self.rng.gen_bool(self.jump_chance) {
            CommandKind::Jump
        } else {
            CommandKind::Move
        };
        let max = match kind {
            CommandKind::Move => processor.policy().max_move_distance,
            CommandKind::Jump => processor.policy().max_jump_distance,
        };
        let board = world.board();
        let reach = i32::try_from(max.min(board.width.max(board.height))).unwrap_or(i32::MAX);

        for piece in own {
            let origin = piece.cell();
            let targets: Vec<Cell> = (-reach..=reach)
                .flat_map(|dr| (-reach..=reach).map(move |dc| origin.offset(dr, dc)))
                .filter(|&dest| {
                    processor
                        .check(world, piece.id(), kind, dest, now_ms)
                        .is_ok()
                })
                .collect();
            if let Some(&dest) = targets.choose(&mut self.rng) {
                trace!(side = %self.side, piece = %piece.id(), from = %origin, to = %dest, "bot command");
                return Some(Command::movement(
                    now_ms,
                    piece.id().clone(),
                    kind,
                    origin,
                    dest,
                    world.board(),
                ));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rtchess_core::board::Board;

    use super::*;
    use crate::config::EngineConfig;
    use crate::template::{standard_layout, PieceFactory, TemplateLibrary};

    fn standard_world() -> SimulationWorld {
        let mut factory = PieceFactory::new(Arc::new(TemplateLibrary::builtin(&EngineConfig::default())));
        let mut world = SimulationWorld::new(Board::default());
        for placement in standard_layout() {
            world.spawn(factory.create(placement.code, placement.cell).unwrap()).unwrap();
        }
        world
    }

    #[test]
    fn commands_are_admissible_and_own_side() {
        let world = standard_world();
        let processor = CommandProcessor::default();
        let mut bot = RandomPlayer::new(Side::Black, 7);
        for _ in 0..20 {
            let cmd = bot.next_command(&world, &processor, 0).unwrap();
            let piece = world.piece(&cmd.piece_id).unwrap();
            assert_eq!(piece.side(), Side::Black);
            let dest = cmd.destination(world.board()).unwrap();
            assert!(processor.check(&world, &cmd.piece_id, cmd.kind, dest, 0).is_ok());
        }
    }

    #[test]
    fn same_seed_same_commands() {
        let world = standard_world();
        let processor = CommandProcessor::default();
        let mut a = RandomPlayer::new(Side::White, 42);
        let mut b = RandomPlayer::new(Side::White, 42);
        for _ in 0..10 {
            assert_eq!(
                a.next_command(&world, &processor, 0),
                b.next_command(&world, &processor, 0)
            );
        }
    }

    #[test]
    fn no_pieces_no_command() {
        let world = SimulationWorld::new(Board::default());
        let mut bot = RandomPlayer::new(Side::White, 1);
        assert!(bot.next_command(&world, &CommandProcessor::default(), 0).is_none());
    }
}
