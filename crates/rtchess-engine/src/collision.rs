//! Per-tick capture arbitration.
//!
//! After motion updates and command application, the [`CollisionResolver`]
//! lands any jump whose airborne time is over, groups every grounded piece by
//! its rounded cell, and settles each contested cell:
//!
//! - the survivor is the piece with the most recent accepted command;
//!   pieces that were never commanded rank below any mover, and exact ties go
//!   to the piece created first
//! - every other occupant on the opposing side is captured
//! - occupants on the survivor's own side are left alone
//!
//! Airborne pieces are not in the occupancy map at all. Capture eligibility
//! predicates are not consulted here; timing only matters through the
//! last-move ordering.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use rtchess_core::board::Cell;
use rtchess_core::piece::PieceId;
use rtchess_core::side::Side;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::world::SimulationWorld;

/// One removal decided by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    pub captured: PieceId,
    pub captured_side: Side,
    pub capturing: PieceId,
    pub cell: Cell,
}

/// Settles contested cells once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver;

impl CollisionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve every contested cell at `now_ms` and remove the captured
    /// pieces from `world`. Captures are returned in cell order.
    pub fn resolve(&self, world: &mut SimulationWorld, now_ms: u64) -> Vec<Capture> {
        for piece in world.pieces_mut() {
            piece.land_if_due(now_ms);
        }

        let mut by_cell: BTreeMap<Cell, Vec<usize>> = BTreeMap::new();
        for (idx, piece) in world.pieces().iter().enumerate() {
            if !piece.motion().is_airborne() {
                by_cell.entry(piece.cell()).or_default().push(idx);
            }
        }

        let pieces = world.pieces();
        let mut captures = Vec::new();
        for (cell, occupants) in by_cell.into_iter().filter(|(_, o)| o.len() > 1) {
            let Some(&winner_idx) = occupants
                .iter()
                .max_by_key(|&&i| (pieces[i].last_move_ms(), Reverse(pieces[i].seq())))
            else {
                continue;
            };
            let winner = &pieces[winner_idx];

            for &idx in &occupants {
                let other = &pieces[idx];
                if idx == winner_idx {
                    continue;
                }
                if other.side() == winner.side() {
                    warn!(cell = %cell, a = %winner.id(), b = %other.id(), "same-side pieces share a cell");
                    continue;
                }
                captures.push(Capture {
                    captured: other.id().clone(),
                    captured_side: other.side(),
                    capturing: winner.id().clone(),
                    cell,
                });
            }
        }

        for capture in &captures {
            world.remove(&capture.captured);
            info!(
                captured = %capture.captured,
                capturing = %capture.capturing,
                cell = %capture.cell,
                "piece captured"
            );
        }
        captures
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rtchess_core::board::Board;
    use rtchess_core::command::CommandKind;

    use super::*;
    use crate::admission::CommandProcessor;
    use crate::config::EngineConfig;
    use crate::template::{PieceFactory, TemplateLibrary};

    fn setup(codes: &[(&str, Cell)]) -> SimulationWorld {
        let mut factory = PieceFactory::new(Arc::new(TemplateLibrary::builtin(&EngineConfig::default())));
        let mut world = SimulationWorld::new(Board::default());
        for (code, cell) in codes {
            world.spawn(factory.create(code.parse().unwrap(), *cell).unwrap()).unwrap();
        }
        world
    }

    fn id(s: &str) -> PieceId {
        PieceId::new(s)
    }

    #[test]
    fn uncontested_cells_are_left_alone() {
        let mut world = setup(&[("PW", Cell::new(1, 0)), ("PB", Cell::new(6, 0))]);
        assert!(CollisionResolver::new().resolve(&mut world, 0).is_empty());
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn latest_mover_wins() {
        let mut world = setup(&[("RW", Cell::new(3, 3)), ("RB", Cell::new(3, 3))]);
        world.piece_mut(&id("RW_0")).unwrap().arm_admission(100, 0);
        world.piece_mut(&id("RB_1")).unwrap().arm_admission(300, 0);

        let captures = CollisionResolver::new().resolve(&mut world, 400);
        assert_eq!(
            captures,
            vec![Capture {
                captured: id("RW_0"),
                captured_side: Side::White,
                capturing: id("RB_1"),
                cell: Cell::new(3, 3),
            }]
        );
        assert!(world.piece(&id("RW_0")).is_none());
    }

    #[test]
    fn unmoved_pieces_lose_and_ties_go_to_first_created() {
        let mut world = setup(&[("RW", Cell::new(3, 3)), ("RB", Cell::new(3, 3))]);
        world.piece_mut(&id("RB_1")).unwrap().arm_admission(0, 0);
        let captures = CollisionResolver::new().resolve(&mut world, 10);
        assert_eq!(captures[0].capturing, id("RB_1"));

        let mut world = setup(&[("RW", Cell::new(3, 3)), ("RB", Cell::new(3, 3))]);
        let captures = CollisionResolver::new().resolve(&mut world, 10);
        assert_eq!(captures[0].capturing, id("RW_0"));
    }

    #[test]
    fn same_side_overlap_is_benign() {
        let mut world = setup(&[("RW", Cell::new(3, 3)), ("NW", Cell::new(3, 3))]);
        assert!(CollisionResolver::new().resolve(&mut world, 0).is_empty());
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn airborne_pieces_are_immune() {
        let mut world = setup(&[("NW", Cell::new(2, 2)), ("PB", Cell::new(2, 2))]);
        let processor = CommandProcessor::default();
        let cmd = processor
            .admit_to(&mut world, &id("NW_0"), CommandKind::Jump, Cell::new(4, 2), 0)
            .unwrap();
        let board = *world.board();
        world.piece_mut(&id("NW_0")).unwrap().on_command(&cmd, 0, &board).unwrap();

        assert!(CollisionResolver::new().resolve(&mut world, 500).is_empty());
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn one_winner_takes_several_enemies() {
        let mut world = setup(&[
            ("QW", Cell::new(4, 4)),
            ("PB", Cell::new(4, 4)),
            ("NB", Cell::new(4, 4)),
        ]);
        world.piece_mut(&id("QW_0")).unwrap().arm_admission(50, 0);
        let captures = CollisionResolver::new().resolve(&mut world, 60);
        assert_eq!(captures.len(), 2);
        assert!(captures.iter().all(|c| c.capturing == id("QW_0")));
        assert_eq!(world.len(), 1);
    }
}
