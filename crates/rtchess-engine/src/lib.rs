//! rtchess engine -- the real-time chess simulation driver.
//!
//! This crate builds on [`rtchess_core`] and [`rtchess_events`] to run a game:
//! a fixed-rate [`TickLoop`](tick::TickLoop) that advances piece motion,
//! admits player commands through a single
//! [`CommandProcessor`](admission::CommandProcessor), settles contested cells
//! with the [`CollisionResolver`](collision::CollisionResolver) and reports
//! everything as [`GameEvent`](rtchess_events::GameEvent)s.
//!
//! # Quick Start
//!
//! ```
//! use rtchess_engine::prelude::*;
//!
//! let clock = ManualClock::new(0);
//! let mut tick_loop = TickLoop::standard(EngineConfig::default(), Box::new(clock.clone())).unwrap();
//! assert_eq!(tick_loop.world().len(), 32);
//!
//! for _ in 0..10 {
//!     clock.advance(33);
//!     tick_loop.tick();
//! }
//! assert_eq!(tick_loop.tick_count(), 10);
//! assert!(!tick_loop.world().is_game_over());
//! ```

#![deny(unsafe_code)]

pub mod admission;
pub mod bot;
pub mod buffer;
pub mod clock;
pub mod collision;
pub mod config;
pub mod queue;
pub mod replay;
pub mod snapshot;
pub mod template;
pub mod tick;
pub mod world;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use rtchess_core;

/// Re-export the events crate for convenience.
pub use rtchess_events;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors raised while building or driving an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("template error: {0}")]
    Template(#[from] template::TemplateError),

    #[error("world setup error: {0}")]
    World(#[from] world::WorldError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] snapshot::SnapshotError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use rtchess_core::prelude::*;
    pub use rtchess_events::{EventBus, EventJournal, GameEvent, JournalEntry};

    pub use crate::admission::{AdmissionRejected, CommandProcessor};
    pub use crate::bot::RandomPlayer;
    pub use crate::buffer::{AppliedCommand, ApplyReport, CommandBuffer};
    pub use crate::clock::{Clock, ManualClock, SimulationClock};
    pub use crate::collision::{Capture, CollisionResolver};
    pub use crate::config::{AdmissionConfig, ConfigError, EngineConfig};
    pub use crate::queue::{CommandQueue, Input};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayError, ReplayLog, ReplayRecorder,
        ReplayResult,
    };
    pub use crate::snapshot::{PieceSnapshot, SnapshotError, WorldSnapshot};
    pub use crate::template::{standard_layout, PieceFactory, PieceTemplate, Placement, TemplateLibrary};
    pub use crate::tick::{Rejection, TickDiagnostics, TickLoop, TickReport, TickSummary};
    pub use crate::world::{Outcome, SimulationWorld, WorldError};
    pub use crate::EngineError;
}
