//! Fixed-rate tick loop.
//!
//! The [`TickLoop`] owns the [`SimulationWorld`] and drives it forward. Each
//! tick runs these phases in order, on one thread:
//!
//! 1. Read the clock (never moving backwards).
//! 2. Advance every piece's motion.
//! 3. Drain the [`CommandQueue`] and admit each input through the
//!    [`CommandProcessor`] into the pending [`CommandBuffer`].
//! 4. Apply the buffer FIFO and emit `piece_moved` for each applied command.
//! 5. Run the [`CollisionResolver`] and emit `piece_captured` per removal.
//! 6. Check for a winner and emit `game_over` once.
//!
//! Inputs only enter through the queue, so the same inputs at the same clock
//! readings always produce the same world.
//!
//! # Example
//!
//! ```
//! use rtchess_core::prelude::*;
//! use rtchess_engine::prelude::*;
//!
//! let clock = ManualClock::new(0);
//! let mut tick_loop = TickLoop::standard(EngineConfig::default(), Box::new(clock.clone())).unwrap();
//!
//! tick_loop.queue().push(Command::movement(
//!     0, PieceId::new("PW_8"), CommandKind::Move, Cell::new(1, 0), Cell::new(2, 0), &Board::default(),
//! ));
//! let report = tick_loop.tick();
//! assert_eq!(report.applied.len(), 1);
//!
//! clock.set(250);
//! tick_loop.tick();
//! let pawn = tick_loop.world().piece(&PieceId::new("PW_8")).unwrap();
//! assert_eq!(pawn.cell(), Cell::new(2, 0));
//! assert_eq!(tick_loop.tick_count(), 2);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use rtchess_core::board::Cell;
use rtchess_core::command::CommandKind;
use rtchess_core::piece::PieceId;
use rtchess_core::side::Side;
use rtchess_events::{EventBus, EventJournal, GameEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::admission::{AdmissionRejected, CommandProcessor};
use crate::buffer::{AppliedCommand, CommandBuffer};
use crate::clock::Clock;
use crate::collision::{Capture, CollisionResolver};
use crate::config::EngineConfig;
use crate::queue::{CommandQueue, Input};
use crate::template::{standard_layout, PieceFactory, Placement, TemplateLibrary};
use crate::world::{Outcome, SimulationWorld};
use crate::EngineError;

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Wall-clock timing of the last tick, per phase.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    pub update_time: Duration,
    pub admission_time: Duration,
    pub apply_time: Duration,
    pub collision_time: Duration,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// An input the processor turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub input: Input,
    pub reason: AdmissionRejected,
}

/// Everything one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Index of this tick, starting at 0.
    pub tick: u64,
    /// Simulation time the tick ran at.
    pub now_ms: u64,
    /// Inputs drained from the queue, in order.
    pub inputs: Vec<Input>,
    /// Commands routed to pieces, failed ones included.
    pub applied: Vec<AppliedCommand>,
    pub rejections: Vec<Rejection>,
    pub captures: Vec<Capture>,
    /// Outcome after the tick.
    pub outcome: Outcome,
}

impl TickReport {
    /// Commands that actually changed a piece.
    pub fn successful(&self) -> impl Iterator<Item = &AppliedCommand> {
        self.applied.iter().filter(|a| a.applied_successfully)
    }
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The simulation driver.
pub struct TickLoop {
    world: SimulationWorld,
    processor: CommandProcessor,
    resolver: CollisionResolver,
    buffer: CommandBuffer,
    queue: CommandQueue,
    clock: Box<dyn Clock>,
    bus: EventBus,
    journal: EventJournal,
    config: EngineConfig,
    tick_counter: u64,
    now_ms: u64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Wrap an existing world.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        world: SimulationWorld,
        config: EngineConfig,
        clock: Box<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            world,
            processor: CommandProcessor::new(config.admission),
            resolver: CollisionResolver::new(),
            buffer: CommandBuffer::new(),
            queue: CommandQueue::new(),
            clock,
            bus: EventBus::new(),
            journal: EventJournal::with_max_history(config.event_history),
            config,
            tick_counter: 0,
            now_ms: 0,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Build a world from `setup` using `library`, in order.
    pub fn from_setup(
        config: EngineConfig,
        library: Arc<TemplateLibrary>,
        setup: &[Placement],
        clock: Box<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let mut factory = PieceFactory::new(library);
        let mut world = SimulationWorld::new(config.board);
        for placement in setup {
            world.spawn(factory.create(placement.code, placement.cell)?)?;
        }
        Self::new(world, config, clock)
    }

    /// The standard 32-piece game with built-in templates.
    pub fn standard(config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        let library = Arc::new(TemplateLibrary::builtin(&config));
        Self::from_setup(config, library, &standard_layout(), clock)
    }

    /// Execute one tick. See the module docs for the phase order.
    pub fn tick(&mut self) -> TickReport {
        let tick_start = Instant::now();
        let tick = self.tick_counter;

        // Phase 1: clock.
        let now_ms = self.clock.now_ms().max(self.now_ms);
        self.now_ms = now_ms;

        // Phase 2: motion.
        let phase_start = Instant::now();
        let finished = self.world.update_pieces(now_ms);
        let update_time = phase_start.elapsed();

        // Phase 3: admission.
        let phase_start = Instant::now();
        let inputs = self.queue.drain();
        let mut rejections = Vec::new();
        for input in &inputs {
            if let Err(reason) = self.admit_input(input, now_ms) {
                debug!(tick, reason = %reason, "input rejected");
                rejections.push(Rejection {
                    input: input.clone(),
                    reason,
                });
            }
        }
        let admission_time = phase_start.elapsed();

        // Phase 4: apply.
        let phase_start = Instant::now();
        let applied = self.buffer.apply(&mut self.world, now_ms);
        let apply_time = phase_start.elapsed();
        for a in applied.iter().filter(|a| a.applied_successfully) {
            if let Some((from, to)) = a.squares {
                self.emit(GameEvent::PieceMoved {
                    piece: a.command.piece_id.clone(),
                    kind: a.command.kind,
                    from,
                    to,
                    at_ms: now_ms,
                });
            }
        }

        // Phase 5: collisions.
        let phase_start = Instant::now();
        let captures = self.resolver.resolve(&mut self.world, now_ms);
        let collision_time = phase_start.elapsed();
        for capture in &captures {
            self.emit(GameEvent::PieceCaptured {
                captured: capture.captured.clone(),
                capturing: capture.capturing.clone(),
                cell: capture.cell,
                at_ms: now_ms,
            });
        }

        // Phase 6: win check.
        let was_over = self.world.is_game_over();
        if !was_over && self.world.check_game_over() {
            let (winner, winner_piece) = match self.world.outcome() {
                Outcome::Won { side, piece } => (Some(*side), Some(piece.clone())),
                _ => (None, None),
            };
            self.emit(GameEvent::GameOver {
                winner,
                winner_piece,
                at_ms: now_ms,
            });
        }

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            update_time,
            admission_time,
            apply_time,
            collision_time,
            total_time: tick_start.elapsed(),
        };
        trace!(
            tick,
            now_ms,
            finished,
            inputs = inputs.len(),
            applied = applied.len(),
            captures = captures.len(),
            "tick complete"
        );

        TickReport {
            tick,
            now_ms,
            inputs,
            applied,
            rejections,
            captures,
            outcome: self.world.outcome().clone(),
        }
    }

    /// Tick until the game ends or `max_ticks` have run, sleeping between
    /// ticks to hold the configured tick rate. Returns the ticks executed.
    pub fn run_until_over(&mut self, max_ticks: u64) -> u64 {
        let interval = self.config.tick_interval();
        let mut ran = 0;
        while ran < max_ticks && !self.world.is_game_over() {
            let started = Instant::now();
            self.tick();
            ran += 1;
            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        ran
    }

    fn admit_input(&mut self, input: &Input, now_ms: u64) -> Result<(), AdmissionRejected> {
        match input {
            Input::Command(command) => {
                let admitted = self.processor.admit(&mut self.world, command, now_ms)?;
                self.buffer.push(admitted);
                Ok(())
            }
            Input::Cursor { side, cell, jump } => self.cursor(*side, *cell, *jump, now_ms),
        }
    }

    /// Selection flow: the first click picks an own available piece, the
    /// second sends it.
    fn cursor(&mut self, side: Side, cell: Cell, jump: bool, now_ms: u64) -> Result<(), AdmissionRejected> {
        let Some(selected) = self.world.selection(side).cloned() else {
            if let Some(id) = self.available_own_piece(side, cell, now_ms) {
                debug!(side = %side, piece = %id, "piece selected");
                self.world.select(side, &id);
            }
            return Ok(());
        };

        let kind = if jump { CommandKind::Jump } else { CommandKind::Move };
        match self.processor.admit_to(&mut self.world, &selected, kind, cell, now_ms) {
            Ok(command) => {
                self.buffer.push(command);
                self.world.clear_selection(side);
                Ok(())
            }
            Err(reason) => {
                match self.available_own_piece(side, cell, now_ms) {
                    Some(id) => {
                        debug!(side = %side, piece = %id, "selection switched");
                        self.world.select(side, &id);
                    }
                    None => self.world.clear_selection(side),
                }
                Err(reason)
            }
        }
    }

    fn available_own_piece(&self, side: Side, cell: Cell, now_ms: u64) -> Option<PieceId> {
        self.world
            .occupants(cell)
            .find(|p| {
                p.side() == side && p.motion().can_capture(now_ms) && now_ms >= p.cooldown_end_ms()
            })
            .map(|p| p.id().clone())
    }

    fn emit(&mut self, event: GameEvent) {
        self.bus.publish(&event);
        self.journal.record(self.tick_counter, event);
    }

    // -- accessors ----------------------------------------------------------

    /// Producer handle; clone it freely.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn world(&self) -> &SimulationWorld {
        &self.world
    }

    /// Direct world access for setup and tests.
    pub fn world_mut(&mut self) -> &mut SimulationWorld {
        &mut self.world
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn processor(&self) -> &CommandProcessor {
        &self.processor
    }

    /// Ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Clock reading of the last tick.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for TickLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoop")
            .field("tick_counter", &self.tick_counter)
            .field("now_ms", &self.now_ms)
            .field("pieces", &self.world.len())
            .field("outcome", self.world.outcome())
            .finish()
    }
}

/// Serializable summary of a [`TickReport`], for logs and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    pub now_ms: u64,
    pub applied: usize,
    pub rejected: usize,
    pub captured: usize,
}

impl From<&TickReport> for TickSummary {
    fn from(report: &TickReport) -> Self {
        Self {
            tick: report.tick,
            now_ms: report.now_ms,
            applied: report.successful().count(),
            rejected: report.rejections.len(),
            captured: report.captures.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
