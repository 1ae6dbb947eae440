//! Deterministic replay with input recording and checkpoint verification.
//!
//! A [`ReplayRecorder`] captures, per tick, the inputs the tick drained, the
//! clock reading it ran at, and periodic state-hash checkpoints taken before
//! the tick executes. The resulting [`ReplayLog`] carries the configuration
//! and starting layout, so [`replay`] can rebuild the world from scratch on a
//! [`ManualClock`], feed the same inputs at the same times and compare hashes.
//!
//! # Recording and replaying
//!
//! ```
//! use std::sync::Arc;
//!
//! use rtchess_engine::prelude::*;
//!
//! let config = EngineConfig::default();
//! let library = Arc::new(TemplateLibrary::builtin(&config));
//! let setup = standard_layout();
//!
//! let clock = ManualClock::new(0);
//! let mut tick_loop =
//!     TickLoop::from_setup(config.clone(), library.clone(), &setup, Box::new(clock.clone())).unwrap();
//! let mut recorder = ReplayRecorder::new(config, setup, 5);
//!
//! tick_loop.queue().push(Command::movement(
//!     0, PieceId::new("PW_8"), CommandKind::Move, Cell::new(1, 0), Cell::new(2, 0), &Board::default(),
//! ));
//! for _ in 0..20 {
//!     recorder.step(&mut tick_loop).unwrap();
//!     clock.advance(33);
//! }
//!
//! let log = recorder.finish();
//! let result = replay(&log, library).unwrap();
//! assert!(result.completed);
//! assert_eq!(result.ticks_replayed, 20);
//! assert!(result.first_divergence.is_none());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::queue::Input;
use crate::snapshot::SnapshotError;
use crate::template::{Placement, TemplateLibrary};
use crate::tick::{TickLoop, TickReport};
use crate::EngineError;

// ---------------------------------------------------------------------------
// ReplayError
// ---------------------------------------------------------------------------

/// A malformed log or a recorder used out of order.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("replay log contains duplicate Input entry at tick {tick}")]
    DuplicateInput { tick: u64 },

    #[error("replay log contains duplicate Checkpoint entry at tick {tick}")]
    DuplicateCheckpoint { tick: u64 },

    #[error("replay log records {total_ticks} ticks but {tick_times} tick times")]
    TickTimesMismatch { total_ticks: u64, tick_times: usize },

    #[error("tick {got} recorded out of order; expected tick {expected}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// Everything needed to re-run a game: setup, clock readings, inputs and
/// checkpoints. Fully serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayLog {
    pub config: EngineConfig,
    /// Starting layout, in spawn order.
    pub setup: Vec<Placement>,
    /// Number of ticks recorded, starting at tick 0.
    pub total_ticks: u64,
    /// Clock reading of each tick, indexed by tick.
    pub tick_times: Vec<u64>,
    pub entries: Vec<ReplayEntry>,
}

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// Inputs drained by the given tick, in queue order.
    Input { tick: u64, inputs: Vec<Input> },
    /// State hash taken before the given tick executed.
    Checkpoint { tick: u64, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// `false` when a checkpoint diverged.
    pub completed: bool,
    pub ticks_replayed: u64,
    pub first_divergence: Option<ReplayDivergence>,
}

/// The first checkpoint whose replayed hash differs from the recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records a run into a [`ReplayLog`].
///
/// Ticks must be recorded contiguously from tick 0, which is what a fresh
/// [`TickLoop`] produces.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
}

impl ReplayRecorder {
    /// `checkpoint_interval` of 10 checkpoints ticks 0, 10, 20, ...; 0
    /// checkpoints every tick.
    pub fn new(config: EngineConfig, setup: Vec<Placement>, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                config,
                setup,
                total_ticks: 0,
                tick_times: Vec::new(),
                entries: Vec::new(),
            },
            checkpoint_interval,
        }
    }

    /// Whether `tick` falls on the checkpoint interval.
    pub fn wants_checkpoint(&self, tick: u64) -> bool {
        self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0
    }

    /// Record one executed tick. `hash_before` is the state hash taken
    /// before the tick ran; it is stored only on checkpoint ticks.
    pub fn record_tick(
        &mut self,
        hash_before: Option<String>,
        report: &TickReport,
    ) -> Result<(), ReplayError> {
        let expected = self.log.total_ticks;
        if report.tick != expected {
            return Err(ReplayError::OutOfOrder {
                expected,
                got: report.tick,
            });
        }

        if let Some(state_hash) = hash_before.filter(|_| self.wants_checkpoint(report.tick)) {
            self.log.entries.push(ReplayEntry::Checkpoint {
                tick: report.tick,
                state_hash,
            });
        }
        if !report.inputs.is_empty() {
            self.log.entries.push(ReplayEntry::Input {
                tick: report.tick,
                inputs: report.inputs.clone(),
            });
        }
        self.log.tick_times.push(report.now_ms);
        self.log.total_ticks += 1;
        Ok(())
    }

    /// Hash if due, tick, and record.
    pub fn step(&mut self, tick_loop: &mut TickLoop) -> Result<TickReport, ReplayError> {
        let hash_before = if self.wants_checkpoint(tick_loop.tick_count()) {
            Some(tick_loop.state_hash()?)
        } else {
            None
        };
        let report = tick_loop.tick();
        self.record_tick(hash_before, &report)?;
        Ok(report)
    }

    /// Ticks recorded so far.
    pub fn ticks_recorded(&self) -> u64 {
        self.log.total_ticks
    }

    pub fn finish(self) -> ReplayLog {
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Rebuild the recorded game with `library` and verify every checkpoint.
///
/// The log is validated before any world is built. Replay stops at the
/// first divergence.
///
/// # Errors
///
/// Returns an error for duplicate entries, a tick-time table whose length
/// does not match `total_ticks`, or a setup the engine refuses.
pub fn replay(log: &ReplayLog, library: Arc<TemplateLibrary>) -> Result<ReplayResult, ReplayError> {
    let mut input_map: BTreeMap<u64, &[Input]> = BTreeMap::new();
    let mut checkpoint_map: BTreeMap<u64, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { tick, inputs } => {
                if input_map.insert(*tick, inputs).is_some() {
                    return Err(ReplayError::DuplicateInput { tick: *tick });
                }
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoint_map.insert(*tick, state_hash).is_some() {
                    return Err(ReplayError::DuplicateCheckpoint { tick: *tick });
                }
            }
        }
    }
    if log.tick_times.len() as u64 != log.total_ticks {
        return Err(ReplayError::TickTimesMismatch {
            total_ticks: log.total_ticks,
            tick_times: log.tick_times.len(),
        });
    }

    let clock = ManualClock::new(0);
    let mut tick_loop = TickLoop::from_setup(
        log.config.clone(),
        library,
        &log.setup,
        Box::new(clock.clone()),
    )?;

    let mut ticks_replayed = 0;
    for (tick, &now_ms) in (0u64..).zip(&log.tick_times) {
        if let Some(expected_hash) = checkpoint_map.get(&tick) {
            let actual_hash = tick_loop.state_hash()?;
            if actual_hash != *expected_hash {
                warn!(tick, expected = %expected_hash, actual = %actual_hash, "replay diverged");
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: expected_hash.to_string(),
                        actual_hash,
                    }),
                });
            }
        }

        clock.set(now_ms);
        for input in input_map.get(&tick).copied().unwrap_or_default() {
            tick_loop.queue().push(input.clone());
        }
        tick_loop.tick();
        ticks_replayed += 1;
    }

    debug!(ticks_replayed, checkpoints = checkpoint_map.len(), "replay complete");
    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}

#[cfg(test)]
mod tests {
    use rtchess_core::board::Cell;

    use super::*;
    use crate::template::standard_layout;

    fn recorded(ticks: u64) -> (ReplayLog, Arc<TemplateLibrary>) {
        let config = EngineConfig::default();
        let library = Arc::new(TemplateLibrary::builtin(&config));
        let setup = standard_layout();
        let clock = ManualClock::new(0);
        let mut tick_loop =
            TickLoop::from_setup(config.clone(), library.clone(), &setup, Box::new(clock.clone()))
                .unwrap();
        let mut recorder = ReplayRecorder::new(config, setup, 0);
        tick_loop.queue().push(Input::Cursor {
            side: rtchess_core::side::Side::White,
            cell: Cell::new(1, 4),
            jump: false,
        });
        for _ in 0..ticks {
            recorder.step(&mut tick_loop).unwrap();
            clock.advance(40);
        }
        (recorder.finish(), library)
    }

    #[test]
    fn empty_log_replays_trivially() {
        let (log, library) = recorded(0);
        let result = replay(&log, library).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 0);
    }

    #[test]
    fn recorded_run_replays_cleanly() {
        let (log, library) = recorded(8);
        assert_eq!(log.total_ticks, 8);
        assert_eq!(log.tick_times, vec![0, 40, 80, 120, 160, 200, 240, 280]);
        let result = replay(&log, library).unwrap();
        assert!(result.completed);
        assert_eq!(result.ticks_replayed, 8);
    }

    #[test]
    fn tampered_checkpoint_is_reported() {
        let (mut log, library) = recorded(4);
        for entry in &mut log.entries {
            if let ReplayEntry::Checkpoint { tick: 2, state_hash } = entry {
                *state_hash = "0".repeat(64);
            }
        }
        let result = replay(&log, library).unwrap();
        assert!(!result.completed);
        assert_eq!(result.ticks_replayed, 2);
        assert_eq!(result.first_divergence.unwrap().tick, 2);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let (mut log, library) = recorded(2);
        log.entries.push(ReplayEntry::Checkpoint {
            tick: 0,
            state_hash: String::new(),
        });
        assert!(matches!(
            replay(&log, library),
            Err(ReplayError::DuplicateCheckpoint { tick: 0 })
        ));
    }

    #[test]
    fn tick_times_must_match() {
        let (mut log, library) = recorded(3);
        log.tick_times.pop();
        assert!(matches!(
            replay(&log, library),
            Err(ReplayError::TickTimesMismatch { total_ticks: 3, tick_times: 2 })
        ));
    }

    #[test]
    fn recorder_refuses_gaps() {
        let config = EngineConfig::default();
        let clock = ManualClock::new(0);
        let mut tick_loop = TickLoop::standard(config.clone(), Box::new(clock)).unwrap();
        tick_loop.tick();
        let report = tick_loop.tick();

        let mut recorder = ReplayRecorder::new(config, standard_layout(), 1);
        assert!(matches!(
            recorder.record_tick(None, &report),
            Err(ReplayError::OutOfOrder { expected: 0, got: 1 })
        ));
    }
}
