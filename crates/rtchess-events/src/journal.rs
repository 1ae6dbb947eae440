//! Bounded history of recent game events.
//!
//! The [`EventJournal`] keeps the last `max_history` events, each tagged with
//! the tick that produced it. Older entries are discarded as new ones arrive.
//!
//! # Example
//!
//! ```
//! use rtchess_core::prelude::*;
//! use rtchess_events::{EventJournal, GameEvent};
//!
//! let mut journal = EventJournal::with_max_history(2);
//! for tick in 0..3 {
//!     journal.record(tick, GameEvent::GameOver { winner: None, winner_piece: None, at_ms: tick * 10 });
//! }
//! assert_eq!(journal.len(), 2);
//! assert_eq!(journal.entries().next().map(|e| e.tick), Some(1));
//! ```

use std::collections::VecDeque;

use rtchess_core::piece::PieceId;
use serde::{Deserialize, Serialize};

use crate::event::GameEvent;

/// Default number of retained events.
pub const DEFAULT_MAX_HISTORY: usize = 256;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Tick that produced the event.
    pub tick: u64,
    /// The event itself.
    pub event: GameEvent,
}

/// Rolling event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventJournal {
    entries: VecDeque<JournalEntry>,
    max_history: usize,
    /// Events recorded since creation, including discarded ones.
    total: u64,
}

impl Default for EventJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl EventJournal {
    /// A journal retaining [`DEFAULT_MAX_HISTORY`] events.
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    /// A journal retaining at most `max_history` events.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_history,
            total: 0,
        }
    }

    /// Append an event, trimming the oldest entries past capacity.
    pub fn record(&mut self, tick: u64, event: GameEvent) {
        self.entries.push_back(JournalEntry { tick, event });
        self.total += 1;
        while self.entries.len() > self.max_history {
            self.entries.pop_front();
        }
    }

    /// Drop all retained entries. The running total is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events recorded over the journal's lifetime.
    pub fn total_recorded(&self) -> u64 {
        self.total
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Retained events with the given wire name.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a JournalEntry> {
        self.entries.iter().filter(move |e| e.event.name() == name)
    }

    /// Retained events mentioning `piece`.
    pub fn for_piece<'a>(&'a self, piece: &'a PieceId) -> impl Iterator<Item = &'a JournalEntry> {
        self.entries.iter().filter(move |e| e.event.involves(piece))
    }

    /// Retained events produced during `tick`.
    pub fn at_tick(&self, tick: u64) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |e| e.tick == tick)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rtchess_core::prelude::*;

    use super::*;

    fn capture(tick: u64, captured: &str, capturing: &str) -> (u64, GameEvent) {
        (
            tick,
            GameEvent::PieceCaptured {
                captured: PieceId::new(captured),
                capturing: PieceId::new(capturing),
                cell: Cell::new(3, 3),
                at_ms: tick * 33,
            },
        )
    }

    // -- 1. Empty journal ---------------------------------------------------

    #[test]
    fn empty_journal() {
        let journal = EventJournal::new();
        assert!(journal.is_empty());
        assert_eq!(journal.max_history(), DEFAULT_MAX_HISTORY);
        assert_eq!(journal.named("piece_captured").count(), 0);
    }

    // -- 2. Queries ---------------------------------------------------------

    #[test]
    fn queries_filter_by_name_piece_and_tick() {
        let mut journal = EventJournal::new();
        let (t, e) = capture(1, "PB_8", "NW_1");
        journal.record(t, e);
        let (t, e) = capture(2, "PB_9", "QW_3");
        journal.record(t, e);
        journal.record(
            2,
            GameEvent::PieceMoved {
                piece: PieceId::new("NW_1"),
                kind: CommandKind::Jump,
                from: Cell::new(0, 1),
                to: Cell::new(2, 2),
                at_ms: 70,
            },
        );

        assert_eq!(journal.named("piece_captured").count(), 2);
        assert_eq!(journal.for_piece(&PieceId::new("NW_1")).count(), 2);
        assert_eq!(journal.at_tick(2).count(), 2);
    }

    // -- 3. History bound ---------------------------------------------------

    #[test]
    fn history_is_trimmed_oldest_first() {
        let mut journal = EventJournal::with_max_history(3);
        for tick in 0..10 {
            let (t, e) = capture(tick, "PB_8", "NW_1");
            journal.record(t, e);
        }
        assert_eq!(journal.len(), 3);
        assert_eq!(journal.total_recorded(), 10);
        let ticks: Vec<u64> = journal.entries().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![7, 8, 9]);

        journal.clear();
        assert!(journal.is_empty());
        assert_eq!(journal.total_recorded(), 10);
    }
}
