//! Thread-safe FIFO of inputs for the tick loop.
//!
//! Producers (input threads, bots, tests) push [`Input`]s through any clone
//! of a [`CommandQueue`]; the tick thread drains them once per tick. The
//! queue never touches piece state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rtchess_core::board::Cell;
use rtchess_core::command::Command;
use rtchess_core::side::Side;
use serde::{Deserialize, Serialize};

/// Something a player did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    /// A fully formed command.
    Command(Command),
    /// A cursor action: select a piece at `cell`, or send the selected piece
    /// there (as a jump when `jump` is set).
    Cursor { side: Side, cell: Cell, jump: bool },
}

impl From<Command> for Input {
    fn from(command: Command) -> Self {
        Input::Command(command)
    }
}

/// Shared producer/consumer queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: Arc<Mutex<VecDeque<Input>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an input at the back.
    pub fn push(&self, input: impl Into<Input>) {
        self.lock().push_back(input.into());
    }

    /// Take every queued input, oldest first.
    pub fn drain(&self) -> Vec<Input> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Input>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
