//! Synchronous, in-process publish/subscribe keyed by event name.
//!
//! Subscribers are plain closures. [`EventBus::publish`] calls every
//! subscriber registered for the event's name, then every wildcard
//! subscriber, in registration order, before returning.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use rtchess_core::prelude::*;
//! use rtchess_events::{EventBus, GameEvent};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let mut bus = EventBus::new();
//! let sink = Arc::clone(&seen);
//! bus.subscribe("game_over", move |e: &GameEvent| {
//!     sink.lock().unwrap().push(e.at_ms());
//! });
//!
//! bus.publish(&GameEvent::GameOver { winner: Some(Side::Black), winner_piece: None, at_ms: 42 });
//! assert_eq!(*seen.lock().unwrap(), vec![42]);
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::event::GameEvent;

/// A registered event handler.
pub type Subscriber = Box<dyn FnMut(&GameEvent) + Send>;

/// Name-keyed synchronous event dispatch.
#[derive(Default)]
pub struct EventBus {
    by_name: HashMap<String, Vec<Subscriber>>,
    wildcard: Vec<Subscriber>,
    published: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("names", &self.by_name.keys().collect::<Vec<_>>())
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.published)
            .finish()
    }
}

impl EventBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event named `name`.
    pub fn subscribe<F>(&mut self, name: &str, handler: F)
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.by_name
            .entry(name.to_owned())
            .or_default()
            .push(Box::new(handler));
    }

    /// Call `handler` for every event.
    pub fn subscribe_all<F>(&mut self, handler: F)
    where
        F: FnMut(&GameEvent) + Send + 'static,
    {
        self.wildcard.push(Box::new(handler));
    }

    /// Deliver `event` to its subscribers. Returns how many were called.
    pub fn publish(&mut self, event: &GameEvent) -> usize {
        self.published += 1;
        let mut delivered = 0;
        if let Some(handlers) = self.by_name.get_mut(event.name()) {
            for handler in handlers.iter_mut() {
                handler(event);
                delivered += 1;
            }
        }
        for handler in self.wildcard.iter_mut() {
            handler(event);
            delivered += 1;
        }
        trace!(event = event.name(), delivered, "event published");
        delivered
    }

    /// Total number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.by_name.values().map(Vec::len).sum::<usize>() + self.wildcard.len()
    }

    /// Number of events published so far.
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rtchess_core::prelude::*;

    use super::*;

    fn moved(at_ms: u64) -> GameEvent {
        GameEvent::PieceMoved {
            piece: PieceId::new("PW_0"),
            kind: CommandKind::Move,
            from: Cell::new(1, 0),
            to: Cell::new(2, 0),
            at_ms,
        }
    }

    #[test]
    fn only_matching_names_are_called() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let a = Arc::clone(&log);
        bus.subscribe("piece_moved", move |e| a.lock().unwrap().push(format!("moved@{}", e.at_ms())));
        let b = Arc::clone(&log);
        bus.subscribe("piece_captured", move |_| b.lock().unwrap().push("captured".to_owned()));

        assert_eq!(bus.publish(&moved(5)), 1);
        assert_eq!(*log.lock().unwrap(), vec!["moved@5".to_owned()]);
    }

    #[test]
    fn wildcard_runs_after_named_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let w = Arc::clone(&log);
        bus.subscribe_all(move |_| w.lock().unwrap().push("all"));
        let n1 = Arc::clone(&log);
        bus.subscribe("piece_moved", move |_| n1.lock().unwrap().push("first"));
        let n2 = Arc::clone(&log);
        bus.subscribe("piece_moved", move |_| n2.lock().unwrap().push("second"));

        assert_eq!(bus.publish(&moved(0)), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "all"]);
        assert_eq!(bus.subscriber_count(), 3);
        assert_eq!(bus.published(), 1);
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let mut bus = EventBus::new();
        assert_eq!(bus.publish(&moved(0)), 0);
    }
}
