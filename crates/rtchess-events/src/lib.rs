//! rtchess events -- the notification layer.
//!
//! The engine reports what happened during a tick as named [`GameEvent`]s.
//! Delivery is synchronous and in-process: the [`EventBus`] calls every
//! matching subscriber immediately, with no retry and no persistence. The
//! [`EventJournal`] keeps a bounded rolling history of recent events for
//! debugging tools and tests.
//!
//! # Modules
//!
//! - [`event`]: the event payloads and their wire names.
//! - [`bus`]: name-keyed synchronous publish/subscribe.
//! - [`journal`]: bounded event history with simple queries.

#![deny(unsafe_code)]

pub mod bus;
pub mod event;
pub mod journal;

pub use bus::EventBus;
pub use event::GameEvent;
pub use journal::{EventJournal, JournalEntry};
