//! Client-resident reconciliation layer.
//!
//! Sends and likes show up locally before the server confirms them; the
//! state machines here merge the authoritative acknowledgements and the
//! realtime change stream into that optimistic state, deduplicating by row
//! identity and by the client-generated send token. Everything is plain
//! owned state — subscriptions and timers die with the value that owns
//! them, on every exit path.

pub mod chat;
pub mod matches;
pub mod typing;
