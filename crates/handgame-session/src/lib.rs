//! Live connection registry for handgame.
//!
//! A participant has at most one live connection. This crate keeps the
//! mapping between connections, participants and rooms, and delivers
//! encoded frames to them:
//!
//! - [`ConnectionRegistry`]: register, look up, evict, unicast, broadcast
//! - [`Binding`]: one connection ↔ (participant, room) association
//! - [`Outbound`]: what a connection task is asked to do next
//!
//! # How it fits in the stack
//!
//! ```text
//! Room coordinator (above)  ← decides who hears what
//!     ↕
//! Session layer (this crate)  ← knows who is connected where
//!     ↕
//! Protocol / transport (below)  ← ids and connection handles
//! ```

mod binding;
mod error;
mod registry;

pub use binding::{Binding, Frame, Outbound, PlayerSender};
pub use error::SessionError;
pub use registry::ConnectionRegistry;
