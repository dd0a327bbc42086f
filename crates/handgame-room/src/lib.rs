//! Room lifecycle, move ledger and coordination for handgame.
//!
//! A room is one round of the game. Participants are seated while it is
//! Waiting, throw hands while it is Playing and inside its window, and
//! the room is closed for good once it is Ended.
//!
//! # Key types
//!
//! - [`LifecycleStore`]: the persistence contract; [`MemoryStore`]
//!   implements it in process memory
//! - [`RoomCoordinator`]: runs joins, requests and disconnects, and fans
//!   results out through the connection registry
//! - [`Admin`]: typed operator operations with stable error statuses
//! - [`ScoringRule`]: how a hand is scored; [`ClassicRule`] by default
//! - [`MoveWindow`]: when a Playing room accepts hands
//! - [`spawn_expiry_sweep`]: optional task that ends elapsed rooms

mod admin;
mod clock;
mod coordinator;
mod error;
mod ledger;
mod locks;
mod memory;
mod scoring;
mod store;
mod sweep;
mod window;

pub use admin::{
    Admin, AdminError, AdminResult, DEFAULT_RECENT_HANDS, DEFAULT_TIME_DURATION,
    DEFAULT_TIME_OFFSET,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{QUIT_MESSAGE, RoomCoordinator, Seat};
pub use error::{ErrorStatus, RoomError};
pub use ledger::{hand_entries, rank_standings};
pub use locks::RoomLocks;
pub use memory::MemoryStore;
pub use scoring::{ClassicRule, MoveScore, Outcome, ScoringRule};
pub use store::LifecycleStore;
pub use sweep::{SweepHandle, spawn_expiry_sweep};
pub use window::MoveWindow;
