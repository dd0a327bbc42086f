//! Per-room mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use handgame_protocol::RoomId;
use tokio::sync::OwnedMutexGuard;

/// One async lock per room id.
///
/// The coordinator holds a room's guard around every check-then-act on
/// that room (join, start, end, move acceptance, quit, disconnect), so those
/// sequences are linearized per room while different rooms proceed in
/// parallel. Entries are created on first use and dropped by
/// [`prune`](Self::prune) once idle.
#[derive(Debug, Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `room`.
    pub async fn acquire(&self, room: RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(room).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Forgets `room`'s lock if nobody holds or waits on it. Safe to call
    /// for any room: the next `acquire` simply starts a fresh lock.
    ///
    /// Holders and waiters keep a clone of the lock, and clones are only
    /// handed out under the map's mutex, so a count of one means the map
    /// owns the last reference. A busy lock is left in place.
    pub fn prune(&self, room: RoomId) -> bool {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        match locks.get(&room) {
            Some(lock) if Arc::strong_count(lock) == 1 => {
                locks.remove(&room);
                true
            }
            _ => false,
        }
    }

    /// Number of rooms with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
