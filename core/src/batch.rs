//! Bounded FIFO of completed sessions awaiting upload
//!
//! Appends past capacity are rejected (the newest session is dropped and
//! counted). Sessions leave the buffer only when the collector has
//! confirmed delivery of a snapshot containing them.

use heapless::Vec;

use crate::session::CompletedSession;

/// Default capacity of the pending batch
pub const MAX_PENDING_SESSIONS: usize = 20;

/// Owned copy of the pending sessions taken for one delivery attempt
pub type Snapshot<const K: usize> = Vec<CompletedSession, K>;

/// Fixed-capacity pending session buffer
#[derive(Debug, Clone, Default)]
pub struct PendingBatch<const K: usize = MAX_PENDING_SESSIONS> {
    sessions: Vec<CompletedSession, K>,
    dropped: u32,
}

impl<const K: usize> PendingBatch<K> {
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
            dropped: 0,
        }
    }

    /// Queue a completed session
    ///
    /// Returns `false` and counts the session as lost if the buffer is full.
    pub fn append(&mut self, session: CompletedSession) -> bool {
        match self.sessions.push(session) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.saturating_add(1);
                false
            }
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether there is anything to upload
    pub fn has_pending(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.is_full()
    }

    pub const fn capacity(&self) -> usize {
        K
    }

    /// Sessions rejected because the buffer was full, since boot
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Pending sessions, oldest first
    pub fn snapshot(&self) -> &[CompletedSession] {
        &self.sessions
    }

    /// Copy of the pending sessions for a delivery that outlives the borrow
    pub fn take_snapshot(&self) -> Snapshot<K> {
        self.sessions.clone()
    }

    /// Discard every pending session
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Remove a delivered snapshot of `delivered` sessions
    ///
    /// Appends only ever go to the back, so the delivered snapshot is the
    /// oldest `delivered` entries. Anything appended after the snapshot was
    /// taken stays queued.
    pub fn acknowledge(&mut self, delivered: usize) {
        if delivered >= self.sessions.len() {
            self.clear();
            return;
        }
        self.sessions.rotate_left(delivered);
        let remaining = self.sessions.len() - delivered;
        self.sessions.truncate(remaining);
    }
}

/// Access to a pending batch that may be shared with the capture side
///
/// The closure runs with exclusive access and must not block; on the board
/// it runs inside an RTIC resource lock.
pub trait BatchStore<const K: usize> {
    fn with_batch<R>(&mut self, f: impl FnOnce(&mut PendingBatch<K>) -> R) -> R;
}

impl<const K: usize> BatchStore<K> for PendingBatch<K> {
    fn with_batch<R>(&mut self, f: impl FnOnce(&mut PendingBatch<K>) -> R) -> R {
        f(self)
    }
}
