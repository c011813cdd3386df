//! Round-robin arbitration of send opportunities.

use crate::types::{MessageClass, NUM_CLASSES};

/// Tracks which message classes are waiting to send and grants opportunities
/// in round-robin order.
///
/// Selection is bounded: each grant probes at most [`NUM_CLASSES`] slots, and
/// with every class pending each is granted exactly once per rotation.
#[derive(Debug)]
pub struct SendScheduler {
    pending: [bool; NUM_CLASSES],
    last_granted: usize,
}

impl SendScheduler {
    /// Create a scheduler with no pending requests.
    pub fn new() -> Self {
        Self {
            pending: [false; NUM_CLASSES],
            last_granted: NUM_CLASSES - 1,
        }
    }

    /// Mark a class as waiting to send. Idempotent.
    pub fn request(&mut self, class: MessageClass) {
        self.pending[class.index()] = true;
    }

    /// Check if a class is waiting to send.
    pub fn is_pending(&self, class: MessageClass) -> bool {
        self.pending[class.index()]
    }

    /// Pick the next pending class, starting after the last granted one.
    ///
    /// Clears the winner's pending flag. Returns `None` when nothing is
    /// pending.
    pub fn next_grant(&mut self) -> Option<MessageClass> {
        let mut slot = self.last_granted;
        for _ in 0..NUM_CLASSES {
            slot = (slot + 1) % NUM_CLASSES;
            if self.pending[slot] {
                self.pending[slot] = false;
                self.last_granted = slot;
                return MessageClass::from_index(slot);
            }
        }
        None
    }

    /// Drop all pending requests.
    pub fn clear(&mut self) {
        self.pending = [false; NUM_CLASSES];
    }
}

impl Default for SendScheduler {
    fn default() -> Self {
        Self::new()
    }
}
