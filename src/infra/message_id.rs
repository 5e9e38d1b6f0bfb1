use crate::domain::message::MessageId;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Hands out message ids for one connection, starting at 1.
///
/// After `i32::MAX` it wraps around to 1; the dispatcher skips ids that are still in flight.
#[derive(Debug)]
pub struct MessageIdAllocator {
    next: AtomicI32,
    closing: AtomicBool,
}

impl Default for MessageIdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl MessageIdAllocator {
    fn starting_at(first: i32) -> Self {
        Self {
            next: AtomicI32::new(first),
            closing: AtomicBool::new(false),
        }
    }

    /// Returns `None` once the connection started closing.
    pub fn next(&self) -> Option<MessageId> {
        if self.is_closing() {
            return None;
        }
        let id = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| {
                Some(if id == i32::MAX { 1 } else { id + 1 })
            })
            .unwrap_or_else(|id| id);
        Some(MessageId::from(id))
    }

    pub fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}
