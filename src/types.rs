//! Basic type definitions for the chat relay
//!
//! Provides the `SessionId` newtype and the process-wide allocator
//! that hands out unique, monotonically increasing session IDs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique session identifier (newtype pattern)
///
/// Assigned once per accepted connection and never reused during
/// the lifetime of the process. Implements Hash and Eq for use as
/// HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Allocate the next ID from the process-wide allocator
    pub fn next() -> Self {
        GLOBAL_IDS.allocate()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

static GLOBAL_IDS: IdAllocator = IdAllocator::new();

/// Monotonic ID counter
///
/// The first ID handed out is 1. Uniqueness holds across threads;
/// wraparound is not handled.
#[derive(Debug)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first ID is 1
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Hand out the next ID
    pub fn allocate(&self) -> SessionId {
        SessionId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
