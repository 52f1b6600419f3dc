//! Error and outcome types for the pool and radix tree.
//!
//! These are hand-rolled rather than derived through a macro crate: the
//! outcome set is small, closed, and known up front, so a manual `Display`
//! costs little and keeps the crate's dependency list short.

use std::fmt;

/// Failure modes for pool allocation.
///
/// This is the only error the pool itself can produce; every allocation
/// path (small, unaligned, zeroed, aligned, large) either succeeds or runs
/// out of memory. There is no partial success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The underlying page allocator returned null, or a requested size
    /// would overflow a `usize` computation before ever reaching the
    /// allocator.
    OutOfMemory,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::OutOfMemory => f.write_str("pool allocation failed: out of memory"),
        }
    }
}

impl std::error::Error for PoolError {}

impl From<PoolError> for InsertError {
    fn from(_: PoolError) -> Self {
        InsertError::OutOfMemory
    }
}

/// Outcome of [`crate::pool::Pool::free`].
///
/// Both variants are expected, non-exceptional results; this is a plain
/// enum rather than a `Result`, since declining to free a pointer the pool
/// doesn't track as a large allocation is not a failure of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// `ptr` matched a live large-allocation entry; the entry is now a
    /// tombstone available for reuse.
    Freed,
    /// `ptr` did not match any of the large-allocation entries the pool
    /// walks (it may be a small allocation, already freed, or foreign).
    Declined,
}

/// Failure modes for [`crate::radix::RadixTree::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The exact `(key, mask)` node already carries a value.
    Busy,
    /// Node-slab allocation failed.
    OutOfMemory,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::Busy => f.write_str("radix insert: node already has a value"),
            InsertError::OutOfMemory => f.write_str("radix insert: node allocation failed"),
        }
    }
}

impl std::error::Error for InsertError {}

/// Failure modes for [`crate::radix::RadixTree::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteError {
    /// No node exactly matching `(key, mask)` carries a value.
    NotFound,
}

impl fmt::Display for DeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteError::NotFound => f.write_str("radix delete: no matching node"),
        }
    }
}

impl std::error::Error for DeleteError {}
