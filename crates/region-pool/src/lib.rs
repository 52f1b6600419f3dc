//! A region-based memory pool with scoped cleanup handlers, and a bitwise
//! radix tree for longest-prefix-match lookups built entirely on top of it.
//!
//! # Design Goals
//!
//! 1. **Bounded, predictable allocation cost**: small requests bump-allocate
//!    out of a chunk chain; only requests at or above a threshold (or with
//!    an explicit alignment) touch the page allocator directly.
//! 2. **Scoped teardown**: a pool's cleanup stack and chunk chain are torn
//!    down together, in one place, in a fixed order; callers never have to
//!    remember to free anything they allocated from it.
//! 3. **No surprise thread-safety**: a pool (and anything built on it) is a
//!    single-owner, single-threaded object; that constraint is encoded in
//!    the type rather than left to documentation.
//! 4. **Reuse over release**: both the large-allocation side list and the
//!    radix tree's node slabs favor reusing a freed slot over giving memory
//!    back to the allocator, since churn in this domain (request-scoped
//!    buffers, routing-table updates) is usually steady-state.
//!
//! # Example
//!
//! ```
//! use region_pool::pool::Pool;
//! use region_pool::radix::{Ipv4RadixTree, Preallocate, NO_VALUE};
//!
//! let pool = Pool::create(16 * 1024).unwrap();
//! let mut routes: Ipv4RadixTree = Ipv4RadixTree::create(&pool, Preallocate::Default).unwrap();
//!
//! routes.insert(0xC0A8_0000, 0xFFFF_0000, 1).unwrap(); // 192.168.0.0/16
//! assert_eq!(routes.find(0xC0A8_0101), 1);
//! assert_eq!(routes.find(0x0A00_0001), NO_VALUE);
//!
//! pool.destroy();
//! ```

pub mod error;
pub mod pool;
pub mod radix;
mod raw_alloc;

pub use error::{DeleteError, FreeOutcome, InsertError, PoolError};
pub use pool::{CleanupHandle, CleanupHandler, Pool, MAX_ALLOC_FROM_POOL, PAGE_SIZE, POOL_ALIGNMENT};
pub use radix::{Ipv4RadixTree, Ipv6RadixTree, Preallocate, RadixKey, RadixTree, NO_VALUE};
