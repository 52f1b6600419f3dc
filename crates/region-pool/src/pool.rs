//! The region pool: a chunked bump-pointer allocator with a large-allocation
//! side list and a LIFO stack of scoped cleanup handlers.
//!
//! # Design
//!
//! A pool's handle and its first chunk are two separate Rust values rather
//! than one struct occupying the front of the first chunk's raw bytes (see
//! `SPEC_FULL.md` §3 and `DESIGN.md` for why the original's embedding trick
//! buys nothing once the handle is an ordinary owned value). [`Pool`] is a
//! cheap `Rc<RefCell<_>>` handle so it can be shared with a [`crate::radix::RadixTree`]
//! built on top of it without lifetime gymnastics; every chunk owns its own
//! raw byte buffer, tracked by a `Vec<Chunk>` with index-based links so that
//! growing the chain never invalidates a pointer handed out earlier; those
//! pointers address the chunk's data buffer, never the `Chunk` record.

use std::alloc::Layout;
use std::cell::RefCell;
use std::fs;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::error::{FreeOutcome, PoolError};
use crate::raw_alloc;

/// Typical page size; used to size default chunks and cap what counts as a
/// "small" (bump-allocated) request.
pub const PAGE_SIZE: usize = 4096;

/// Alignment used for chunk buffers and for bump-allocated small requests
/// that don't ask for a specific alignment.
pub const POOL_ALIGNMENT: usize = 16;

/// Requests at or above this size never come out of a chunk; they go
/// straight to the large-allocation side list.
pub const MAX_ALLOC_FROM_POOL: usize = PAGE_SIZE - 1;

/// A chunk's `failed` counter must exceed this many missed grow attempts
/// before the pool stops trying to bump-allocate from it.
const FAILED_THRESHOLD: u32 = 4;

/// Only the first few large-allocation entries are scanned for a reusable
/// tombstone; older entries are left alone rather than walked indefinitely.
const LARGE_SCAN_LIMIT: usize = 4;

/// A handler registered through [`Pool::register_cleanup`].
pub type CleanupHandler = fn(*mut u8);

/// An opaque reference to a cleanup entry, returned by [`Pool::register_cleanup`]
/// and [`Pool::register_file_cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupHandle(usize);

struct Chunk {
    start: NonNull<u8>,
    last: *mut u8,
    end: *const u8,
    layout: Layout,
    next: Option<usize>,
    failed: u32,
}

impl Chunk {
    fn new(size: usize) -> Result<Self, PoolError> {
        let start = raw_alloc::alloc(size, POOL_ALIGNMENT)?;
        let layout = Layout::from_size_align(size, POOL_ALIGNMENT).map_err(|_| PoolError::OutOfMemory)?;
        Ok(Self {
            start,
            last: start.as_ptr(),
            // SAFETY: `start` + `size` stays within the allocation just made.
            end: unsafe { start.as_ptr().add(size) },
            layout,
            next: None,
            failed: 0,
        })
    }

    /// Tries to carve `size` bytes aligned to `align` off the bump cursor.
    fn bump(&mut self, size: usize, align: usize) -> Option<*mut u8> {
        let last = self.last as usize;
        let aligned = (last.checked_add(align - 1)?) & !(align - 1);
        let new_last = aligned.checked_add(size)?;
        if new_last > self.end as usize {
            return None;
        }
        self.last = new_last as *mut u8;
        Some(aligned as *mut u8)
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: `start`/`layout` describe exactly the allocation made in `new`.
        unsafe { raw_alloc::dealloc(self.start, self.layout.size(), self.layout.align()) };
    }
}

struct LargeEntry {
    ptr: Option<NonNull<u8>>,
    layout: Layout,
}

enum CleanupEntry {
    Generic {
        handler: Option<CleanupHandler>,
        data: Option<NonNull<u8>>,
        layout: Option<Layout>,
    },
    File {
        fd: RawFd,
        delete_path: Option<PathBuf>,
        fired: bool,
    },
}

pub(crate) struct PoolInner {
    chunks: Vec<Chunk>,
    current: usize,
    max: usize,
    first_chunk_size: usize,
    large: Vec<LargeEntry>,
    cleanup: Vec<CleanupEntry>,
    chain_slot: Option<NonNull<u8>>,
}

impl PoolInner {
    fn small_alloc(&mut self, size: usize, align: usize) -> Result<*mut u8, PoolError> {
        let mut idx = Some(self.current);
        while let Some(i) = idx {
            if let Some(ptr) = self.chunks[i].bump(size, align) {
                return Ok(ptr);
            }
            idx = self.chunks[i].next;
        }
        self.grow(size, align)
    }

    fn grow(&mut self, size: usize, align: usize) -> Result<*mut u8, PoolError> {
        let mut fresh = Chunk::new(self.first_chunk_size)?;
        let ptr = fresh
            .bump(size, align)
            .expect("a freshly grown chunk must fit an allocation within the pool's max");

        let mut current = self.current;
        let mut p = current;
        while let Some(next) = self.chunks[p].next {
            self.chunks[p].failed += 1;
            if self.chunks[p].failed > FAILED_THRESHOLD {
                current = next;
            }
            p = next;
        }

        let new_index = self.chunks.len();
        self.chunks[p].next = Some(new_index);
        self.chunks.push(fresh);
        self.current = current;
        region_log::debug!(
            "pool grew to {} chunk(s), current index now {}",
            self.chunks.len(),
            self.current
        );
        Ok(ptr)
    }

    fn large_alloc(&mut self, size: usize, align: usize) -> Result<*mut u8, PoolError> {
        let ptr = raw_alloc::alloc(size, align)?;
        let layout = Layout::from_size_align(size, align).map_err(|_| PoolError::OutOfMemory)?;
        for entry in self.large.iter_mut().take(LARGE_SCAN_LIMIT) {
            if entry.ptr.is_none() {
                entry.ptr = Some(ptr);
                entry.layout = layout;
                region_log::trace!("large allocation reused a tombstone slot");
                return Ok(ptr.as_ptr());
            }
        }
        self.large.push(LargeEntry { ptr: Some(ptr), layout });
        Ok(ptr.as_ptr())
    }

    /// Always allocates fresh and always tracks; never scans for a
    /// reusable tombstone. Used both by [`Pool::alloc_aligned`] directly
    /// and as the radix tree's node-slab source.
    fn large_alloc_aligned(&mut self, size: usize, align: usize) -> Result<*mut u8, PoolError> {
        let ptr = raw_alloc::alloc(size, align)?;
        let layout = Layout::from_size_align(size, align).map_err(|_| PoolError::OutOfMemory)?;
        self.large.push(LargeEntry { ptr: Some(ptr), layout });
        Ok(ptr.as_ptr())
    }

    fn alloc(&mut self, size: usize, align: usize) -> Result<*mut u8, PoolError> {
        if size > self.max {
            return self.large_alloc(size, align.max(POOL_ALIGNMENT));
        }
        self.small_alloc(size, align)
    }

    fn free(&mut self, ptr: *mut u8) -> FreeOutcome {
        for entry in &mut self.large {
            if entry.ptr.map(NonNull::as_ptr) == Some(ptr) {
                let p = entry.ptr.take().unwrap();
                // SAFETY: `p`/`entry.layout` describe exactly the allocation tracked here.
                unsafe { raw_alloc::dealloc(p, entry.layout.size(), entry.layout.align()) };
                return FreeOutcome::Freed;
            }
        }
        FreeOutcome::Declined
    }

    fn reset(&mut self) {
        for entry in &mut self.large {
            if let Some(p) = entry.ptr.take() {
                // SAFETY: `p`/`entry.layout` describe exactly the allocation tracked here.
                unsafe { raw_alloc::dealloc(p, entry.layout.size(), entry.layout.align()) };
            }
        }
        self.large.clear();
        for chunk in &mut self.chunks {
            chunk.last = chunk.start.as_ptr();
            chunk.failed = 0;
        }
        self.current = 0;
        self.chain_slot = None;
        region_log::debug!("pool reset: {} chunk(s) retained", self.chunks.len());
    }

    fn register_cleanup(&mut self, bytes: usize) -> Result<CleanupHandle, PoolError> {
        let (data, layout) = if bytes == 0 {
            (None, None)
        } else {
            let layout = Layout::from_size_align(bytes, POOL_ALIGNMENT).map_err(|_| PoolError::OutOfMemory)?;
            let ptr = raw_alloc::alloc(bytes, POOL_ALIGNMENT)?;
            (Some(ptr), Some(layout))
        };
        let handle = CleanupHandle(self.cleanup.len());
        self.cleanup.push(CleanupEntry::Generic {
            handler: None,
            data,
            layout,
        });
        Ok(handle)
    }

    fn set_cleanup_handler(&mut self, handle: CleanupHandle, handler: CleanupHandler) {
        if let CleanupEntry::Generic { handler: slot, .. } = &mut self.cleanup[handle.0] {
            *slot = Some(handler);
        }
    }

    fn cleanup_data_ptr(&self, handle: CleanupHandle) -> Option<*mut u8> {
        match &self.cleanup[handle.0] {
            CleanupEntry::Generic { data, .. } => data.map(NonNull::as_ptr),
            CleanupEntry::File { .. } => None,
        }
    }

    fn register_file_cleanup(&mut self, fd: RawFd, delete_path: Option<PathBuf>) -> CleanupHandle {
        let handle = CleanupHandle(self.cleanup.len());
        self.cleanup.push(CleanupEntry::File {
            fd,
            delete_path,
            fired: false,
        });
        handle
    }

    fn run_cleanup_for_fd(&mut self, fd: RawFd) {
        for entry in &mut self.cleanup {
            if let CleanupEntry::File {
                fd: entry_fd,
                delete_path,
                fired,
            } = entry
            {
                if *entry_fd == fd && !*fired {
                    run_file_cleanup(*entry_fd, delete_path.as_deref());
                    *fired = true;
                    return;
                }
            }
        }
    }

    fn run_all_cleanups(&mut self) {
        for entry in self.cleanup.drain(..).rev() {
            match entry {
                CleanupEntry::Generic { handler, data, layout } => {
                    if let Some(handler) = handler {
                        handler(data.map(NonNull::as_ptr).unwrap_or(std::ptr::null_mut()));
                    }
                    if let (Some(p), Some(layout)) = (data, layout) {
                        // SAFETY: `p`/`layout` describe exactly the allocation made in `register_cleanup`.
                        unsafe { raw_alloc::dealloc(p, layout.size(), layout.align()) };
                    }
                }
                CleanupEntry::File { fd, delete_path, fired } => {
                    if !fired {
                        run_file_cleanup(fd, delete_path.as_deref());
                    }
                }
            }
        }
    }
}

fn run_file_cleanup(fd: RawFd, delete_path: Option<&std::path::Path>) {
    if let Some(path) = delete_path {
        if let Err(err) = fs::remove_file(path) {
            region_log::warn!("cleanup: failed to remove {}: {err}", path.display());
        }
    }
    // SAFETY: `fd` is owned by this cleanup entry and has not been closed yet
    // (guarded by the `fired` flag at every call site).
    drop(unsafe { OwnedFd::from_raw_fd(fd) });
    region_log::debug!("cleanup: closed fd {fd}");
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.run_all_cleanups();
        for entry in &mut self.large {
            if let Some(p) = entry.ptr.take() {
                // SAFETY: `p`/`entry.layout` describe exactly the allocation tracked here.
                unsafe { raw_alloc::dealloc(p, entry.layout.size(), entry.layout.align()) };
            }
        }
        // Chunks free themselves through `Chunk`'s own `Drop` impl.
    }
}

/// A region-based memory pool.
///
/// Cheap to clone: clones share the same underlying chunk chain, large
/// list, and cleanup stack, which is how a [`crate::radix::RadixTree`] built
/// from a pool keeps drawing node storage from it without borrowing it for
/// its whole lifetime.
#[derive(Clone)]
pub struct Pool(Rc<RefCell<PoolInner>>);

impl Pool {
    /// Creates a pool whose chunks (the first and every one grown after it)
    /// are `chunk_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`] if the first chunk cannot be
    /// allocated.
    pub fn create(chunk_size: usize) -> Result<Self, PoolError> {
        let first = Chunk::new(chunk_size)?;
        let max = chunk_size.min(MAX_ALLOC_FROM_POOL);
        region_log::info!("pool created: chunk_size={chunk_size} max={max}");
        Ok(Self(Rc::new(RefCell::new(PoolInner {
            chunks: vec![first],
            current: 0,
            max,
            first_chunk_size: chunk_size,
            large: Vec::new(),
            cleanup: Vec::new(),
            chain_slot: None,
        }))))
    }

    /// Consumes the handle. Once every clone of this pool (including any
    /// [`crate::radix::RadixTree`] built from it) has been dropped, every
    /// chunk, every live large allocation, and every registered cleanup is
    /// torn down; cleanups run last-registered-first.
    pub fn destroy(self) {
        drop(self);
    }

    /// Frees every tracked large allocation and rewinds every chunk's bump
    /// cursor to its start. Registered cleanups are **not** run; they
    /// survive to fire on [`Pool::destroy`].
    pub fn reset(&self) {
        self.0.borrow_mut().reset();
    }

    /// Allocates `bytes` aligned to [`POOL_ALIGNMENT`]. Requests at or
    /// above the pool's small-allocation threshold go to the large list.
    pub fn alloc(&self, bytes: usize) -> Result<*mut u8, PoolError> {
        self.0.borrow_mut().alloc(bytes, POOL_ALIGNMENT)
    }

    /// Allocates `bytes` with no alignment guarantee beyond 1 byte.
    pub fn alloc_unaligned(&self, bytes: usize) -> Result<*mut u8, PoolError> {
        self.0.borrow_mut().alloc(bytes, 1)
    }

    /// Allocates `bytes` aligned to [`POOL_ALIGNMENT`], zero-filled.
    pub fn alloc_zeroed(&self, bytes: usize) -> Result<*mut u8, PoolError> {
        let ptr = self.alloc(bytes)?;
        // SAFETY: `ptr` was just allocated with room for `bytes`.
        unsafe { ptr.write_bytes(0, bytes) };
        Ok(ptr)
    }

    /// Allocates `bytes` aligned to exactly `align`. Always goes to the
    /// large-allocation side list and is always tracked there, but never
    /// reuses a tombstone slot, matching the original's unconditional
    /// "aligned allocations bypass the chunk chain" behavior.
    pub fn alloc_aligned(&self, bytes: usize, align: usize) -> Result<*mut u8, PoolError> {
        self.0.borrow_mut().large_alloc_aligned(bytes, align.max(POOL_ALIGNMENT))
    }

    /// Frees a pointer previously returned by an allocation that landed on
    /// the large list (any call whose size was at or above the pool's
    /// threshold, or any aligned allocation). Returns
    /// [`FreeOutcome::Declined`] for anything else, most notably ordinary
    /// small bump allocations, which are never tracked individually.
    pub fn free(&self, ptr: *mut u8) -> FreeOutcome {
        self.0.borrow_mut().free(ptr)
    }

    /// Registers a cleanup slot with `bytes` of pool-owned scratch space
    /// (zero for a cleanup with no associated data). The handler is
    /// invoked at [`Pool::destroy`] time, in last-registered-first order.
    pub fn register_cleanup(&self, bytes: usize) -> Result<CleanupHandle, PoolError> {
        self.0.borrow_mut().register_cleanup(bytes)
    }

    /// Sets (or replaces) the handler that fires for `handle` at destroy
    /// time.
    pub fn set_cleanup_handler(&self, handle: CleanupHandle, handler: CleanupHandler) {
        self.0.borrow_mut().set_cleanup_handler(handle, handler);
    }

    /// Returns the scratch pointer associated with `handle`, if any.
    pub fn cleanup_data_ptr(&self, handle: CleanupHandle) -> Option<*mut u8> {
        self.0.borrow().cleanup_data_ptr(handle)
    }

    /// Registers a built-in cleanup that closes `fd` at destroy time, and
    /// additionally removes `delete_path` first if given. Also reachable
    /// early via [`Pool::run_cleanup_for_fd`].
    pub fn register_file_cleanup(&self, fd: RawFd, delete_path: Option<PathBuf>) -> CleanupHandle {
        self.0.borrow_mut().register_file_cleanup(fd, delete_path)
    }

    /// Finds the file cleanup registered for `fd` and runs it immediately
    /// (closing the descriptor, removing its path if one was given).
    /// A no-op if no such cleanup exists or it already fired.
    pub fn run_cleanup_for_fd(&self, fd: RawFd) {
        self.0.borrow_mut().run_cleanup_for_fd(fd);
    }

    /// Reads the pool's opaque auxiliary slot. Not interpreted by the pool
    /// itself; cleared on [`Pool::reset`], untouched otherwise.
    pub fn chain_slot(&self) -> Option<NonNull<u8>> {
        self.0.borrow().chain_slot
    }

    /// Sets the pool's opaque auxiliary slot.
    pub fn set_chain_slot(&self, slot: Option<NonNull<u8>>) {
        self.0.borrow_mut().chain_slot = slot;
    }

    pub(crate) fn handle(&self) -> Rc<RefCell<PoolInner>> {
        Rc::clone(&self.0)
    }
}
