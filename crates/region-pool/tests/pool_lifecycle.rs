//! Whole-lifecycle scenarios for the pool: growth, large-allocation reuse,
//! cleanup ordering, reset, and the built-in file cleanup handlers.

use std::os::fd::AsRawFd;

use region_pool::{FreeOutcome, Pool};

#[test]
fn small_allocations_never_touch_the_large_list() {
    let pool = Pool::create(4096).unwrap();
    for _ in 0..200 {
        pool.alloc(32).unwrap();
    }
    // Nothing here crosses the small-allocation threshold, so `free` should
    // decline every pointer handed back to it.
    let p = pool.alloc(32).unwrap();
    assert_eq!(pool.free(p), FreeOutcome::Declined);
}

#[test]
fn growth_preserves_earlier_allocations() {
    let pool = Pool::create(128).unwrap();
    let mut pointers = Vec::new();
    for i in 0..256u8 {
        let ptr = pool.alloc_unaligned(1).unwrap();
        unsafe { ptr.write(i) };
        pointers.push(ptr);
    }
    for (i, ptr) in pointers.iter().enumerate() {
        assert_eq!(unsafe { ptr.read() }, i as u8);
    }
}

#[test]
fn large_allocation_tombstone_reuse_is_bounded_to_four_entries() {
    let pool = Pool::create(64).unwrap();
    let mut live = Vec::new();
    for _ in 0..6 {
        live.push(pool.alloc(128).unwrap());
    }
    // Free the fifth (index 4), which sits outside the 4-entry scan window;
    // a subsequent large alloc must not reuse it.
    let freed = live[4];
    assert_eq!(pool.free(freed), FreeOutcome::Freed);
    let reused = pool.alloc(128).unwrap();
    assert_ne!(reused, freed);
}

#[test]
fn destroy_runs_every_cleanup_exactly_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    fn bump(_: *mut u8) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let pool = Pool::create(4096).unwrap();
    for _ in 0..5 {
        let h = pool.register_cleanup(0).unwrap();
        pool.set_cleanup_handler(h, bump);
    }
    pool.destroy();
    assert_eq!(CALLS.load(Ordering::SeqCst), 5);
}

#[test]
fn reset_keeps_chunks_but_clears_large_allocations_and_chain_slot() {
    let pool = Pool::create(4096).unwrap();
    pool.alloc(8192).unwrap();
    let mut marker = 0u8;
    pool.set_chain_slot(std::ptr::NonNull::new(&raw mut marker));
    pool.reset();
    assert!(pool.chain_slot().is_none());
    // A fresh small allocation after reset must land at the start of the
    // (retained) first chunk.
    let ptr = pool.alloc(16).unwrap();
    assert!(!ptr.is_null());
}

#[test]
fn file_cleanup_closes_and_deletes_on_destroy() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("region-pool-test-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").unwrap();
    let file = std::fs::File::open(&path).unwrap();
    let fd = file.as_raw_fd();
    std::mem::forget(file); // ownership of the fd transfers to the cleanup

    let pool = Pool::create(4096).unwrap();
    pool.register_file_cleanup(fd, Some(path.clone()));
    pool.destroy();

    assert!(!path.exists());
}

#[test]
fn run_cleanup_for_fd_is_idempotent() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("region-pool-test-idempotent-{}.tmp", std::process::id()));
    std::fs::write(&path, b"x").unwrap();
    let file = std::fs::File::open(&path).unwrap();
    let fd = file.as_raw_fd();
    std::mem::forget(file);

    let pool = Pool::create(4096).unwrap();
    pool.register_file_cleanup(fd, Some(path.clone()));
    pool.run_cleanup_for_fd(fd);
    assert!(!path.exists());
    // Second call must not attempt to close an already-closed descriptor.
    pool.run_cleanup_for_fd(fd);
    pool.destroy();
}
