//! Ledger of live allocations made by the core allocator.
//!
//! Every buffer, string and handle produced by this crate registers its
//! address here and deregisters it on release; so do callback contexts. A
//! release of an address the ledger does not hold is how double release is
//! detected.
//!
//! The ledger also keeps per-thread allocation and release counters. Tests
//! take a [`ThreadBalance`] snapshot before and after an operation to check
//! it is allocation-count neutral without being disturbed by other tests
//! allocating in parallel.

use std::cell::Cell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

static LIVE: Lazy<Mutex<HashMap<usize, usize>>> = Lazy::new(|| Mutex::new(HashMap::new()));

thread_local! {
    static ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
    static RELEASES: Cell<u64> = const { Cell::new(0) };
}

/// Allocation and release counts observed on one thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadBalance {
    pub allocations: u64,
    pub releases: u64,
}

impl ThreadBalance {
    /// Allocations not yet matched by a release.
    pub fn outstanding(&self) -> i64 {
        self.allocations as i64 - self.releases as i64
    }

    /// Counts accumulated between `earlier` and `self`.
    pub fn since(&self, earlier: ThreadBalance) -> ThreadBalance {
        ThreadBalance {
            allocations: self.allocations - earlier.allocations,
            releases: self.releases - earlier.releases,
        }
    }
}

/// Snapshot of the current thread's counters.
pub fn thread_balance() -> ThreadBalance {
    ThreadBalance {
        allocations: ALLOCATIONS.with(Cell::get),
        releases: RELEASES.with(Cell::get),
    }
}

/// Register a live allocation at `address`.
pub fn record_alloc(address: usize) {
    *LIVE.lock().entry(address).or_insert(0) += 1;
    ALLOCATIONS.with(|c| c.set(c.get() + 1));
}

/// Deregister `address`. Returns `false` if it was not live.
pub fn record_release(address: usize) -> bool {
    let mut live = LIVE.lock();
    match live.get_mut(&address) {
        Some(count) => {
            *count -= 1;
            if *count == 0 {
                live.remove(&address);
            }
            drop(live);
            RELEASES.with(|c| c.set(c.get() + 1));
            true
        }
        None => false,
    }
}

/// Whether `address` is currently a live allocation.
pub fn is_live(address: usize) -> bool {
    LIVE.lock().contains_key(&address)
}

/// Number of live allocations across all threads.
pub fn live_count() -> usize {
    LIVE.lock().values().sum()
}
