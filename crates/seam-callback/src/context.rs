//! Per-registration state behind a callback token's context pointer.
//!
//! Invocation and release meet on one atomic word: the in-flight count with
//! a retired bit on top. A release only succeeds while nothing is in flight,
//! and an invocation refuses to start once the bit is set. A token used after
//! its context was freed is caught by the ledger before the context is
//! dereferenced. That check is best-effort: it cannot tell a freed context
//! from a newer ledger allocation at the same address.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use seam_core::config::UncheckedFailurePolicy;
use seam_core::guard;
use seam_core::ledger;
use seam_core::protocol::{self, ProtocolViolation};

use crate::returns::CallbackReturn;

/// Where a registration is in its invocation cycle.
///
/// `Idle -> Invoking -> {Returned | Faulted} -> Idle`. `Returned` and
/// `Faulted` describe how the most recent invocation ended; the
/// registration is idle again whenever nothing is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Idle,
    Invoking,
    Returned,
    Faulted,
}

// 0 means no invocation has finished yet.
const LAST_RETURNED: u8 = 1;
const LAST_FAULTED: u8 = 2;

const RETIRED: usize = 1 << (usize::BITS - 1);

/// Invocation counters shared between a context and its registration.
#[derive(Debug, Default)]
pub struct Tracker {
    // In-flight count, plus RETIRED once the context is released.
    state: AtomicUsize,
    invocations: AtomicU64,
    faults: AtomicU64,
    last: AtomicU8,
}

/// Snapshot of a registration's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackStats {
    pub invocations: u64,
    pub faults: u64,
    pub in_flight: usize,
    pub state: CallbackState,
}

impl Tracker {
    /// Count an invocation in. `false` once the context is retired.
    fn enter(&self) -> bool {
        let entered = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state & RETIRED == 0).then_some(state + 1)
            })
            .is_ok();
        if entered {
            self.invocations.fetch_add(1, Ordering::Relaxed);
        }
        entered
    }

    fn exit(&self, faulted: bool) {
        if faulted {
            self.faults.fetch_add(1, Ordering::Relaxed);
        }
        self.last.store(
            if faulted { LAST_FAULTED } else { LAST_RETURNED },
            Ordering::Relaxed,
        );
        self.state.fetch_sub(1, Ordering::AcqRel);
    }

    /// Mark the context released. Fails with the in-flight count while
    /// invocations are running.
    fn retire(&self) -> Result<(), usize> {
        self.state
            .compare_exchange(0, RETIRED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|state| state & !RETIRED)
    }

    pub fn in_flight(&self) -> usize {
        self.state.load(Ordering::Acquire) & !RETIRED
    }

    pub fn is_retired(&self) -> bool {
        self.state.load(Ordering::Acquire) & RETIRED != 0
    }

    pub fn stats(&self) -> CallbackStats {
        let in_flight = self.in_flight();
        let state = if in_flight > 0 {
            CallbackState::Invoking
        } else {
            match self.last.load(Ordering::Relaxed) {
                LAST_RETURNED => CallbackState::Returned,
                LAST_FAULTED => CallbackState::Faulted,
                _ => CallbackState::Idle,
            }
        };
        CallbackStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            in_flight,
            state,
        }
    }
}

/// A registered closure and its bookkeeping, boxed behind the token's
/// context pointer.
#[doc(hidden)]
pub struct Context<F> {
    closure: F,
    policy: UncheckedFailurePolicy,
    tracker: Arc<Tracker>,
}

impl<F> Context<F> {
    /// Box a context and register its address with the ledger.
    pub fn into_raw(closure: F, policy: UncheckedFailurePolicy) -> (*const c_void, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let context = Box::new(Context {
            closure,
            policy,
            tracker: Arc::clone(&tracker),
        });
        let ptr = Box::into_raw(context) as *const c_void;
        ledger::record_alloc(ptr as usize);
        (ptr, tracker)
    }

    /// Resolve a context pointer. A pointer the ledger no longer holds is
    /// [`ProtocolViolation::UseAfterRelease`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Context::into_raw`] with the same `F`.
    pub unsafe fn from_raw<'a>(ptr: *const c_void) -> &'a Self {
        if !ledger::is_live(ptr as usize) {
            protocol::fatal(ProtocolViolation::UseAfterRelease {
                resource: "callback context",
                address: ptr as usize,
            });
        }
        &*(ptr as *const Self)
    }

    pub fn closure(&self) -> &F {
        &self.closure
    }

    /// Run one invocation behind the boundary guard.
    pub fn invoke<R: CallbackReturn>(&self, site: &'static str, f: impl FnOnce() -> R) -> R {
        if !self.tracker.enter() {
            protocol::fatal(ProtocolViolation::UseAfterRelease {
                resource: "callback context",
                address: self as *const Self as usize,
            });
        }
        let outcome = guard::catch(site, f);
        self.tracker.exit(outcome.is_err());
        match outcome {
            Ok(value) => value,
            Err(fault) => R::on_fault(&fault, self.policy),
        }
    }

    /// Free a context.
    ///
    /// Releasing twice, or while an invocation is in flight, is a protocol
    /// violation; in harness mode the release is skipped.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Context::into_raw`] with the same `F`.
    pub unsafe fn release(ptr: *const c_void) {
        let address = ptr as usize;
        if !ledger::is_live(address) {
            protocol::report(ProtocolViolation::DoubleRelease {
                resource: "callback context",
                address,
            });
            return;
        }
        if let Err(in_flight) = Self::from_raw(ptr).tracker.retire() {
            protocol::report(ProtocolViolation::ReleasedWhileInvoking { address, in_flight });
            return;
        }
        if ledger::record_release(address) {
            drop(Box::from_raw(ptr as *mut Self));
        }
    }
}
