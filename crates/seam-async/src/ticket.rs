//! Completion tickets.
//!
//! A ticket and its [`Completer`] share one slot. The completing side writes
//! the slot and then release-stores the completion flag; the awaiting side
//! acquire-loads the flag before reading the slot, either blocking on a
//! condition variable or as a [`Future`]. Dropping the ticket abandons it:
//! the completer still writes into the shared slot and the result is
//! discarded with it.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::{Condvar, Mutex};
use seam_callback::AsyncCallback;

use crate::error::{AsyncError, Result};

struct Slot<T> {
    outcome: Option<Result<T>>,
    taken: bool,
    waker: Option<Waker>,
}

struct Shared<T> {
    complete: AtomicBool,
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn fill(&self, outcome: Result<T>) {
        let waker = {
            let mut slot = self.slot.lock();
            slot.outcome = Some(outcome);
            self.complete.store(true, Ordering::Release);
            slot.waker.take()
        };
        self.ready.notify_all();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn take(slot: &mut Slot<T>) -> Result<T> {
        match slot.outcome.take() {
            Some(outcome) => {
                slot.taken = true;
                outcome
            }
            None => Err(AsyncError::AlreadyTaken),
        }
    }
}

/// Create a connected ticket and completer.
pub fn ticket<T>() -> (AsyncTicket<T>, Completer<T>) {
    let shared = Arc::new(Shared {
        complete: AtomicBool::new(false),
        slot: Mutex::new(Slot {
            outcome: None,
            taken: false,
            waker: None,
        }),
        ready: Condvar::new(),
    });
    (
        AsyncTicket {
            shared: Arc::clone(&shared),
        },
        Completer {
            shared: Some(shared),
        },
    )
}

/// Caller-side handle to the result of one asynchronous operation.
///
/// Native failures travel inside `T` (typically a `ResultEnvelope`);
/// [`AsyncError`] only reports what happened to the ticket itself.
pub struct AsyncTicket<T> {
    shared: Arc<Shared<T>>,
}

impl<T> AsyncTicket<T> {
    /// Whether the operation has completed. Does not block.
    pub fn is_complete(&self) -> bool {
        self.shared.complete.load(Ordering::Acquire)
    }

    /// Take the result if the operation has completed.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        if !self.is_complete() {
            return None;
        }
        let mut slot = self.shared.slot.lock();
        Some(Shared::take(&mut slot))
    }

    /// Block the current thread until the operation completes.
    pub fn wait(self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        while !self.shared.complete.load(Ordering::Acquire) {
            self.shared.ready.wait(&mut slot);
        }
        Shared::take(&mut slot)
    }
}

impl<T: Clone + Send + 'static> AsyncTicket<T> {
    /// A ticket completed by signalling a C-level completion callback.
    ///
    /// The callback must be signalled exactly once; a second signal is a
    /// protocol violation.
    pub fn with_callback() -> (AsyncTicket<T>, AsyncCallback<T>) {
        let (ticket, completer) = ticket();
        let callback = AsyncCallback::new(move |value| completer.complete(value));
        (ticket, callback)
    }
}

impl<T> Future for AsyncTicket<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        if self.shared.complete.load(Ordering::Acquire) {
            return Poll::Ready(Shared::take(&mut slot));
        }
        let stale = slot
            .waker
            .as_ref()
            .map_or(true, |waker| !waker.will_wake(cx.waker()));
        if stale {
            slot.waker = Some(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T> Drop for AsyncTicket<T> {
    fn drop(&mut self) {
        if !self.shared.slot.lock().taken {
            tracing::trace!("ticket dropped before its result was taken");
        }
    }
}

impl<T> std::fmt::Debug for AsyncTicket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncTicket")
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// Native-side half of a ticket.
///
/// [`complete`](Completer::complete) consumes the completer, so a ticket is
/// completed at most once. Dropping it uncompleted resolves the ticket to
/// [`AsyncError::Abandoned`].
pub struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    pub fn complete(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            shared.fill(Ok(value));
        }
    }

    /// Whether the awaiting side has dropped its ticket.
    pub fn is_abandoned(&self) -> bool {
        self.shared
            .as_ref()
            .map_or(true, |shared| Arc::strong_count(shared) == 1)
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            tracing::debug!("completer dropped without a value; ticket abandoned");
            shared.fill(Err(AsyncError::Abandoned));
        }
    }
}
