//! One-shot completion callbacks for asynchronous exports.

use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr;

use seam_core::guard;
use seam_core::ledger;
use seam_core::protocol::{self, ProtocolViolation};

/// A completion token `{fn, context}` signalled exactly once with a `*const T`.
///
/// The native side borrows the value for the duration of the call; a Rust
/// closure registered through [`AsyncCallback::new`] receives a clone.
/// Signalling the same token twice is a protocol violation.
#[repr(C)]
pub struct AsyncCallback<T> {
    callback: Option<unsafe extern "C" fn(*const T, *const c_void)>,
    context: *const c_void,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for AsyncCallback<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AsyncCallback<T> {}

unsafe impl<T> Send for AsyncCallback<T> {}
unsafe impl<T> Sync for AsyncCallback<T> {}

impl<T: Clone + 'static> AsyncCallback<T> {
    /// Wrap a closure. Its context is freed by the one signal.
    pub fn new<F>(closure: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        unsafe extern "C" fn trampoline<T: Clone, F: FnOnce(T)>(
            value: *const T,
            context: *const c_void,
        ) {
            let address = context as usize;
            if !ledger::record_release(address) {
                protocol::report(ProtocolViolation::TicketSignaledTwice { address });
                return;
            }
            let closure = Box::from_raw(context as *mut F);
            let value = (*value).clone();
            // A panicking completion is logged by the guard and dropped.
            let _ = guard::catch("async callback", move || closure(value));
        }

        let context = Box::into_raw(Box::new(closure)) as *const c_void;
        ledger::record_alloc(context as usize);
        AsyncCallback {
            callback: Some(trampoline::<T, F>),
            context,
            _marker: PhantomData,
        }
    }
}

impl<T> AsyncCallback<T> {
    pub const fn null() -> Self {
        AsyncCallback {
            callback: None,
            context: ptr::null(),
            _marker: PhantomData,
        }
    }

    /// Wrap a foreign completion function.
    ///
    /// # Safety
    ///
    /// `callback` must accept `context` from any thread.
    pub const unsafe fn from_fn(
        callback: unsafe extern "C" fn(*const T, *const c_void),
        context: *const c_void,
    ) -> Self {
        AsyncCallback {
            callback: Some(callback),
            context,
            _marker: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.callback.is_none()
    }

    /// Signal completion with `value`. A null token is fatal.
    pub fn call(self, value: T) {
        match self.callback {
            Some(callback) => unsafe { callback(&value, self.context) },
            None => protocol::fatal(ProtocolViolation::NullCallback),
        }
    }
}

impl<T> std::fmt::Debug for AsyncCallback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCallback")
            .field("callback", &self.callback.map(|c| c as *const ()))
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn closure_receives_value_once() {
        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);
        let callback = AsyncCallback::new(move |value: u32| {
            sink.fetch_add(value, Ordering::SeqCst);
        });
        let before = ledger::thread_balance();
        callback.call(41);
        assert_eq!(seen.load(Ordering::SeqCst), 41);
        assert_eq!(ledger::thread_balance().since(before).releases, 1);
    }

    #[test]
    fn second_signal_is_reported() {
        let seen = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&seen);
        let callback = AsyncCallback::new(move |value: u32| {
            sink.fetch_add(value, Ordering::SeqCst);
        });
        let copy = callback;
        let ((), violations) = protocol::capture(|| {
            callback.call(1);
            // Occupy the freed block so no live allocation can take its address.
            let sentinel = Box::new(0usize);
            copy.call(2);
            drop(sentinel);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            ProtocolViolation::TicketSignaledTwice { .. }
        ));
    }

    #[test]
    fn foreign_function_gets_context() {
        unsafe extern "C" fn store(value: *const u64, context: *const c_void) {
            let slot = &*(context as *const AtomicU32);
            slot.store(*value as u32, Ordering::SeqCst);
        }
        let slot = AtomicU32::new(0);
        let callback =
            unsafe { AsyncCallback::from_fn(store, &slot as *const AtomicU32 as *const c_void) };
        callback.call(9u64);
        assert_eq!(slot.load(Ordering::SeqCst), 9);
        assert!(AsyncCallback::<u64>::null().is_null());
    }
}
