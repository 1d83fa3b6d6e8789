//! Opaque handles to native state.
//!
//! A [`Handle`] is a pointer to boxed native state. The caller never
//! dereferences it; it only passes it back into native calls and eventually
//! to exactly one destructor. Handles are registered with the
//! [`ledger`](crate::ledger), so use after release and double release are
//! detected.
//!
//! Native libraries expose handles through the service shape:
//!
//! - the constructor writes the handle into an out-parameter and returns a
//!   status code ([`construct`]);
//! - methods take the handle first and return an envelope ([`invoke`]), or,
//!   for methods with no error channel, a value that falls back to its
//!   default on a null handle or a panic ([`invoke_or_default`]);
//! - the destructor takes `&mut *mut T`, frees, and writes null back
//!   ([`destroy`]). Destroying null reports `NULL`.

use std::fmt;
use std::ptr;

use crate::envelope::{BoundaryError, ResultEnvelope, StatusCode};
use crate::guard;
use crate::ledger;
use crate::protocol::{self, ProtocolViolation};

/// Pointer to native-owned `T`.
#[repr(transparent)]
pub struct Handle<T> {
    ptr: *mut T,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Handle<T> {
    /// Box `value` and register it.
    pub fn new(value: T) -> Self {
        let ptr = Box::into_raw(Box::new(value));
        ledger::record_alloc(ptr as usize);
        Handle { ptr }
    }

    pub fn null() -> Self {
        Handle {
            ptr: ptr::null_mut(),
        }
    }

    /// # Safety
    ///
    /// `ptr` must be null or come from [`Handle::as_ptr`].
    pub unsafe fn from_ptr(ptr: *mut T) -> Self {
        Handle { ptr }
    }

    pub fn as_ptr(self) -> *mut T {
        self.ptr
    }

    pub fn is_null(self) -> bool {
        self.ptr.is_null()
    }

    pub fn is_live(self) -> bool {
        !self.ptr.is_null() && ledger::is_live(self.ptr as usize)
    }

    /// Borrow the state. `None` for null; using a released handle is fatal.
    ///
    /// # Safety
    ///
    /// No mutable borrow of the same state may exist for `'a`, and the
    /// handle must not be released during `'a`.
    pub unsafe fn get<'a>(self) -> Option<&'a T> {
        self.check_live()?;
        Some(&*self.ptr)
    }

    /// Mutably borrow the state.
    ///
    /// # Safety
    ///
    /// No other borrow of the same state may exist for `'a`, and the handle
    /// must not be released during `'a`.
    pub unsafe fn get_mut<'a>(self) -> Option<&'a mut T> {
        self.check_live()?;
        Some(&mut *self.ptr)
    }

    /// Free the state and return it.
    ///
    /// `None` for null. Releasing a handle that is no longer live is
    /// reported as [`ProtocolViolation::DoubleRelease`].
    ///
    /// # Safety
    ///
    /// No borrow obtained through [`Handle::get`] may still be in use.
    pub unsafe fn release(self) -> Option<T> {
        if self.ptr.is_null() {
            return None;
        }
        if !ledger::record_release(self.ptr as usize) {
            protocol::report(ProtocolViolation::DoubleRelease {
                resource: "handle",
                address: self.ptr as usize,
            });
            return None;
        }
        Some(*Box::from_raw(self.ptr))
    }

    fn check_live(self) -> Option<()> {
        if self.ptr.is_null() {
            return None;
        }
        if !ledger::is_live(self.ptr as usize) {
            protocol::fatal(ProtocolViolation::UseAfterRelease {
                resource: "handle",
                address: self.ptr as usize,
            });
        }
        Some(())
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", self.ptr)
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for Handle<T> {}

/// Constructor half of the service shape.
///
/// On success writes the new handle into `out`; on failure or panic writes
/// null and returns the error.
pub fn construct<T, E, F>(site: &'static str, out: &mut *mut T, f: F) -> E
where
    E: StatusCode + fmt::Debug,
    F: FnOnce() -> Result<T, E>,
{
    *out = ptr::null_mut();
    guard::status(site, || {
        let value = f()?;
        *out = Handle::new(value).as_ptr();
        Ok(())
    })
}

/// Destructor half of the service shape.
///
/// # Safety
///
/// `slot` must hold null or a pointer written by [`construct`].
pub unsafe fn destroy<T, E>(slot: &mut *mut T) -> E
where
    E: StatusCode,
{
    if slot.is_null() {
        return E::NULL;
    }
    let handle = Handle::from_ptr(*slot);
    *slot = ptr::null_mut();
    match guard::catch("destroy", || drop(handle.release())) {
        Ok(()) => E::SUCCESS,
        Err(_) => E::PANIC,
    }
}

/// Run a service method against the state behind `ptr`.
///
/// A null handle yields `Err(E::NULL)`; a panic yields `Err(E::PANIC)`.
///
/// # Safety
///
/// `ptr` must be null or a live handle with no other borrow in use.
pub unsafe fn invoke<T, R, E, F>(site: &'static str, ptr: *mut T, f: F) -> ResultEnvelope<R, E>
where
    E: BoundaryError + fmt::Debug,
    F: FnOnce(&mut T) -> Result<R, E>,
{
    match Handle::from_ptr(ptr).get_mut() {
        Some(state) => guard::boundary(site, || f(state)),
        None => ResultEnvelope::err(E::NULL),
    }
}

/// Run a service method with no error channel.
///
/// A null handle or a panic yields `R::default()`. The result may borrow
/// from the state behind `ptr`.
///
/// # Safety
///
/// `ptr` must be null or a live handle with no other borrow in use, and a
/// borrow carried by the result must end before the handle is used again.
pub unsafe fn invoke_or_default<'a, T, R, F>(site: &'static str, ptr: *mut T, f: F) -> R
where
    T: 'a,
    R: Default,
    F: FnOnce(&'a mut T) -> R,
{
    match Handle::from_ptr(ptr).get_mut() {
        Some(state) => guard::or_default(site, || f(state)),
        None => R::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::thread_balance;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Code {
        Ok,
        Null,
        Panic,
        Refused,
    }

    impl BoundaryError for Code {
        const PANIC: Self = Code::Panic;
        const NULL: Self = Code::Null;
    }

    impl StatusCode for Code {
        const SUCCESS: Self = Code::Ok;
    }

    struct Counter {
        value: u32,
    }

    #[test]
    fn handle_lifecycle_is_neutral() {
        let before = thread_balance();
        let handle = Handle::new(Counter { value: 1 });
        assert!(handle.is_live());
        unsafe {
            handle.get_mut().unwrap().value += 1;
            assert_eq!(handle.get().unwrap().value, 2);
            assert_eq!(handle.release().map(|c| c.value), Some(2));
        }
        assert!(!handle.is_live());
        assert_eq!(thread_balance().since(before).outstanding(), 0);
    }

    #[test]
    fn null_handle_has_no_state() {
        let handle = Handle::<Counter>::null();
        unsafe {
            assert!(handle.get().is_none());
            assert!(handle.release().is_none());
        }
    }

    #[test]
    fn second_release_is_reported() {
        let handle = Handle::new(5u64);
        let copy = handle;
        let (released, violations) = protocol::capture(|| unsafe {
            let first = handle.release();
            // Occupy the freed block so no live allocation can take its address.
            let sentinel = Box::new(0u64);
            let second = copy.release();
            drop(sentinel);
            (first, second)
        });
        assert_eq!(released, (Some(5), None));
        assert!(matches!(
            violations.as_slice(),
            [ProtocolViolation::DoubleRelease { resource: "handle", .. }]
        ));
    }

    #[test]
    fn use_after_release_is_fatal() {
        let handle = Handle::new(String::from("gone"));
        let address = handle.as_ptr() as usize;
        unsafe { handle.release() };
        // Occupy the freed block so no live allocation can take its address.
        let sentinel = Box::new([0u64; 3]);
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
            let _ = handle.get();
        }))
        .unwrap_err();
        drop(sentinel);
        assert_eq!(
            payload.downcast_ref::<protocol::FatalViolation>().map(|v| v.0.clone()),
            Some(ProtocolViolation::UseAfterRelease {
                resource: "handle",
                address,
            })
        );
    }

    #[test]
    fn destroying_a_stale_copy_is_not_absorbed() {
        let mut ptr: *mut Counter = ptr::null_mut();
        let _: Code = construct("new", &mut ptr, || Ok(Counter { value: 1 }));
        let mut stale = ptr;
        assert_eq!(unsafe { destroy::<Counter, Code>(&mut ptr) }, Code::Ok);
        // Occupy the freed block so no live allocation can take its address.
        let sentinel = Box::new(0u32);
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || unsafe {
            destroy::<Counter, Code>(&mut stale)
        }))
        .unwrap_err();
        drop(sentinel);
        assert!(protocol::is_fatal(payload.as_ref()));
    }

    #[test]
    fn method_without_error_channel_defaults() {
        let mut ptr: *mut Counter = ptr::null_mut();
        let _: Code = construct("new", &mut ptr, || Ok(Counter { value: 9 }));
        unsafe {
            assert_eq!(invoke_or_default("value", ptr, |c: &mut Counter| c.value), 9);
            assert_eq!(invoke_or_default::<_, u32, _>("boom", ptr, |_| panic!("no value")), 0);
            assert_eq!(
                invoke_or_default("null", ptr::null_mut(), |c: &mut Counter| c.value),
                0
            );
            assert_eq!(destroy::<Counter, Code>(&mut ptr), Code::Ok);
        }
    }

    #[test]
    fn service_shape() {
        let mut ptr: *mut Counter = ptr::null_mut();
        let status: Code = construct("new", &mut ptr, || Ok(Counter { value: 10 }));
        assert_eq!(status, Code::Ok);
        assert!(!ptr.is_null());

        let read = unsafe { invoke("read", ptr, |c: &mut Counter| Ok::<_, Code>(c.value)) };
        assert_eq!(read.into_result(), Ok(10));

        let refused = unsafe { invoke("refuse", ptr, |_: &mut Counter| Err::<u32, _>(Code::Refused)) };
        assert_eq!(refused.into_result(), Err(Code::Refused));

        let panicked = unsafe { invoke::<_, u32, Code, _>("boom", ptr, |_| panic!("bad state")) };
        assert_eq!(panicked.into_result(), Err(Code::Panic));

        assert_eq!(unsafe { destroy::<Counter, Code>(&mut ptr) }, Code::Ok);
        assert!(ptr.is_null());
        assert_eq!(unsafe { destroy::<Counter, Code>(&mut ptr) }, Code::Null);

        let null_call = unsafe { invoke("read", ptr, |c: &mut Counter| Ok::<_, Code>(c.value)) };
        assert_eq!(null_call.into_result(), Err(Code::Null));
    }

    #[test]
    fn failed_constructor_writes_null() {
        let mut ptr: *mut Counter = ptr::null_mut();
        let status: Code = construct("new", &mut ptr, || Err(Code::Refused));
        assert_eq!(status, Code::Refused);
        assert!(ptr.is_null());
    }
}
