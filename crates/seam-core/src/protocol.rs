//! Protocol violations and the thread-scoped harness mode.
//!
//! A protocol violation means one side's view of shared state is already
//! wrong: an envelope carries a tag neither side defined, a resource is
//! released twice, a ticket is signaled twice. Execution cannot continue
//! meaningfully, so [`fatal`] logs and panics with a [`FatalViolation`]
//! payload. The boundary guards re-raise that payload instead of turning it
//! into an error value, so it reaches the outermost `extern "C"` frame and
//! aborts the process. Threads owned by the runtime run their work under
//! [`abort_on_violation`].
//!
//! Where the offending action can simply be skipped (a second release, for
//! example) the code calls [`report`] instead. Outside harness mode `report`
//! is fatal too; inside [`capture`] it records the violation for the current
//! thread and returns, letting a test assert on what was detected.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// A state the boundary contract forbids.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// An envelope tag outside the defined set.
    #[error("unknown discriminant {tag} in {envelope}")]
    UnknownDiscriminant { envelope: &'static str, tag: u32 },

    /// A resource the ledger no longer considers live was released again.
    #[error("double release of {resource} at {address:#x}")]
    DoubleRelease { resource: &'static str, address: usize },

    /// A resource was accessed after its release.
    #[error("use of released {resource} at {address:#x}")]
    UseAfterRelease { resource: &'static str, address: usize },

    /// A callback context was released while invocations were running.
    #[error("callback context {address:#x} released with {in_flight} invocation(s) in flight")]
    ReleasedWhileInvoking { address: usize, in_flight: usize },

    /// An async ticket received a second completion signal.
    #[error("async ticket {address:#x} signaled twice")]
    TicketSignaledTwice { address: usize },

    /// A callback token with a null function pointer was invoked.
    #[error("invoked a callback token with a null function pointer")]
    NullCallback,
}

/// Panic payload raised by [`fatal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalViolation(pub ProtocolViolation);

impl fmt::Display for FatalViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boundary protocol violation: {}", self.0)
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<ProtocolViolation>>> = const { RefCell::new(None) };
}

/// Log the violation and panic with a [`FatalViolation`] payload.
#[track_caller]
pub fn fatal(violation: ProtocolViolation) -> ! {
    tracing::error!(%violation, "boundary protocol violation");
    eprintln!("seam: boundary protocol violation: {violation}");
    panic::panic_any(FatalViolation(violation))
}

/// Whether a panic payload came from [`fatal`].
pub fn is_fatal(payload: &(dyn std::any::Any + Send)) -> bool {
    payload.is::<FatalViolation>()
}

/// Run `f`, aborting the process if a protocol violation escapes it.
///
/// Other panics keep unwinding.
pub fn abort_on_violation<R>(f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) if is_fatal(payload.as_ref()) => std::process::abort(),
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Report a violation whose offending action the caller will skip.
///
/// Returns only in harness mode.
#[track_caller]
pub fn report(violation: ProtocolViolation) {
    let recorded = CAPTURED.with(|captured| match captured.borrow_mut().as_mut() {
        Some(list) => {
            list.push(violation.clone());
            true
        }
        None => false,
    });
    if recorded {
        tracing::warn!(%violation, "protocol violation recorded by harness");
        return;
    }
    fatal(violation)
}

/// Whether the current thread is inside [`capture`].
pub fn in_harness() -> bool {
    CAPTURED.with(|captured| captured.borrow().is_some())
}

/// Run `f` in harness mode and return the violations it reported.
///
/// Only violations reported on the calling thread are collected. Nested
/// captures each see their own violations.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<ProtocolViolation>) {
    struct Restore(Option<Option<Vec<ProtocolViolation>>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(previous) = self.0.take() {
                CAPTURED.with(|captured| *captured.borrow_mut() = previous);
            }
        }
    }

    let previous = CAPTURED.with(|captured| captured.borrow_mut().replace(Vec::new()));
    let mut restore = Restore(Some(previous));
    let result = f();
    let violations = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    if let Some(previous) = restore.0.take() {
        CAPTURED.with(|captured| *captured.borrow_mut() = previous);
    }
    (result, violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_recorded_inside_capture() {
        let ((), violations) = capture(|| {
            report(ProtocolViolation::NullCallback);
            report(ProtocolViolation::TicketSignaledTwice { address: 0x10 });
        });
        assert_eq!(
            violations,
            vec![
                ProtocolViolation::NullCallback,
                ProtocolViolation::TicketSignaledTwice { address: 0x10 },
            ]
        );
        assert!(!in_harness());
    }

    #[test]
    fn report_outside_capture_is_fatal() {
        let payload = panic::catch_unwind(|| report(ProtocolViolation::NullCallback)).unwrap_err();
        assert_eq!(
            payload.downcast_ref::<FatalViolation>(),
            Some(&FatalViolation(ProtocolViolation::NullCallback))
        );
        assert!(is_fatal(payload.as_ref()));
    }

    #[test]
    fn ordinary_panics_pass_through_abort_on_violation() {
        let payload = panic::catch_unwind(|| abort_on_violation(|| panic!("plain"))).unwrap_err();
        assert!(!is_fatal(payload.as_ref()));
        assert_eq!(abort_on_violation(|| 3), 3);
    }

    #[test]
    fn nested_capture_keeps_violations_apart() {
        let (inner, outer) = capture(|| {
            report(ProtocolViolation::NullCallback);
            let ((), inner) = capture(|| {
                report(ProtocolViolation::DoubleRelease {
                    resource: "buffer",
                    address: 1,
                });
            });
            inner
        });
        assert_eq!(outer, vec![ProtocolViolation::NullCallback]);
        assert_eq!(inner.len(), 1);
    }

    #[test]
    fn capture_restores_state_after_panic() {
        let caught = std::panic::catch_unwind(|| {
            capture(|| panic!("inside harness"));
        });
        assert!(caught.is_err());
        assert!(!in_harness());
    }

    #[test]
    fn violation_messages() {
        let v = ProtocolViolation::UnknownDiscriminant {
            envelope: "ResultEnvelope",
            tag: 7,
        };
        assert_eq!(v.to_string(), "unknown discriminant 7 in ResultEnvelope");
        assert_eq!(
            FatalViolation(v).to_string(),
            "boundary protocol violation: unknown discriminant 7 in ResultEnvelope"
        );
    }
}
