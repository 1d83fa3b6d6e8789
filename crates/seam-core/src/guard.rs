//! Panic guards.
//!
//! Unwinding must never cross the boundary in either direction. Native
//! exports run their body through [`boundary`] (or [`status`] / [`or_default`]
//! when the export has no envelope) so a panic becomes the error type's
//! `PANIC` value. The callback bridge uses [`catch`] around caller-side code.
//!
//! A [`FatalViolation`] is never absorbed: every guard re-raises it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::config;
use crate::envelope::{BoundaryError, ResultEnvelope, StatusCode};
use crate::protocol::{self, FatalViolation};

/// A panic caught at a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub site: &'static str,
    pub message: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic in {}: {}", self.site, self.message)
    }
}

impl std::error::Error for Fault {}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(violation) = payload.downcast_ref::<FatalViolation>() {
        violation.to_string()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `f`, turning a panic into a [`Fault`].
///
/// A protocol violation is re-raised unchanged.
pub fn catch<R>(site: &'static str, f: impl FnOnce() -> R) -> Result<R, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) if protocol::is_fatal(payload.as_ref()) => panic::resume_unwind(payload),
        Err(payload) => {
            let fault = Fault {
                site,
                message: panic_message(payload.as_ref()),
            };
            tracing::warn!(site, message = %fault.message, "panic caught at boundary guard");
            Err(fault)
        }
    }
}

/// Guard for exports returning a [`ResultEnvelope`].
pub fn boundary<T, E, F>(site: &'static str, f: F) -> ResultEnvelope<T, E>
where
    E: BoundaryError + fmt::Debug,
    F: FnOnce() -> Result<T, E>,
{
    match catch(site, f) {
        Ok(Ok(value)) => ResultEnvelope::ok(value),
        Ok(Err(error)) => {
            if config::current().diagnostics.log_boundary_errors {
                tracing::debug!(site, ?error, "export returned an error");
            }
            ResultEnvelope::err(error)
        }
        Err(_) => ResultEnvelope::err(E::PANIC),
    }
}

/// Guard for exports returning a bare status code.
pub fn status<E, F>(site: &'static str, f: F) -> E
where
    E: StatusCode + fmt::Debug,
    F: FnOnce() -> Result<(), E>,
{
    match catch(site, f) {
        Ok(Ok(())) => E::SUCCESS,
        Ok(Err(error)) => {
            if config::current().diagnostics.log_boundary_errors {
                tracing::debug!(site, ?error, "export returned an error status");
            }
            error
        }
        Err(_) => E::PANIC,
    }
}

/// Guard for exports with no error channel; a panic yields `T::default()`.
pub fn or_default<T, F>(site: &'static str, f: F) -> T
where
    T: Default,
    F: FnOnce() -> T,
{
    catch(site, f).unwrap_or_default()
}
