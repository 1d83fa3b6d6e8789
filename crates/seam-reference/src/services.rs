//! Services: opaque handles with a constructor, methods and a destructor.
//!
//! Each service is a plain Rust type with ordinary methods, plus a set of
//! `extern "C"` wrappers following the handle service shape.

use std::thread;
use std::time::Duration;

use seam_async::{AsyncTicket, Executor};
use seam_callback::AsyncCallback;
use seam_core::config;
use seam_core::handle;
use seam_core::{OptionEnvelope, OwnedString, ResultEnvelope, Slice, SliceMut};

use crate::types::{EnumPayload, ErrorCode};

/// Envelope signalled by asynchronous reference operations.
pub type AsyncU64 = ResultEnvelope<u64, ErrorCode>;

/// Service whose methods return envelopes of every shape.
#[derive(Debug, Default)]
pub struct ServiceResult {
    calls: u64,
}

impl ServiceResult {
    pub fn new() -> Result<Self, ErrorCode> {
        Ok(ServiceResult::default())
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn result_u32(&mut self) -> Result<u32, ErrorCode> {
        self.calls += 1;
        Ok(123)
    }

    pub fn result_string(&mut self) -> Result<OwnedString, ErrorCode> {
        self.calls += 1;
        Ok(OwnedString::new("hello world"))
    }

    pub fn result_option_enum(&mut self) -> Result<OptionEnvelope<EnumPayload>, ErrorCode> {
        self.calls += 1;
        Ok(OptionEnvelope::some(EnumPayload::C(123)))
    }

    /// Element `index` of `data`; out of range is `Err(Fail)`.
    pub fn result_slice(&mut self, data: Slice<'_, u64>, index: u64) -> Result<u64, ErrorCode> {
        self.calls += 1;
        data.get(index).copied().map_err(|_| ErrorCode::Fail)
    }

    pub fn fail(&mut self) -> Result<u32, ErrorCode> {
        self.calls += 1;
        Err(ErrorCode::Fail)
    }
}

#[no_mangle]
pub extern "C" fn service_result_new(out: &mut *mut ServiceResult) -> ErrorCode {
    handle::construct("service_result_new", out, ServiceResult::new)
}

/// # Safety
///
/// `slot` must hold null or a handle from [`service_result_new`].
#[no_mangle]
pub unsafe extern "C" fn service_result_destroy(slot: &mut *mut ServiceResult) -> ErrorCode {
    handle::destroy(slot)
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_result_result_u32(
    service: *mut ServiceResult,
) -> ResultEnvelope<u32, ErrorCode> {
    handle::invoke("service_result_result_u32", service, ServiceResult::result_u32)
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_result_result_string(
    service: *mut ServiceResult,
) -> ResultEnvelope<OwnedString, ErrorCode> {
    handle::invoke("service_result_result_string", service, ServiceResult::result_string)
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_result_result_option_enum(
    service: *mut ServiceResult,
) -> ResultEnvelope<OptionEnvelope<EnumPayload>, ErrorCode> {
    handle::invoke(
        "service_result_result_option_enum",
        service,
        ServiceResult::result_option_enum,
    )
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_result_result_slice(
    service: *mut ServiceResult,
    data: Slice<'_, u64>,
    index: u64,
) -> ResultEnvelope<u64, ErrorCode> {
    handle::invoke("service_result_result_slice", service, |s| s.result_slice(data, index))
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_result_fail(service: *mut ServiceResult) -> ResultEnvelope<u32, ErrorCode> {
    handle::invoke("service_result_fail", service, ServiceResult::fail)
}

/// Service lending views into storage it owns.
///
/// A view returned by [`ServiceSlices::data`] or [`ServiceSlices::data_mut`]
/// stays valid until the next call into the same service, or its
/// destruction. Callers must drop the view before calling again.
#[derive(Debug)]
pub struct ServiceSlices {
    data: Vec<u32>,
}

impl ServiceSlices {
    pub const INITIAL: u32 = 123;
    pub const LEN: usize = 64;

    pub fn new() -> Result<Self, ErrorCode> {
        Ok(ServiceSlices {
            data: vec![Self::INITIAL; Self::LEN],
        })
    }

    /// First byte of `bytes`, or 0 for an empty view.
    pub fn first_byte(&mut self, bytes: Slice<'_, u8>) -> u8 {
        bytes.first().copied().unwrap_or(0)
    }

    pub fn data(&mut self) -> Slice<'_, u32> {
        Slice::new(&self.data)
    }

    pub fn data_mut(&mut self) -> SliceMut<'_, u32> {
        SliceMut::new(&mut self.data)
    }

    /// Sum of the stored values.
    pub fn total(&mut self) -> u64 {
        self.data.iter().map(|&value| u64::from(value)).sum()
    }
}

#[no_mangle]
pub extern "C" fn service_slices_new(out: &mut *mut ServiceSlices) -> ErrorCode {
    handle::construct("service_slices_new", out, ServiceSlices::new)
}

/// # Safety
///
/// `slot` must hold null or a handle from [`service_slices_new`], and no view
/// lent by the service may be in use.
#[no_mangle]
pub unsafe extern "C" fn service_slices_destroy(slot: &mut *mut ServiceSlices) -> ErrorCode {
    handle::destroy(slot)
}

/// `0` for a null service.
///
/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_slices_first_byte(service: *mut ServiceSlices, bytes: Slice<'_, u8>) -> u8 {
    handle::invoke_or_default("service_slices_first_byte", service, |s| s.first_byte(bytes))
}

/// View of the service's storage; empty for a null service.
///
/// # Safety
///
/// `service` must be null or a live handle. The view must be dropped before
/// the next call into the service.
#[no_mangle]
pub unsafe extern "C" fn service_slices_data<'a>(service: *mut ServiceSlices) -> Slice<'a, u32> {
    handle::invoke_or_default("service_slices_data", service, ServiceSlices::data)
}

/// Mutable view of the service's storage; empty for a null service.
///
/// # Safety
///
/// As [`service_slices_data`].
#[no_mangle]
pub unsafe extern "C" fn service_slices_data_mut<'a>(service: *mut ServiceSlices) -> SliceMut<'a, u32> {
    handle::invoke_or_default("service_slices_data_mut", service, ServiceSlices::data_mut)
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_slices_total(service: *mut ServiceSlices) -> u64 {
    handle::invoke_or_default("service_slices_total", service, ServiceSlices::total)
}

/// Service running operations on its own worker pool.
#[derive(Debug)]
pub struct ServiceAsync {
    executor: Executor,
}

impl ServiceAsync {
    pub fn new() -> Result<Self, ErrorCode> {
        let executor = Executor::from_config(&config::current().executor).map_err(|error| {
            tracing::error!(%error, "could not start service executor");
            ErrorCode::Fail
        })?;
        Ok(ServiceAsync { executor })
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Signal `callback` with `Ok(x)` after `ms` milliseconds.
    ///
    /// Returns at once. On `Err` the callback is never signalled.
    pub fn return_after_ms(&self, x: u64, ms: u64, callback: AsyncCallback<AsyncU64>) -> Result<(), ErrorCode> {
        self.executor
            .execute(move || {
                thread::sleep(Duration::from_millis(ms));
                callback.call(ResultEnvelope::ok(x));
            })
            .map_err(|error| {
                tracing::warn!(%error, "return_after_ms rejected");
                ErrorCode::Fail
            })
    }

    /// [`return_after_ms`](Self::return_after_ms) awaited through a ticket.
    pub fn start_return_after_ms(&self, x: u64, ms: u64) -> AsyncTicket<AsyncU64> {
        let (ticket, callback) = AsyncTicket::with_callback();
        if let Err(error) = self.return_after_ms(x, ms, callback) {
            callback.call(ResultEnvelope::err(error));
        }
        ticket
    }

    /// `x * x` computed by a future on the service's workers; overflow is
    /// `Err(Fail)`.
    pub fn start_compute(&self, x: u64) -> AsyncTicket<AsyncU64> {
        self.executor
            .spawn_future(async move { ResultEnvelope::from(x.checked_mul(x).ok_or(ErrorCode::Fail)) })
    }
}

#[no_mangle]
pub extern "C" fn service_async_new(out: &mut *mut ServiceAsync) -> ErrorCode {
    handle::construct("service_async_new", out, ServiceAsync::new)
}

/// Waits for queued operations to finish, then frees the service.
///
/// # Safety
///
/// `slot` must hold null or a handle from [`service_async_new`].
#[no_mangle]
pub unsafe extern "C" fn service_async_destroy(slot: &mut *mut ServiceAsync) -> ErrorCode {
    handle::destroy(slot)
}

/// # Safety
///
/// `service` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn service_async_return_after_ms(
    service: *mut ServiceAsync,
    x: u64,
    ms: u64,
    callback: AsyncCallback<AsyncU64>,
) -> ResultEnvelope<(), ErrorCode> {
    handle::invoke("service_async_return_after_ms", service, |s| {
        s.return_after_ms(x, ms, callback)
    })
}
