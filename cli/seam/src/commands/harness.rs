//! `seam harness`: invariants whose violation ends the process.
//!
//! Each mode drives the reference library through one scenario and prints
//! what it observed, so tests can assert on the exit status and output of a
//! separate process.

use anyhow::{Context, Result};
use clap::ValueEnum;
use seam_core::protocol::{self, ProtocolViolation};
use seam_core::{config, RawBuffer, Slice};
use seam_reference::callbacks::callback_sum_with_cleanup;
use seam_reference::resources::{seam_string_create, seam_string_destroy};
use seam_reference::services::{service_result_destroy, service_result_new};
use seam_reference::{ErrorCode, SumChecked, SumUnchecked, ValueCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HarnessMode {
    /// Release an owned string twice; the second release is detected
    DoubleRelease,
    /// Panic inside a checked callback; the native side sees Err and cleans up
    CheckedFault,
    /// Panic inside an unchecked callback under the configured policy
    UncheckedFault,
    /// Destroy a service handle through a stale copy; the process aborts
    GuardedViolation,
    /// Invoke a callback token after its registration was released; the
    /// process aborts
    ReleasedCallback,
}

pub fn run(mode: HarnessMode) -> Result<()> {
    match mode {
        HarnessMode::DoubleRelease => double_release(),
        HarnessMode::CheckedFault => checked_fault(),
        HarnessMode::UncheckedFault => unchecked_fault(),
        HarnessMode::GuardedViolation => protocol::abort_on_violation(guarded_violation),
        HarnessMode::ReleasedCallback => protocol::abort_on_violation(released_callback),
    }
}

fn double_release() -> Result<()> {
    let text = seam_string_create(Slice::new(b"released once"))
        .into_result()
        .map_err(|code| anyhow::anyhow!("seam_string_create failed: {code:?}"))?;
    let raw = text.into_raw();
    let stale = RawBuffer {
        ptr: raw.ptr,
        len: raw.len,
        capacity: raw.capacity,
        release: raw.release,
    };
    let text = unsafe { seam_core::OwnedString::from_raw(raw) }.context("reclaiming string")?;
    seam_string_destroy(text);
    println!("first release: ok");

    // Occupy the freed block so no live allocation can take its address.
    let sentinel = Vec::<u8>::with_capacity(stale.capacity as usize);
    let ((), violations) = protocol::capture(|| unsafe { stale.release() });
    drop(sentinel);
    match violations.as_slice() {
        [violation @ ProtocolViolation::DoubleRelease { .. }] => {
            println!("second release: detected: {violation}");
            Ok(())
        }
        other => anyhow::bail!("double release not detected (saw {other:?})"),
    }
}

fn checked_fault() -> Result<()> {
    let checked = SumChecked::register(|_, _| panic!("checked callback failed"));
    let unchecked = SumUnchecked::register(|_, _| {});
    let mut out = 0;
    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, 41, &mut out);
    let observed = result.into_result();
    println!("observed: {observed:?}");
    println!("cleanup: out = {out}");
    if observed != Err(ErrorCode::Panic) || out != 42 {
        anyhow::bail!("checked callback failure was not contained");
    }
    Ok(())
}

fn unchecked_fault() -> Result<()> {
    let policy = config::current().callbacks.unchecked_failure;
    println!("policy: {}", policy.name());
    let checked = SumChecked::register(|_, _| ErrorCode::Ok);
    let unchecked = SumUnchecked::register(|_, _| panic!("unchecked callback failed"));
    let mut out = 0;
    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, 41, &mut out);
    println!("observed: {:?}", result.into_result());
    println!("cleanup: out = {out}");
    Ok(())
}

fn guarded_violation() -> Result<()> {
    let mut service = std::ptr::null_mut();
    let status = service_result_new(&mut service);
    if status != ErrorCode::Ok {
        anyhow::bail!("service_result_new failed: {status:?}");
    }
    let mut stale = service;
    let first = unsafe { service_result_destroy(&mut service) };
    let sentinel = Box::new(0u64);
    println!("first destroy: {first:?}");
    let second = unsafe { service_result_destroy(&mut stale) };
    drop(sentinel);
    anyhow::bail!("second destroy returned {second:?} instead of aborting")
}

fn released_callback() -> Result<()> {
    let registration = ValueCallback::register(|value| value + 1);
    let token = registration.token();
    println!("before release: {}", token.call(1));
    registration.release();
    let sentinel = Box::new(0u64);
    let value = token.call(1);
    drop(sentinel);
    anyhow::bail!("released callback returned {value} instead of aborting")
}
