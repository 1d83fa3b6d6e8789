//! Callback exports.

use seam_callback::callback;
use seam_core::ResultEnvelope;

use crate::types::ErrorCode;

callback!(pub ValueCallback(value: u32) -> u32);
callback!(
    /// Checked: a caller-side failure comes back as `ErrorCode::Panic`.
    pub SumChecked(x: i32, y: i32) -> ErrorCode
);
callback!(
    /// Unchecked: a caller-side failure follows the configured policy.
    pub SumUnchecked(x: i32, y: i32)
);

#[no_mangle]
pub extern "C" fn callback_apply(callback: ValueCallback, value: u32) -> u32 {
    callback.call(value)
}

/// Sets `out = i - 1`, invokes both callbacks with `(x, x)`, then sets
/// `out = i + 1`. Both steps wrap at the ends of the `i32` range.
///
/// A failure reported by the checked callback is returned as `Err` once the
/// cleanup has run.
#[no_mangle]
pub extern "C" fn callback_sum_with_cleanup(
    checked: SumChecked,
    unchecked: SumUnchecked,
    x: i32,
    i: i32,
    out: &mut i32,
) -> ResultEnvelope<(), ErrorCode> {
    *out = i.wrapping_sub(1);
    let status = checked.call(x, x);
    unchecked.call(x, x);
    *out = i.wrapping_add(1);
    match status {
        ErrorCode::Ok => ResultEnvelope::ok(()),
        error => ResultEnvelope::err(error),
    }
}
