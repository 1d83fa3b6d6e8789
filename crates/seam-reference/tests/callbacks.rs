use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use seam_core::{ledger, Slice, SliceMut, UncheckedFailurePolicy};
use seam_reference::callbacks::{callback_apply, callback_sum_with_cleanup};
use seam_reference::slices::{slice_first_via_callback, slice_with_callback};
use seam_reference::{ByteCallback, ErrorCode, SliceCallback, SumChecked, SumUnchecked, ValueCallback};

#[test]
fn apply_calls_back_into_closure() {
    let registration = ValueCallback::register(|value| value * 3);
    assert_eq!(callback_apply(registration.token(), 14), 42);
    assert_eq!(registration.stats().invocations, 1);
}

#[test]
fn checked_failure_is_observed_and_cleanup_runs() {
    let checked = SumChecked::register(|x, y| {
        if x + y > 10 {
            panic!("sum too large");
        }
        ErrorCode::Ok
    });
    let seen = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&seen);
    let unchecked = SumUnchecked::register(move |_, _| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let mut out = 0;
    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 2, 5, &mut out);
    assert!(result.is_ok());
    assert_eq!(out, 6);

    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 9, 5, &mut out);
    assert_eq!(result.into_result(), Err(ErrorCode::Panic));
    assert_eq!(out, 6, "cleanup after the callbacks still ran");
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(checked.stats().faults, 1);
}

#[test]
fn cleanup_wraps_at_the_ends_of_the_range() {
    let checked = SumChecked::register(|_, _| ErrorCode::Ok);
    let unchecked = SumUnchecked::register(|_, _| {});
    let mut out = 0;

    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, i32::MIN, &mut out);
    assert!(result.is_ok());
    assert_eq!(out, i32::MIN + 1);

    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, i32::MAX, &mut out);
    assert!(result.is_ok());
    assert_eq!(out, i32::MIN);
    assert_eq!(checked.stats().invocations, 2);
}

#[test]
fn checked_domain_error_is_returned() {
    let checked = SumChecked::register(|_, _| ErrorCode::Fail);
    let unchecked = SumUnchecked::register(|_, _| {});
    let mut out = 0;
    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, 1, &mut out);
    assert_eq!(result.into_result(), Err(ErrorCode::Fail));
    assert_eq!(out, 2);
}

#[test]
fn unchecked_failure_under_return_default_policy() {
    let checked = SumChecked::register(|_, _| ErrorCode::Ok);
    let unchecked = SumUnchecked::register_with_policy(
        |_, _| panic!("unchecked failure"),
        UncheckedFailurePolicy::ReturnDefault,
    );
    let mut out = 0;
    let result = callback_sum_with_cleanup(checked.token(), unchecked.token(), 1, 10, &mut out);
    assert!(result.is_ok());
    assert_eq!(out, 11);
    assert_eq!(unchecked.stats().faults, 1);
}

#[test]
fn callback_receives_mutable_view() {
    let registration = SliceCallback::register(|mut data: SliceMut<'_, u8>| {
        for (i, byte) in data.as_slice_mut().iter_mut().enumerate() {
            *byte = i as u8 * 2;
        }
    });
    let mut bytes = vec![0u8; 4];
    slice_with_callback(SliceMut::new(&mut bytes), registration.token());
    assert_eq!(bytes, [0, 2, 4, 6]);
}

#[test]
fn callback_reduces_view() {
    let registration = ByteCallback::register(|data: Slice<'_, u8>| data.get(0).copied().unwrap_or(0));
    assert_eq!(slice_first_via_callback(Slice::new(&[9u8, 8, 7]), registration.token()), 9);
    assert_eq!(slice_first_via_callback(Slice::empty(), registration.token()), 0);
}

#[test]
fn registrations_do_not_leak() {
    let before = ledger::thread_balance();
    {
        let registration = ValueCallback::register(|value| value);
        assert_eq!(callback_apply(registration.token(), 1), 1);
    }
    assert_eq!(ledger::thread_balance().since(before).outstanding(), 0);
}
