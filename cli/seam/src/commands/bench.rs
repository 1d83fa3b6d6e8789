//! `seam bench`: boundary call overhead of reference exports.

use std::hint::black_box;

use anyhow::Result;
use seam_core::calibration::{self, Measurement};
use seam_core::Slice;
use seam_reference::callbacks::callback_apply;
use seam_reference::primitives::echo_u64;
use seam_reference::resources::{buffer_from_slice, buffer_release};
use seam_reference::slices::slice_len;
use seam_reference::ValueCallback;

/// Calibrate against an empty call, then time each export.
pub fn run(iterations: u32) -> Result<()> {
    if iterations == 0 {
        anyhow::bail!("--iterations must be at least 1");
    }

    let baseline = calibration::calibrate(iterations, || black_box(()));
    println!(
        "baseline: {:.2} ns/call over {} calls",
        baseline.nanos_per_call(),
        iterations
    );

    let values = vec![7u32; 64];
    let bytes = vec![1u8; 256];
    let callback = ValueCallback::register(|value| value.wrapping_add(1));
    let token = callback.token();

    let results: Vec<(&str, Measurement)> = vec![
        (
            "echo_u64",
            calibration::measure(iterations, || {
                black_box(echo_u64(black_box(42)));
            })?,
        ),
        (
            "slice_len[64]",
            calibration::measure(iterations, || {
                black_box(slice_len(Slice::new(black_box(&values))));
            })?,
        ),
        (
            "buffer_from_slice+release[256]",
            calibration::measure(iterations, || {
                buffer_release(buffer_from_slice(Slice::new(black_box(&bytes))));
            })?,
        ),
        (
            "callback_apply",
            calibration::measure(iterations, || {
                black_box(callback_apply(token, black_box(1)));
            })?,
        ),
    ];

    println!();
    println!("  {:<32} {:>12}", "export", "ns/call");
    for (name, measurement) in &results {
        println!("  {:<32} {:>12.2}", name, measurement.nanos_per_call());
    }
    tracing::debug!(invocations = callback.stats().invocations, "bench finished");
    Ok(())
}
