//! Process-wide measurement baseline.
//!
//! [`calibrate`] times `n` runs of a closure that does nothing but cross the
//! boundary and stores the result. [`measure`] subtracts that baseline from
//! later timings. There is no teardown; calibrating again replaces the
//! baseline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{CoreError, Result};

const UNCALIBRATED: u64 = u64::MAX;

static BASELINE_NANOS_PER_CALL: AtomicU64 = AtomicU64::new(UNCALIBRATED);

/// Timing of `iterations` calls with the baseline removed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub iterations: u32,
    pub total_nanos: u64,
}

impl Measurement {
    pub fn nanos_per_call(&self) -> f64 {
        if self.iterations == 0 {
            return 0.0;
        }
        self.total_nanos as f64 / self.iterations as f64
    }
}

fn time(n: u32, mut f: impl FnMut()) -> u64 {
    let start = Instant::now();
    for _ in 0..n {
        f();
    }
    start.elapsed().as_nanos().min(u64::MAX as u128 - 1) as u64
}

/// Record the baseline cost of `f` and return the raw timing.
pub fn calibrate(n: u32, f: impl FnMut()) -> Measurement {
    let total_nanos = time(n, f);
    let per_call = if n == 0 { 0 } else { total_nanos / n as u64 };
    BASELINE_NANOS_PER_CALL.store(per_call, Ordering::Release);
    tracing::debug!(iterations = n, per_call, "calibrated measurement baseline");
    Measurement {
        iterations: n,
        total_nanos,
    }
}

pub fn is_calibrated() -> bool {
    BASELINE_NANOS_PER_CALL.load(Ordering::Acquire) != UNCALIBRATED
}

/// Time `n` runs of `f` with the calibrated baseline subtracted.
pub fn measure(n: u32, f: impl FnMut()) -> Result<Measurement> {
    let baseline = BASELINE_NANOS_PER_CALL.load(Ordering::Acquire);
    if baseline == UNCALIBRATED {
        return Err(CoreError::NotCalibrated);
    }
    let total_nanos = time(n, f).saturating_sub(baseline.saturating_mul(n as u64));
    Ok(Measurement {
        iterations: n,
        total_nanos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the baseline is process-wide state.
    #[test]
    fn measure_requires_calibration() {
        assert!(matches!(measure(1, || {}), Err(CoreError::NotCalibrated)));
        assert!(!is_calibrated());

        let baseline = calibrate(1_000, || {
            std::hint::black_box(0u32);
        });
        assert_eq!(baseline.iterations, 1_000);
        assert!(is_calibrated());

        let mut calls = 0u32;
        let measurement = measure(100, || calls += 1).unwrap();
        assert_eq!(calls, 100);
        assert_eq!(measurement.iterations, 100);
        assert!(measurement.nanos_per_call() >= 0.0);
    }
}
