//! What a callback returns when the caller-side code behind it panics.
//!
//! A return type is either **checked** (it can say "failed" as data, like a
//! `ResultEnvelope` or a status code) or **unchecked** (a raw value with no
//! error channel). Checked types turn a fault into their `PANIC` value, so
//! the native caller sees the failure and its own cleanup still runs.
//! Unchecked types follow the [`UncheckedFailurePolicy`].

use seam_core::config::UncheckedFailurePolicy;
use seam_core::{BoundaryError, Bool, CChar, Fault, OptionEnvelope, ResultEnvelope};

/// Return types usable in a [`callback!`](crate::callback) declaration.
pub trait CallbackReturn: Sized {
    /// Whether a fault is observable by the native caller.
    const CHECKED: bool;

    /// The value handed to the native caller after a fault.
    fn on_fault(fault: &Fault, policy: UncheckedFailurePolicy) -> Self;
}

impl<T, E: BoundaryError> CallbackReturn for ResultEnvelope<T, E> {
    const CHECKED: bool = true;

    fn on_fault(_fault: &Fault, _policy: UncheckedFailurePolicy) -> Self {
        ResultEnvelope::err(E::PANIC)
    }
}

impl<T> CallbackReturn for OptionEnvelope<T> {
    const CHECKED: bool = false;

    fn on_fault(fault: &Fault, policy: UncheckedFailurePolicy) -> Self {
        unchecked_fault(fault, policy)
    }
}

/// Apply the unchecked policy to a fault.
///
/// Under [`UncheckedFailurePolicy::Abort`] this never returns.
pub fn unchecked_fault<R: Default>(fault: &Fault, policy: UncheckedFailurePolicy) -> R {
    match policy {
        UncheckedFailurePolicy::Abort => {
            tracing::error!(
                site = fault.site,
                message = %fault.message,
                "unchecked callback panicked; aborting"
            );
            eprintln!("seam: unchecked callback {fault}; aborting");
            std::process::abort()
        }
        UncheckedFailurePolicy::ReturnDefault => {
            tracing::warn!(
                site = fault.site,
                message = %fault.message,
                "unchecked callback panicked; returning default"
            );
            R::default()
        }
    }
}

/// Declare status-code types as checked callback returns.
///
/// A fault becomes `<T as BoundaryError>::PANIC`.
#[macro_export]
macro_rules! checked_status {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::CallbackReturn for $ty {
                const CHECKED: bool = true;

                fn on_fault(
                    _fault: &$crate::__core::Fault,
                    _policy: $crate::__core::UncheckedFailurePolicy,
                ) -> Self {
                    <$ty as $crate::__core::BoundaryError>::PANIC
                }
            }
        )*
    };
}

/// Declare `Default` types as unchecked callback returns.
#[macro_export]
macro_rules! unchecked_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::CallbackReturn for $ty {
                const CHECKED: bool = false;

                fn on_fault(
                    fault: &$crate::__core::Fault,
                    policy: $crate::__core::UncheckedFailurePolicy,
                ) -> Self {
                    $crate::returns::unchecked_fault(fault, policy)
                }
            }
        )*
    };
}

unchecked_return!((), u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, Bool, CChar);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Code {
        Null,
        Panic,
    }

    impl BoundaryError for Code {
        const PANIC: Self = Code::Panic;
        const NULL: Self = Code::Null;
    }

    fn fault() -> Fault {
        Fault {
            site: "test",
            message: "boom".to_string(),
        }
    }

    #[test]
    fn envelope_fault_is_panic_err() {
        assert!(<ResultEnvelope<u32, Code> as CallbackReturn>::CHECKED);
        let value = ResultEnvelope::<u32, Code>::on_fault(&fault(), UncheckedFailurePolicy::Abort);
        assert_eq!(value.into_result(), Err(Code::Panic));
        assert_eq!(Code::NULL, Code::Null);
    }

    #[test]
    fn raw_return_default_policy() {
        assert!(!<u32 as CallbackReturn>::CHECKED);
        let value = u32::on_fault(&fault(), UncheckedFailurePolicy::ReturnDefault);
        assert_eq!(value, 0);
        let flag = Bool::on_fault(&fault(), UncheckedFailurePolicy::ReturnDefault);
        assert!(!flag.is());
    }
}
