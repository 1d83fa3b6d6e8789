//! Bidirectional callbacks across the Seam boundary.
//!
//! A callback token is a C-compatible `{fn, context, release}` triple. Native
//! code may invoke it any number of times, from any thread, until the context
//! is released. Rust closures are registered behind a trampoline that guards
//! every invocation: a panic never unwinds into native frames.
//!
//! ## Modules
//!
//! - [`token`]: `callback!` token declarations and the `CallbackToken` trait
//! - [`registration`]: Context ownership and invocation statistics
//! - [`returns`]: Checked and unchecked return discipline
//! - [`context`]: Per-registration state behind the context pointer
//! - [`async_callback`]: One-shot completion tokens

pub mod async_callback;
pub mod context;
pub mod registration;
pub mod returns;
pub mod token;

pub use async_callback::AsyncCallback;
pub use context::{CallbackState, CallbackStats};
#[doc(hidden)]
pub use context::Context;
pub use registration::Registration;
pub use returns::CallbackReturn;
pub use token::CallbackToken;

#[doc(hidden)]
pub use seam_core as __core;

/// Policy applied to unchecked callbacks registered without an explicit one.
pub fn default_policy() -> seam_core::UncheckedFailurePolicy {
    seam_core::config::current().callbacks.unchecked_failure
}
