//! Reference native library.
//!
//! Exports one function per boundary pattern, with `extern "C"` and
//! `#[no_mangle]`, so the runtime can be exercised end to end from Rust
//! tests and from any C-compatible caller. `seam_reference.seam.toml`
//! describes the exports as a signature manifest.
//!
//! ## Modules
//!
//! - [`types`]: `ErrorCode`, `Vec3f32`, `EnumPayload`
//! - [`primitives`]: Scalar echo exports
//! - [`slices`]: View exports, including views handed to callbacks
//! - [`resources`]: Owned buffer and string exports
//! - [`callbacks`]: Checked and unchecked callback exports
//! - [`services`]: `ServiceResult`, `ServiceSlices` and `ServiceAsync` handle services

pub mod callbacks;
pub mod primitives;
pub mod resources;
pub mod services;
pub mod slices;
pub mod types;

pub use callbacks::{SumChecked, SumUnchecked, ValueCallback};
pub use services::{AsyncU64, ServiceAsync, ServiceResult, ServiceSlices};
pub use slices::{ByteCallback, SliceCallback};
pub use types::{EnumPayload, ErrorCode, Vec3f32};

/// Signature manifest describing this library's exports.
pub const MANIFEST: &str = include_str!("../seam_reference.seam.toml");
