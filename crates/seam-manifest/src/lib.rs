//! Signature descriptors for Seam native libraries.
//!
//! A manifest describes, per exported function, the ordered parameter kinds
//! and the return kind. The descriptors are used only to choose how each
//! position crosses the boundary, and to lay out structs passed by value.
//!
//! ## Modules
//!
//! - [`kind`]: `ParamKind` / `ReturnKind` and their compact string form
//! - [`signature`]: Signature descriptors and call plans
//! - [`marshal`]: Marshal path selection
//! - [`layout`]: C struct layout computation
//! - [`declaration`]: TOML manifest parsing

pub mod declaration;
pub mod error;
pub mod kind;
pub mod layout;
pub mod marshal;
pub mod signature;

// Re-export key types for convenience
pub use declaration::Manifest;
pub use error::ManifestError;
pub use kind::{ParamKind, ReturnKind};
pub use layout::{StructLayout, TypeSize};
pub use marshal::{select_path, MarshalPath};
pub use signature::{CallPlan, Signature};
