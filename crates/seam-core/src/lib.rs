//! Boundary primitives for the Seam runtime.
//!
//! Everything that crosses the boundary between a native shared library and
//! its caller is expressed with the types in this crate: scalars pass by
//! value, memory is either borrowed through a view or owned and released
//! exactly once, and fallible outcomes travel as tagged envelopes.
//!
//! ## Modules
//!
//! - [`primitive`]: Fixed-width scalars, boundary-safe `Bool` and `CChar`
//! - [`view`]: Non-owning `Slice` / `SliceMut` views
//! - [`owned`]: Owned buffers and strings with a carried destructor
//! - [`handle`]: Opaque handles to native state and the service status shape
//! - [`ledger`]: Live-allocation ledger and per-thread counters
//! - [`envelope`]: `ResultEnvelope` / `OptionEnvelope` and `BoundaryError`
//! - [`protocol`]: Protocol violations and the thread-scoped harness mode
//! - [`guard`]: Panic guards for native exports
//! - [`config`]: `seam.toml` configuration
//! - [`calibration`]: Process-wide measurement baseline

pub mod calibration;
pub mod config;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod handle;
pub mod ledger;
pub mod owned;
pub mod primitive;
pub mod protocol;
pub mod view;

// Re-export key types for convenience
pub use config::{BridgeConfig, UncheckedFailurePolicy};
pub use envelope::{BoundaryError, OptionEnvelope, ResultEnvelope, StatusCode, UnwrapError};
pub use error::CoreError;
pub use guard::Fault;
pub use handle::Handle;
pub use owned::{OwnedBuffer, OwnedString, RawBuffer};
pub use primitive::{Bool, CChar, Primitive, PrimitiveKind};
pub use protocol::{FatalViolation, ProtocolViolation};
pub use view::{Slice, SliceMut};
