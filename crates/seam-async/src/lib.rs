//! Asynchronous operations across the Seam boundary.
//!
//! Starting an async operation returns an [`AsyncTicket`] at once and
//! schedules the work on the native [`Executor`]. The caller awaits the
//! ticket as a `Future` or blocks on it; tickets are independent and may
//! complete in any order.
//!
//! ## Modules
//!
//! - [`ticket`]: `AsyncTicket` / `Completer` pairs
//! - [`executor`]: Named worker pool fed by a channel
//! - [`error`]: `AsyncError`

pub mod error;
pub mod executor;
pub mod ticket;

pub use error::AsyncError;
pub use executor::Executor;
pub use ticket::{ticket, AsyncTicket, Completer};
