//! CLI command implementations.

pub mod bench;
pub mod doctor;
pub mod harness;
pub mod inspect;
pub mod layout;
