//! Marshal path selection.
//!
//! A signature descriptor is used only to decide how each position crosses
//! the boundary. Every kind maps to exactly one [`MarshalPath`].

use std::fmt;

use crate::kind::{ParamKind, ReturnKind};

/// How a value crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarshalPath {
    /// Bit-for-bit by value (primitives, `repr(C)` structs, unit).
    Direct,
    /// `{ptr, len}` read-only view, valid for the call.
    View,
    /// `{ptr, len}` exclusive mutable view, valid for the call.
    ViewMut,
    /// `{ptr, len, capacity, release}`; the receiver releases exactly once.
    TransferOwnership,
    /// Opaque pointer to native state, released through the service destructor.
    OpaqueHandle,
    /// `{fn, context, release}` token invoked behind a boundary guard.
    GuardedCallback,
    /// Tagged result or option envelope.
    Envelope,
    /// Async ticket completed by the native executor.
    Ticket,
}

impl MarshalPath {
    pub fn name(self) -> &'static str {
        match self {
            MarshalPath::Direct => "direct",
            MarshalPath::View => "view",
            MarshalPath::ViewMut => "view-mut",
            MarshalPath::TransferOwnership => "transfer-ownership",
            MarshalPath::OpaqueHandle => "opaque-handle",
            MarshalPath::GuardedCallback => "guarded-callback",
            MarshalPath::Envelope => "envelope",
            MarshalPath::Ticket => "ticket",
        }
    }
}

impl fmt::Display for MarshalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Select the marshal path for a kind.
pub fn select_path(kind: &ParamKind) -> MarshalPath {
    match kind {
        ParamKind::Unit | ParamKind::Primitive(_) | ParamKind::Struct(_) => MarshalPath::Direct,
        ParamKind::View { mutable: false, .. } => MarshalPath::View,
        ParamKind::View { mutable: true, .. } => MarshalPath::ViewMut,
        ParamKind::OwnedString | ParamKind::OwnedBuffer => MarshalPath::TransferOwnership,
        ParamKind::Handle(_) => MarshalPath::OpaqueHandle,
        ParamKind::Callback { .. } => MarshalPath::GuardedCallback,
        ParamKind::Result(_) | ParamKind::Option(_) => MarshalPath::Envelope,
        ParamKind::Async(_) => MarshalPath::Ticket,
    }
}

pub fn select_return_path(kind: &ReturnKind) -> MarshalPath {
    match kind {
        ReturnKind::Unit => MarshalPath::Direct,
        ReturnKind::Value(kind) => select_path(kind),
    }
}

/// What a caller-side failure inside a callback turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFailure {
    /// Converted to `Err(PANIC)`; native cleanup after the callback runs.
    ObservedAsErr,
    /// Not observable by the native side; handled by the unchecked policy.
    Unobservable,
}

/// The failure discipline of a callback kind, `None` for other kinds.
pub fn callback_failure(kind: &ParamKind) -> Option<CallbackFailure> {
    match kind {
        ParamKind::Callback { checked: true } => Some(CallbackFailure::ObservedAsErr),
        ParamKind::Callback { checked: false } => Some(CallbackFailure::Unobservable),
        _ => None,
    }
}
