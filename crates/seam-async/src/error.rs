//! Async bridge error types.

/// Ways a ticket can resolve without the value its operation produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsyncError {
    /// The completer was dropped before completing, usually because the
    /// native job panicked.
    #[error("ticket abandoned: the operation ended without completing it")]
    Abandoned,

    /// The result was already taken through `try_take` or a previous poll.
    #[error("ticket result already taken")]
    AlreadyTaken,

    /// The executor no longer accepts jobs.
    #[error("executor has shut down")]
    ShutDown,

    /// A worker thread could not be started.
    #[error("failed to start worker thread {name}: {detail}")]
    Spawn { name: String, detail: String },

    /// Invalid executor settings.
    #[error("invalid executor configuration: {detail}")]
    Config { detail: String },
}

/// Result type alias for async bridge operations.
pub type Result<T> = std::result::Result<T, AsyncError>;
