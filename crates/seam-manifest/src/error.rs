//! Manifest error types.

/// Errors that can occur while reading signature manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// A kind string could not be parsed.
    #[error("invalid kind: {detail}")]
    InvalidKind { detail: String },

    /// A compact signature string could not be parsed.
    #[error("invalid signature: {detail}")]
    InvalidSignature { detail: String },

    /// The manifest is structurally valid TOML but semantically wrong.
    #[error("invalid manifest: {detail}")]
    InvalidManifest { detail: String },

    /// A struct name was referenced but never declared.
    #[error("unknown struct '{name}'")]
    UnknownStruct { name: String },

    /// A struct cannot be laid out.
    #[error("cannot lay out struct '{name}': {detail}")]
    Layout { name: String, detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
