//! Error types for the node loader

use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can escape the node loader
///
/// Problems inside individual node modules never show up here; they are
/// recorded as [`LoadError`](crate::nodes::LoadError)s on the scan report.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The process-wide registry was already installed
    #[error("node registry already installed")]
    RegistryInstalled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
