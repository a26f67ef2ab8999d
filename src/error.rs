//! Error types for workshop-dl
//!
//! Only [`Error::Authentication`] and [`Error::ProcessTimeout`] abort a batch
//! (see [`Error::is_batch_fatal`]). Per-item fetch failures are
//! returned as data by the reconciler, and install failures are caught per
//! item and reported separately.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for workshop-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for workshop-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "patterns.item_failure")
        key: Option<String>,
    },

    /// SteamCMD reported that the login step failed
    ///
    /// Fatal to the whole batch: no item can have been fetched after a failed
    /// login, so the batch must be re-run with corrected credentials.
    #[error("steam login failed: {reason}")]
    Authentication {
        /// The reason captured from the login failure line (e.g., "Invalid Password")
        reason: String,
    },

    /// No output line arrived from the external tool within the read timeout
    #[error("no output from external tool for {timeout:?}")]
    ProcessTimeout {
        /// The configured read timeout that elapsed
        timeout: Duration,
    },

    /// The exported modpack or retry manifest could not be turned into a catalog
    #[error("invalid mod list: {0}")]
    CatalogParse(String),

    /// Local installation of a single mod failed
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    /// External tool execution failed (steamcmd, arma3server)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A server config name that would escape the configs directory
    #[error("invalid config name: {0:?}")]
    InvalidConfigName(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error invalidates the whole batch rather than a single item
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::ProcessTimeout { .. })
    }
}

/// Local installation errors
#[derive(Debug, Error)]
pub enum InstallError {
    /// Two entries in the same directory map to the same lowercase name
    #[error("{first} and {second} collide after lowercasing")]
    NameCollision {
        /// The entry that already carries the lowercase name
        first: PathBuf,
        /// The entry that would be renamed onto it
        second: PathBuf,
    },

    /// Copying or moving the staged tree failed
    #[error("failed to copy {source_path} to {dest_path}: {reason}")]
    CopyFailed {
        /// The source path being copied
        source_path: PathBuf,
        /// The destination path
        dest_path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// Removing the previous install failed
    #[error("failed to remove previous install at {path}: {reason}")]
    RemoveFailed {
        /// The install directory that could not be removed
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },

    /// Renaming an entry to its lowercase form failed
    #[error("failed to rename {path}: {reason}")]
    RenameFailed {
        /// The entry that could not be renamed
        path: PathBuf,
        /// The underlying reason
        reason: String,
    },
}
