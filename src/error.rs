//! Error types for the translation registry
//!
//! This module defines all custom error types used throughout the crate.
//! Error types are organized by category: storage failures are caller-visible,
//! load failures travel inside the shared load future, and lookup misses are
//! never errors at all (they resolve to `None`).

use std::path::PathBuf;
use thiserror::Error;

/// Main registry error type encompassing all error categories
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Persistence backend errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Bundle loading errors
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A lookup was requested but no load exists and none can be started
    #[error("Translation registry is not configured (missing locale, source or setup)")]
    NotConfigured,
}

/// Persistence backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reading a stored value
    #[error("Could not read stored value: {key}")]
    ReadError {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing a stored value
    #[error("Could not write stored value: {key}")]
    WriteError {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored text is not a valid configuration
    #[error("Invalid persisted configuration under {key}: {source}")]
    ParseError {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be serialized
    #[error("Could not serialize configuration: {0}")]
    SerializeError(#[source] serde_json::Error),

    /// Key cannot be used by the backend
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Could not load configuration: {path}")]
    LoadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing the configuration file
    #[error("Could not save configuration: {path}")]
    SaveError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON
    #[error("Invalid configuration format in {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be serialized
    #[error("Could not serialize configuration: {0}")]
    SerializeError(#[source] serde_json::Error),

    /// Configuration directory error
    #[error("Could not access data directory")]
    DirectoryError,
}

/// Storage descriptor errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Descriptor does not look like `durable[key]` or `session[key]`
    #[error("Unrecognized storage descriptor: {0:?}")]
    Unrecognized(String),
}

/// Bundle loading errors
///
/// Cloneable because a single load is shared by every pending lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Network or transport failure
    #[error("Could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Server answered with a non-success status
    #[error("Fetching {url} returned HTTP status {status}")]
    Status { url: String, status: u16 },

    /// Response body is not a JSON object
    #[error("Invalid translation bundle from {url}: {reason}")]
    InvalidBundle { url: String, reason: String },

    /// The load task ended before producing a result
    #[error("Translation load was aborted: {0}")]
    Aborted(String),
}

/// Result type alias for operations that can fail with RegistryError
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for configuration file operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for bundle loads
pub type LoadResult<T> = Result<T, LoadError>;

impl LoadError {
    /// URL of the failed load, when known
    pub fn url(&self) -> Option<&str> {
        match self {
            LoadError::Fetch { url, .. }
            | LoadError::Status { url, .. }
            | LoadError::InvalidBundle { url, .. } => Some(url),
            LoadError::Aborted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::InvalidKey("../etc".to_string());
        assert!(err.to_string().contains("../etc"));
    }

    #[test]
    fn test_registry_error_from_load_error() {
        let load_err = LoadError::Status {
            url: "/i18n/en.json".to_string(),
            status: 404,
        };
        let err: RegistryError = load_err.into();
        assert!(matches!(err, RegistryError::Load(_)));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_load_error_url() {
        let err = LoadError::Fetch {
            url: "/i18n/fr.json".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.url(), Some("/i18n/fr.json"));
        assert_eq!(LoadError::Aborted("cancelled".to_string()).url(), None);
    }

    #[test]
    fn test_parse_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StorageError::ParseError {
            key: "app.i18n".to_string(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("app.i18n"));
    }
}
