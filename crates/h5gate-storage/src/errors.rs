//! Error types for storage backends

use thiserror::Error;

/// Errors that can occur when writing to a storage backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// I/O error from the underlying storage
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be serialized
    #[error("Serialization error at '{path}': {message}")]
    Serialization { path: String, message: String },

    /// Path cannot be mapped onto the storage
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The object an operation addresses does not exist
    #[error("No object at '{path}'")]
    NotFound { path: String },

    /// An object already exists at the path
    #[error("Object already exists at '{path}'")]
    AlreadyExists { path: String },

    /// Write attempted after `finalize`
    #[error("Backend '{backend}' is already finalized")]
    Finalized { backend: String },
}

impl BackendError {
    /// Create a serialization error
    pub fn serialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an already-exists error
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create a finalized error
    pub fn finalized(backend: impl Into<String>) -> Self {
        Self::Finalized {
            backend: backend.into(),
        }
    }
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackendError::invalid_path("/a/../b", "parent components are not allowed");
        assert_eq!(
            err.to_string(),
            "Invalid path '/a/../b': parent components are not allowed"
        );

        let err = BackendError::finalized("directory");
        assert!(err.to_string().contains("already finalized"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BackendError = io.into();
        assert!(matches!(err, BackendError::Io(_)));
    }
}
