//! Error types for AtlasBlob
//!
//! Provides a unified error type for all operations, plus the translation of
//! storage-medium errors into the object error taxonomy.

use std::io;

use thiserror::Error;

/// Result type alias using BlobError
pub type Result<T> = std::result::Result<T, BlobError>;

/// Unified error type for AtlasBlob operations
#[derive(Debug, Error)]
pub enum BlobError {
    // -------------------------------------------------------------------------
    // Object Errors
    // -------------------------------------------------------------------------
    #[error("Operation not supported")]
    Unsupported,

    #[error("Access denied to server")]
    AccessDenied,

    #[error("Disk failure: {0}")]
    IoFailure(#[source] io::Error),

    #[error("Object already exists")]
    AlreadyExists,

    #[error("Object not found")]
    NotFound,

    #[error("Busy being deleted")]
    Busy,

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    // -------------------------------------------------------------------------
    // I/O Errors (unrecognized, passed through unchanged)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`BlobError`], consumed by transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unsupported,
    AccessDenied,
    IoFailure,
    AlreadyExists,
    NotFound,
    Busy,
    BadRequest,
    Unknown,
}

impl ErrorKind {
    /// Short machine-readable reason tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unsupported => "not_supported",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::IoFailure => "disk_failure",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Busy => "being_deleted",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Unknown => "unknown_error",
        }
    }
}

impl BlobError {
    /// Translate a storage-medium error into the object error taxonomy.
    ///
    /// Errors without a counterpart pass through as [`BlobError::Io`].
    pub fn translate(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::EIO) => return BlobError::IoFailure(err),
            Some(libc::ENOTDIR) | Some(libc::EISDIR) => return BlobError::AccessDenied,
            _ => {}
        }

        match err.kind() {
            io::ErrorKind::AlreadyExists => BlobError::AlreadyExists,
            io::ErrorKind::NotFound => BlobError::NotFound,
            io::ErrorKind::PermissionDenied => BlobError::AccessDenied,
            _ => BlobError::Io(err),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobError::Unsupported => ErrorKind::Unsupported,
            BlobError::AccessDenied => ErrorKind::AccessDenied,
            BlobError::IoFailure(_) => ErrorKind::IoFailure,
            BlobError::AlreadyExists => ErrorKind::AlreadyExists,
            BlobError::NotFound => ErrorKind::NotFound,
            BlobError::Busy => ErrorKind::Busy,
            BlobError::InvalidObjectId(_) | BlobError::Protocol(_) => ErrorKind::BadRequest,
            BlobError::Io(_) | BlobError::Network(_) | BlobError::Config(_) => ErrorKind::Unknown,
        }
    }

    /// Whether a caller may retry after a short wait
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlobError::Busy)
    }
}
