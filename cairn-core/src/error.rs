//! Error types for cairn.
//!
//! Provides structured errors with:
//! - Unique error codes for API responses
//! - Source error chaining
//! - Client vs server error categorization

use std::io;
use thiserror::Error;

/// Result type for cairn operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes for API responses.
///
/// Codes are structured as:
/// - 1xxx: Validation errors (client)
/// - 2xxx: Not found errors (client)
/// - 3xxx: Conflict errors (client)
/// - 5xxx: Storage errors (server)
/// - 6xxx: Internal errors (server)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Validation errors (1xxx)
    InvalidProof = 1001,
    TileHeightMismatch = 1002,
    InvalidConfig = 1003,
    InvalidHash = 1004,

    // Not found errors (2xxx)
    IndexOutOfRange = 2001,
    TileNotFound = 2002,
    StoreEmpty = 2003,

    // Conflict errors (3xxx)
    TileFull = 3001,
    TileExists = 3002,
    VersionChanged = 3003,

    // Storage errors (5xxx)
    StorageRead = 5001,
    StorageWrite = 5002,

    // Internal errors (6xxx)
    Serialization = 6001,
    InvariantViolated = 6002,
}

impl ErrorCode {
    /// Get the numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Check if this is a client error (4xx equivalent).
    pub fn is_client_error(self) -> bool {
        (1000..5000).contains(&self.code())
    }

    /// Check if this is a server error (5xx equivalent).
    pub fn is_server_error(self) -> bool {
        self.code() >= 5000
    }

    /// Check if this error is retryable.
    ///
    /// `VersionChanged` is the optimistic-concurrency loss signal: re-read
    /// the head and re-apply.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::VersionChanged | ErrorCode::StorageRead | ErrorCode::StorageWrite
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Errors that can occur in cairn.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================================================
    // Validation Errors (client errors)
    // ========================================================================
    /// Proof shape is inconsistent with the states it claims to relate.
    #[error("[{code}] invalid proof: {message}")]
    InvalidProof { code: ErrorCode, message: String },

    /// A loaded tile's header height differs from the configured height.
    #[error("[{code}] tile height mismatch: stored {stored}, configured {configured}")]
    TileHeightMismatch {
        code: ErrorCode,
        stored: u64,
        configured: u64,
    },

    /// Configuration validation failed.
    #[error("[{code}] invalid config: {message}")]
    InvalidConfig { code: ErrorCode, message: String },

    /// Invalid hash format or value.
    #[error("[{code}] invalid hash: {message}")]
    InvalidHash {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ========================================================================
    // Not Found Errors (client errors)
    // ========================================================================
    /// Node index outside the owned region of whatever holds the nodes
    /// (for a tile: not in its node slots and not among its ancestor
    /// peaks).
    #[error("[{code}] mmr index {index} out of range: {message}")]
    IndexOutOfRange {
        code: ErrorCode,
        index: u64,
        message: String,
    },

    /// The storage provider cannot locate a requested tile.
    #[error("[{code}] tile {id} not found")]
    NotFound { code: ErrorCode, id: u64 },

    /// The storage provider holds no tiles yet.
    #[error("[{code}] store is empty")]
    Empty { code: ErrorCode },

    // ========================================================================
    // Conflict Errors (client errors)
    // ========================================================================
    /// Append to a tile at leaf capacity. Recovered by the log
    /// orchestrator; never surfaced to callers of `TileLog::append`.
    #[error("[{code}] tile {id} is full")]
    TileFull { code: ErrorCode, id: u64 },

    /// The storage provider refused to create a duplicate tile.
    #[error("[{code}] tile {id} already exists")]
    Exists { code: ErrorCode, id: u64 },

    /// The storage provider refused a replace because the version is stale.
    #[error("[{code}] tile {id} changed: version {expected} is stale")]
    Changed {
        code: ErrorCode,
        id: u64,
        expected: u64,
    },

    // ========================================================================
    // Storage Errors (server errors)
    // ========================================================================
    /// Storage operation failed.
    #[error("[{code}] storage error: {message}")]
    Storage {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ========================================================================
    // Internal Errors (server errors)
    // ========================================================================
    /// Serialization/deserialization failed.
    #[error("[{code}] serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A structural invariant was violated; represents a bug.
    #[error("[{code}] invariant violated: {message}")]
    InvariantViolated { code: ErrorCode, message: String },
}

impl Error {
    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidProof { code, .. } => *code,
            Error::TileHeightMismatch { code, .. } => *code,
            Error::InvalidConfig { code, .. } => *code,
            Error::InvalidHash { code, .. } => *code,
            Error::IndexOutOfRange { code, .. } => *code,
            Error::NotFound { code, .. } => *code,
            Error::Empty { code } => *code,
            Error::TileFull { code, .. } => *code,
            Error::Exists { code, .. } => *code,
            Error::Changed { code, .. } => *code,
            Error::Storage { code, .. } => *code,
            Error::Serialization { code, .. } => *code,
            Error::InvariantViolated { code, .. } => *code,
        }
    }

    /// Check if this is a client error.
    pub fn is_client_error(&self) -> bool {
        self.code().is_client_error()
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        self.code().is_server_error()
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Check for the tile-at-capacity signal.
    pub fn is_tile_full(&self) -> bool {
        matches!(self, Error::TileFull { .. })
    }

    /// Check for the empty-store signal.
    pub fn is_empty_store(&self) -> bool {
        matches!(self, Error::Empty { .. })
    }

    /// Check for the optimistic-concurrency loss signal.
    pub fn is_changed(&self) -> bool {
        matches!(self, Error::Changed { .. })
    }

    /// Check for the missing-index signal.
    pub fn is_index_out_of_range(&self) -> bool {
        matches!(self, Error::IndexOutOfRange { .. })
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl Error {
    /// Create an InvalidProof error.
    pub fn invalid_proof(message: impl Into<String>) -> Self {
        Error::InvalidProof {
            code: ErrorCode::InvalidProof,
            message: message.into(),
        }
    }

    /// Create a TileHeightMismatch error.
    pub fn tile_height_mismatch(stored: u64, configured: u64) -> Self {
        Error::TileHeightMismatch {
            code: ErrorCode::TileHeightMismatch,
            stored,
            configured,
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            code: ErrorCode::InvalidConfig,
            message: message.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(message: impl Into<String>) -> Self {
        Error::InvalidHash {
            code: ErrorCode::InvalidHash,
            message: message.into(),
            source: None,
        }
    }

    /// Create an IndexOutOfRange error.
    pub fn index_out_of_range(index: u64, message: impl Into<String>) -> Self {
        Error::IndexOutOfRange {
            code: ErrorCode::IndexOutOfRange,
            index,
            message: message.into(),
        }
    }

    /// Create a NotFound error for a tile id.
    pub fn tile_not_found(id: u64) -> Self {
        Error::NotFound {
            code: ErrorCode::TileNotFound,
            id,
        }
    }

    /// Create an Empty error.
    pub fn empty() -> Self {
        Error::Empty {
            code: ErrorCode::StoreEmpty,
        }
    }

    /// Create a TileFull error.
    pub fn tile_full(id: u64) -> Self {
        Error::TileFull {
            code: ErrorCode::TileFull,
            id,
        }
    }

    /// Create an Exists error.
    pub fn tile_exists(id: u64) -> Self {
        Error::Exists {
            code: ErrorCode::TileExists,
            id,
        }
    }

    /// Create a Changed error.
    pub fn version_changed(id: u64, expected: u64) -> Self {
        Error::Changed {
            code: ErrorCode::VersionChanged,
            id,
            expected,
        }
    }

    /// Create a Storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            code: ErrorCode::StorageRead,
            message: message.into(),
            source: None,
        }
    }

    /// Create an InvariantViolated error.
    pub fn invariant_violated(message: impl Into<String>) -> Self {
        Error::InvariantViolated {
            code: ErrorCode::InvariantViolated,
            message: message.into(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Storage {
            code: ErrorCode::StorageRead,
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization {
            code: ErrorCode::Serialization,
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidHash {
            code: ErrorCode::InvalidHash,
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::InvalidProof.code(), 1001);
        assert_eq!(ErrorCode::IndexOutOfRange.code(), 2001);
        assert_eq!(ErrorCode::StorageRead.code(), 5001);
    }

    #[test]
    fn test_error_categorization() {
        assert!(ErrorCode::TileFull.is_client_error());
        assert!(!ErrorCode::TileFull.is_server_error());

        assert!(ErrorCode::StorageRead.is_server_error());
        assert!(!ErrorCode::StorageRead.is_client_error());
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::VersionChanged.is_retryable());
        assert!(ErrorCode::StorageWrite.is_retryable());
        assert!(!ErrorCode::TileHeightMismatch.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let e = Error::tile_height_mismatch(3, 14);
        assert!(e.to_string().contains("E1002"));
        assert!(e.to_string().contains("stored 3"));

        let e = Error::version_changed(7, 2);
        assert!(e.to_string().contains("E3003"));
        assert!(e.to_string().contains("tile 7"));
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::InvalidProof.to_string(), "E1001");
        assert_eq!(ErrorCode::InvariantViolated.to_string(), "E6002");
    }

    #[test]
    fn test_predicates() {
        assert!(Error::tile_full(0).is_tile_full());
        assert!(Error::empty().is_empty_store());
        assert!(Error::version_changed(1, 0).is_changed());
        assert!(Error::index_out_of_range(5, "tile 2").is_index_out_of_range());
        assert!(!Error::tile_not_found(9).is_tile_full());
    }

    #[test]
    fn test_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert_eq!(err.code(), ErrorCode::StorageRead);
        assert!(err.is_server_error());
    }
}
