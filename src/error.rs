//! Error types for the invoicing engine.

use std::fmt;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the invoicing engine.
///
/// All fallible operations return `Result<T>` where `Result` is defined as `std::result::Result<T, Error>`.
/// Different error variants represent different failure modes:
#[derive(Debug, Clone)]
pub enum Error {
    /// Caller-supplied data failed a precondition check.
    ///
    /// This is raised at the form boundary, before any repository mutation runs.
    /// Common causes:
    /// - Missing required field (customer name, email)
    /// - Due date before issue date
    /// - Line item with zero quantity or negative rate
    ///
    /// The repository itself never re-validates business rules.
    Validation(String),

    /// Operation referenced an invoice id absent from the set.
    ///
    /// Raised by status updates, deletes and duplications when the id does not
    /// resolve. Selection lookups are exempt: a dangling selection resolves to
    /// `None`, never to this error.
    NotFound(String),

    /// Underlying key-value store read or write failed.
    ///
    /// Common causes:
    /// - Storage quota exhausted
    /// - Store handle torn down mid-operation
    ///
    /// **Recovery:** The in-memory set is rolled back; retry the mutation once
    /// the store is available again.
    Persistence(String),

    /// Serialization failed when encoding the invoice set for storage.
    ///
    /// This occurs when the `Serde` implementation fails while building the
    /// persisted document.
    Serialization(String),

    /// Deserialization failed when decoding a persisted document.
    ///
    /// This indicates corrupted or malformed data in the store.
    /// Common causes:
    /// - Store was edited out-of-band
    /// - Truncated write from an earlier crash
    ///
    /// **Recovery:** Inspect the stored value; the engine never silently
    /// resets a corrupt set to empty.
    Deserialization(String),

    /// Schema version mismatch between code and the persisted document.
    ///
    /// Raised when the stored document was written by a different engine
    /// version than the one loading it.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from the stored document)
        found: u32,
    },

    /// Generic error with custom message.
    ///
    /// Used for errors that don't fit into other variants.
    Unexpected(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Document version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::Unexpected(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Persistence(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Serialization(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Unexpected(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Unexpected(e.to_string())
    }
}
