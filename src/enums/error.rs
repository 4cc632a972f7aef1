//! # Error Module - Custom *colbridge* Error Type
//!
//! Defines the unified error type for the crate.
//!
//! ## Features
//! - Covers allocation exhaustion, invalid builder construction, schema
//!   mismatches, released-handle misuse, malformed foreign data and
//!   errors reported by external collaborators.
//! - Every variant maps onto the closed [`StatusCode`] enumeration, which is
//!   what crosses the C boundary.

use thiserror::Error;

use crate::enums::status::StatusCode;

/// Catch all error type for `colbridge`
#[derive(Debug, Error)]
pub enum BridgeError {
    /// An allocation would exceed the memory pool limit, or an offset
    /// would no longer fit its integer width.
    #[error(
        "Resource exhausted: requested {requested} bytes with {allocated} of {limit} bytes in use."
    )]
    ResourceExhausted {
        requested: usize,
        allocated: usize,
        limit: usize,
    },

    #[error("Invalid construction: {0}")]
    InvalidConstruction(String),

    #[error("Schema mismatch at '{path}': expected {expected}, found {found}.")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Use of a handle after it was released or moved from.
    #[error("Handle already released: {0}")]
    Released(&'static str),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by an external collaborator, e.g. a database driver.
    #[error("{code}: {message}")]
    External { code: StatusCode, message: String },
}

impl BridgeError {
    /// Collapses the error onto the boundary status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::ResourceExhausted { .. } => StatusCode::Internal,
            BridgeError::InvalidConstruction(_) => StatusCode::InvalidState,
            BridgeError::SchemaMismatch { .. } => StatusCode::InvalidData,
            BridgeError::Released(_) => StatusCode::InvalidState,
            BridgeError::InvalidState(_) => StatusCode::InvalidState,
            BridgeError::InvalidArgument(_) => StatusCode::InvalidArgument,
            BridgeError::InvalidData(_) => StatusCode::InvalidData,
            BridgeError::NotImplemented(_) => StatusCode::NotImplemented,
            BridgeError::NotFound(_) => StatusCode::NotFound,
            BridgeError::Io(_) => StatusCode::Io,
            BridgeError::External { code, .. } => *code,
        }
    }

    pub(crate) fn schema_mismatch(
        path: &str,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        BridgeError::SchemaMismatch {
            path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = BridgeError::ResourceExhausted { requested: 64, allocated: 0, limit: 32 };
        assert_eq!(err.status_code(), StatusCode::Internal);
        assert_eq!(
            BridgeError::schema_mismatch("id", "Int64", "Int32").status_code(),
            StatusCode::InvalidData
        );
        assert_eq!(BridgeError::Released("array").status_code(), StatusCode::InvalidState);
        let ext = BridgeError::External { code: StatusCode::Timeout, message: "slow".into() };
        assert_eq!(ext.status_code(), StatusCode::Timeout);
    }

    #[test]
    fn test_messages_are_readable() {
        let err = BridgeError::schema_mismatch("", "Struct", "Int32");
        assert_eq!(
            err.to_string(),
            "Schema mismatch at '<root>': expected Struct, found Int32."
        );
        let io: BridgeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.status_code(), StatusCode::Io);
        assert!(io.to_string().contains("gone"));
    }
}
