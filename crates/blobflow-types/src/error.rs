use std::collections::TryReserveError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Failure taxonomy shared by every batch operation.
///
/// Most variants are per-item: they are attached to a single result slot and
/// the batch continues. `OutOfMemory` is the only one a batch call returns as
/// its own error.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchError {
    /// An allocation failed. Aborts the current call.
    #[error("not enough memory to complete the batch")]
    OutOfMemory,

    /// The object is missing from the store or is not a blob.
    #[error("object lookup failed")]
    Lookup,

    /// Diff precondition: one side is binary content.
    #[error("object is binary")]
    Binary,

    /// The caller-provided arena cannot hold the object.
    #[error("arena capacity exhausted")]
    ArenaFull,

    /// The line-diff primitive produced output that could not be encoded.
    #[error("line diff computation failed")]
    DiffCompute,
}

impl From<TryReserveError> for BatchError {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// Result alias for batch calls.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_failure_maps_to_out_of_memory() {
        let mut buf: Vec<u8> = Vec::new();
        let err = buf.try_reserve_exact(usize::MAX).unwrap_err();
        assert_eq!(BatchError::from(err), BatchError::OutOfMemory);
    }

    #[test]
    fn display_messages() {
        assert_eq!(BatchError::Lookup.to_string(), "object lookup failed");
        assert_eq!(BatchError::ArenaFull.to_string(), "arena capacity exhausted");
    }
}
