//! Foundation types for blobflow.
//!
//! This crate provides the identifier, classification, and error types shared
//! by the store, loader, and diff crates. Every other blobflow crate depends
//! on `blobflow-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- 20-byte content-addressed identifier
//! - [`IndexedId`] -- identifier tagged with its request position
//! - [`Classification`] -- binary flag and line count for a buffer
//! - [`BatchError`] -- per-item and per-call failure taxonomy

pub mod classify;
pub mod error;
pub mod object;
pub mod sort;

pub use classify::{classify, count_lines, is_binary, Classification, BINARY_CHECK_LEN};
pub use error::{BatchError, BatchResult, TypeError};
pub use object::{ObjectId, OID_LEN};
pub use sort::{find_sorted, locality_order, sort_indexed, unique_sorted, IndexedId};
