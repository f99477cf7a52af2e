//! Batch diff engine for blobflow.
//!
//! Computes run-length encoded line diffs for many blob pairs per call,
//! fetching each referenced blob once.
//!
//! # Key Types
//!
//! - [`DiffEngine`] / [`DiffRequest`] / [`DiffResult`] -- batch diffing with a per-call preload set
//! - [`RunEncoder`] / [`DiffOp`] -- coalescing of line classifications into runs
//! - [`PreloadSet`] -- unique blobs of one batch, looked up by binary search
//! - [`DiffConfig`] -- run cap, algorithm, and deadline

pub mod config;
pub mod encoder;
pub mod engine;
pub mod preload;

pub use config::{DiffAlgorithm, DiffConfig, CONTEXT_LINES, DEFAULT_MAX_OPS};
pub use encoder::{diff_lines, DiffOp, DiffOpKind, EncodedRuns, LineDiff, RunEncoder, TextInput};
pub use engine::{DiffBatch, DiffEngine, DiffRequest, DiffResult, DiffSide};
pub use preload::{PreloadSet, PreloadedObject};
