use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound on runs kept per diff result.
pub const DEFAULT_MAX_OPS: usize = 100_000;

/// Unchanged lines kept around each change when grouping into hunks.
pub const CONTEXT_LINES: usize = 3;

/// Line-diff algorithm used by the primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl From<DiffAlgorithm> for similar::Algorithm {
    fn from(algorithm: DiffAlgorithm) -> Self {
        match algorithm {
            DiffAlgorithm::Myers => similar::Algorithm::Myers,
            DiffAlgorithm::Patience => similar::Algorithm::Patience,
            DiffAlgorithm::Lcs => similar::Algorithm::Lcs,
        }
    }
}

/// Configuration for the batch diff engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Maximum runs per result. Runs past this are dropped and the result is
    /// flagged `truncated`.
    pub max_ops: usize,
    /// Algorithm used for the line-level diff.
    pub algorithm: DiffAlgorithm,
    /// Optional per-pair deadline. When it passes, the primitive returns a
    /// coarser (still valid) diff instead of an optimal one.
    pub timeout: Option<Duration>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_ops: DEFAULT_MAX_OPS,
            algorithm: DiffAlgorithm::Myers,
            timeout: None,
        }
    }
}
