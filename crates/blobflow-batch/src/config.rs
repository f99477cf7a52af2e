use blobflow_diff::DiffConfig;
use serde::{Deserialize, Serialize};

/// Batches smaller than this run on the calling thread.
pub const DEFAULT_PARALLEL_MIN_BATCH: usize = 8;

const MAX_DEFAULT_WORKERS: usize = 16;

pub const DEFAULT_BLOB_BATCH_SIZE: usize = 100;
pub const DEFAULT_DIFF_BATCH_SIZE: usize = 50;

/// Configuration for the batch blob loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Minimum batch size before fetch work is spread across workers.
    pub parallel_min_batch: usize,
    /// Upper bound on worker threads per batch. `1` disables parallelism.
    pub workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            parallel_min_batch: DEFAULT_PARALLEL_MIN_BATCH,
            workers: default_workers(),
        }
    }
}

impl LoaderConfig {
    /// A loader that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            ..Default::default()
        }
    }

    /// Whether a batch of `len` items should fan out.
    pub fn is_parallel(&self, len: usize) -> bool {
        self.workers > 1 && len >= self.parallel_min_batch
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_WORKERS)
}

/// Chunking and engine settings for [`BatchProcessor`](crate::BatchProcessor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Blobs loaded per call when chunking large id lists.
    pub blob_batch_size: usize,
    /// Diff requests per call when chunking large request lists.
    pub diff_batch_size: usize,
    pub loader: LoaderConfig,
    pub diff: DiffConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            blob_batch_size: DEFAULT_BLOB_BATCH_SIZE,
            diff_batch_size: DEFAULT_DIFF_BATCH_SIZE,
            loader: LoaderConfig::default(),
            diff: DiffConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Ids per loader call. Zero means the default.
    pub fn blob_chunk_len(&self) -> usize {
        match self.blob_batch_size {
            0 => DEFAULT_BLOB_BATCH_SIZE,
            n => n,
        }
    }

    /// Requests per engine call. Zero means the default.
    pub fn diff_chunk_len(&self) -> usize {
        match self.diff_batch_size {
            0 => DEFAULT_DIFF_BATCH_SIZE,
            n => n,
        }
    }
}
