//! Batch blob loading for blobflow.
//!
//! [`BlobLoader`] fetches many blobs per call from an
//! [`ObjectStore`](blobflow_store::ObjectStore), walking ids in ascending
//! order for store locality and returning results in request order. Three
//! output shapes are offered:
//!
//! - [`BlobLoader::load_many`] -- one owned buffer per blob
//! - [`BlobLoader::load_many_packed`] -- one exactly-sized arena for the batch
//! - [`BlobLoader::load_many_into_arena`] -- a caller-owned, fixed-capacity arena
//!
//! [`BatchProcessor`] splits large inputs into chunks and drives both the
//! loader and the [`DiffEngine`](blobflow_diff::DiffEngine).

pub mod config;
pub mod loader;
pub mod pool;
pub mod processor;
pub mod result;

pub use config::{
    BatchConfig, LoaderConfig, DEFAULT_BLOB_BATCH_SIZE, DEFAULT_DIFF_BATCH_SIZE,
    DEFAULT_PARALLEL_MIN_BATCH,
};
pub use loader::BlobLoader;
pub use pool::fan_out;
pub use processor::{BatchProcessor, BlobChunk, Change, ChangeAction, DiffChunk};
pub use result::{ArenaLoad, BlobResult, LoadReport, PackedBlobResult, PackedBlobs};
