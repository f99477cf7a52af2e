//! Object store capability consumed by blobflow.
//!
//! blobflow never implements pack reading or decompression itself. It reads
//! through an [`ObjectReader`] handle opened from an [`ObjectStore`], once per
//! batch, and treats the handle as safe for concurrent reads.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding,
//!   with read/refresh counters
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads through one handle are always safe.
//! 3. Reads hand out shared `Bytes`; the store's memory is never copied by a read.
//! 4. Only blobs are readable through [`ObjectReader::read_blob`]; any other
//!    kind is an error.

pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::{ObjectKind, StoredObject};
pub use traits::{ObjectReader, ObjectStore};
