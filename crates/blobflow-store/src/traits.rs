use blobflow_types::ObjectId;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};

/// Read handle onto an object store.
///
/// A handle is opened once per batch and shared by every worker of that
/// batch, so implementations must tolerate concurrent `read` calls. Dropping
/// the handle releases it.
pub trait ObjectReader: Send + Sync {
    /// Pick up objects written since the handle was opened (new packs, loose
    /// objects). Called once per batch, never per item.
    fn refresh(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Read an object and require it to be a blob.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Bytes> {
        let object = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        if object.kind != ObjectKind::Blob {
            return Err(StoreError::UnexpectedKind {
                id: *id,
                expected: ObjectKind::Blob,
                actual: object.kind,
            });
        }
        Ok(object.data)
    }
}

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Content-addressing guarantees this:
///   the same data always produces the same ID.
/// - Concurrent reads are always safe (objects are immutable).
/// - The store never interprets object contents: it is a pure key-value store.
pub trait ObjectStore: Send + Sync {
    /// Acquire a read handle.
    fn open(&self) -> StoreResult<Box<dyn ObjectReader + '_>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;
}
