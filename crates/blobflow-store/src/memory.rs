use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use blobflow_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::{ObjectReader, ObjectStore};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock`;
/// reads hand out reference-counted views of the stored bytes. The store
/// counts reads and refreshes so callers can check how many lookups a batch
/// actually performed.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    reads: AtomicUsize,
    refreshes: AtomicUsize,
    available: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            reads: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Number of `read` calls served through handles since the last reset.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of `refresh` calls since the last reset.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Zero the read and refresh counters.
    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.refreshes.store(0, Ordering::Relaxed);
    }

    /// Toggle whether `open` succeeds. An unavailable store refuses handles,
    /// the way a repository with a broken object database would.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn open(&self) -> StoreResult<Box<dyn ObjectReader + '_>> {
        if !self.available.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("in-memory store marked offline".into()));
        }
        Ok(Box::new(MemoryReader { store: self }))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .field("reads", &self.read_count())
            .finish()
    }
}

/// Read handle borrowing an [`InMemoryObjectStore`].
struct MemoryReader<'s> {
    store: &'s InMemoryObjectStore,
}

impl ObjectReader for MemoryReader<'_> {
    fn refresh(&self) -> StoreResult<()> {
        self.store.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        self.store.reads.fetch_add(1, Ordering::Relaxed);
        let map = self.store.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }
}
