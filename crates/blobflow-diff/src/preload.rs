//! Per-batch cache of the blobs referenced by a set of diff requests.

use blobflow_store::ObjectReader;
use blobflow_types::{classify, find_sorted, unique_sorted, BatchResult, Classification, ObjectId};
use bytes::Bytes;

use crate::engine::{DiffRequest, DiffSide};

/// A blob fetched once for a whole diff batch.
#[derive(Clone, Debug)]
pub struct PreloadedObject {
    pub id: ObjectId,
    /// Shared view of the store's bytes; empty when `valid` is false.
    pub bytes: Bytes,
    pub is_binary: bool,
    pub line_count: usize,
    /// `false` when the lookup failed or the object is not a blob.
    pub valid: bool,
}

impl PreloadedObject {
    fn fetch(reader: &dyn ObjectReader, id: ObjectId) -> Self {
        match reader.read_blob(&id) {
            Ok(bytes) => {
                let Classification {
                    is_binary,
                    line_count,
                } = classify(&bytes);
                Self {
                    id,
                    bytes,
                    is_binary,
                    line_count,
                    valid: true,
                }
            }
            Err(err) => {
                tracing::trace!(id = %id, error = %err, "preload lookup failed");
                Self {
                    id,
                    bytes: Bytes::new(),
                    is_binary: false,
                    line_count: 0,
                    valid: false,
                }
            }
        }
    }

    pub fn classification(&self) -> Classification {
        Classification {
            is_binary: self.is_binary,
            line_count: self.line_count,
        }
    }
}

/// Unique blobs of one diff batch, sorted by id.
///
/// Built at the start of a batch and dropped at its end; lookups borrow from
/// the set, so nothing resolved through it can outlive the batch.
#[derive(Debug, Default)]
pub struct PreloadSet {
    ids: Vec<ObjectId>,
    objects: Vec<PreloadedObject>,
}

impl PreloadSet {
    /// Fetch every distinct stored side of `requests` exactly once, in id
    /// order.
    ///
    /// Fails only when the working arrays cannot be allocated.
    pub fn build(reader: &dyn ObjectReader, requests: &[DiffRequest]) -> BatchResult<Self> {
        let mut ids = Vec::new();
        ids.try_reserve_exact(requests.len().saturating_mul(2))?;
        for request in requests {
            for side in [&request.old, &request.new] {
                if let Some(DiffSide::Stored(id)) = side {
                    ids.push(*id);
                }
            }
        }
        let ids = unique_sorted(ids);

        let mut objects = Vec::new();
        objects.try_reserve_exact(ids.len())?;
        objects.extend(ids.iter().map(|&id| PreloadedObject::fetch(reader, id)));

        Ok(Self { ids, objects })
    }

    /// Look up a preloaded blob by id.
    pub fn get(&self, id: &ObjectId) -> Option<&PreloadedObject> {
        find_sorted(&self.ids, id).map(|index| &self.objects[index])
    }

    /// Number of unique blobs in the set.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of preloaded blobs whose lookup succeeded.
    pub fn valid_count(&self) -> usize {
        self.objects.iter().filter(|o| o.valid).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobflow_store::{InMemoryObjectStore, ObjectKind, ObjectStore, StoredObject};

    #[test]
    fn shared_sides_are_fetched_once() {
        let store = InMemoryObjectStore::new();
        let a = store.write(&StoredObject::blob(&b"a\n"[..])).unwrap();
        let b = store.write(&StoredObject::blob(&b"b\0"[..])).unwrap();
        let requests = vec![
            DiffRequest::modified(a, b),
            DiffRequest::modified(b, a),
            DiffRequest::added(a),
        ];

        let reader = store.open().unwrap();
        let set = PreloadSet::build(&*reader, &requests).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(store.read_count(), 2);

        let pa = set.get(&a).unwrap();
        assert!(pa.valid);
        assert_eq!(pa.line_count, 1);
        assert!(set.get(&b).unwrap().is_binary);
    }

    #[test]
    fn failed_lookups_are_kept_as_invalid() {
        let store = InMemoryObjectStore::new();
        let tree = store
            .write(&StoredObject::new(ObjectKind::Tree, &b"not a blob"[..]))
            .unwrap();
        let missing = ObjectId::from_hash([3; 20]);
        let requests = vec![DiffRequest::modified(tree, missing)];

        let reader = store.open().unwrap();
        let set = PreloadSet::build(&*reader, &requests).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.valid_count(), 0);
        assert!(!set.get(&missing).unwrap().valid);
        assert!(!set.get(&tree).unwrap().valid);
    }

    #[test]
    fn inline_sides_are_not_fetched() {
        let store = InMemoryObjectStore::new();
        let requests = vec![DiffRequest::inline(
            Some(Bytes::from_static(b"x\n")),
            Some(Bytes::from_static(b"y\n")),
        )];
        let reader = store.open().unwrap();
        let set = PreloadSet::build(&*reader, &requests).unwrap();
        assert!(set.is_empty());
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn unknown_id_is_absent() {
        let set = PreloadSet::default();
        assert!(set.get(&ObjectId::null()).is_none());
    }
}
