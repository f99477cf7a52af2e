use blobflow_types::{BatchError, Classification, ObjectId};

/// An owned blob copied out of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobResult {
    pub id: ObjectId,
    /// Owned copy of the blob; empty when `error` is set or after [`release`](Self::release).
    pub data: Vec<u8>,
    pub size: usize,
    pub error: Option<BatchError>,
    pub is_binary: bool,
    pub line_count: usize,
}

impl BlobResult {
    pub(crate) fn pending(id: ObjectId) -> Self {
        Self {
            id,
            data: Vec::new(),
            size: 0,
            error: None,
            is_binary: false,
            line_count: 0,
        }
    }

    pub(crate) fn fill(&mut self, data: Vec<u8>, class: Classification) {
        self.size = data.len();
        self.is_binary = class.is_binary;
        self.line_count = class.line_count;
        self.data = data;
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the owned buffer. Metadata stays readable; calling again is a no-op.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }
}

/// A blob located by `(offset, size)` inside a shared arena.
///
/// Failed items carry `offset == 0` and `size == 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedBlobResult {
    pub id: ObjectId,
    pub offset: usize,
    pub size: usize,
    pub error: Option<BatchError>,
    pub is_binary: bool,
    pub line_count: usize,
}

impl PackedBlobResult {
    pub(crate) fn pending(id: ObjectId) -> Self {
        Self {
            id,
            offset: 0,
            size: 0,
            error: None,
            is_binary: false,
            line_count: 0,
        }
    }

    pub(crate) fn fail(&mut self, error: BatchError) {
        self.offset = 0;
        self.size = 0;
        self.error = Some(error);
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Byte range of this blob in its arena.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }

    /// View of this blob inside `arena`, or `None` for failed items.
    pub fn slice<'a>(&self, arena: &'a [u8]) -> Option<&'a [u8]> {
        if self.error.is_some() {
            return None;
        }
        arena.get(self.range())
    }
}

/// Results of an owned-copy load, in request order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub results: Vec<BlobResult>,
    /// Items that loaded without error.
    pub loaded: usize,
}

impl LoadReport {
    /// Release every owned buffer in the report.
    pub fn release(&mut self) {
        self.results.iter_mut().for_each(BlobResult::release);
    }
}

/// Blobs packed back-to-back into one exactly-sized arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedBlobs {
    /// Length equals the sum of all successful item sizes.
    pub arena: Vec<u8>,
    pub results: Vec<PackedBlobResult>,
    pub loaded: usize,
}

impl PackedBlobs {
    /// Bytes of the blob at request position `index`.
    pub fn data(&self, index: usize) -> Option<&[u8]> {
        self.results.get(index)?.slice(&self.arena)
    }

    /// Drop the arena and every view into it.
    pub fn release(&mut self) {
        self.arena = Vec::new();
        self.results.clear();
        self.loaded = 0;
    }
}

/// Results of a load into a caller-supplied arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaLoad {
    pub results: Vec<PackedBlobResult>,
    /// Bytes of the arena written, from offset zero.
    pub used: usize,
    pub loaded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_release_is_idempotent() {
        let mut r = BlobResult::pending(ObjectId::from_hash([1; 20]));
        r.fill(
            b"a\nb\n".to_vec(),
            Classification {
                is_binary: false,
                line_count: 2,
            },
        );
        assert_eq!(r.size, 4);
        r.release();
        r.release();
        assert!(r.data.is_empty());
        assert_eq!(r.size, 4);
        assert_eq!(r.line_count, 2);
    }

    #[test]
    fn failed_packed_result_has_no_slice() {
        let mut r = PackedBlobResult::pending(ObjectId::from_hash([2; 20]));
        r.offset = 3;
        r.size = 2;
        assert_eq!(r.slice(b"abcdef"), Some(&b"de"[..]));

        r.fail(BatchError::Lookup);
        assert_eq!((r.offset, r.size), (0, 0));
        assert_eq!(r.slice(b"abcdef"), None);
    }

    #[test]
    fn out_of_bounds_range_is_none() {
        let mut r = PackedBlobResult::pending(ObjectId::from_hash([2; 20]));
        r.offset = 4;
        r.size = 4;
        assert_eq!(r.slice(b"abcdef"), None);
    }
}
