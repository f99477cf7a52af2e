use blobflow_types::{ObjectId, OID_LEN};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing.
    Tree,
    /// Commit metadata.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// Header name used when hashing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored object: kind tag + content + cached size.
///
/// `data` is reference-counted, so handing it to a reader does not copy the
/// store's memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The raw bytes of the object.
    pub data: Bytes,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Shorthand for a blob object.
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self::new(ObjectKind::Blob, data)
    }

    /// Compute the content-addressed ID: SHA-1 over `"<kind> <len>\0"`
    /// followed by the content.
    pub fn compute_id(&self) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(format!("{} {}\0", self.kind, self.data.len()).as_bytes());
        hasher.update(&self.data);
        let mut raw = [0u8; OID_LEN];
        raw.copy_from_slice(&hasher.finalize());
        ObjectId::from_hash(raw)
    }
}
