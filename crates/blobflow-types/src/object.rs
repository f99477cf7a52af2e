use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Width of an object identifier in bytes.
pub const OID_LEN: usize = 20;

/// Content-addressed identifier for a stored object.
///
/// An `ObjectId` is the 20-byte hash naming an object in the store. Ordering
/// is byte-wise lexicographic, which matches the order objects are laid out
/// in pack indexes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; OID_LEN]) -> Self {
        Self(hash)
    }

    /// The null object ID (all zeros). Represents "no object".
    pub const fn null() -> Self {
        Self([0u8; OID_LEN])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; OID_LEN]
    }

    /// The raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Copy an identifier out of a raw byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; OID_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: OID_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; OID_LEN]> for ObjectId {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_with_prefix(prefix: &[u8]) -> ObjectId {
        let mut raw = [0u8; OID_LEN];
        raw[..prefix.len()].copy_from_slice(prefix);
        ObjectId::from_hash(raw)
    }

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; OID_LEN]);
    }

    #[test]
    fn hex_roundtrip() {
        let id = id_with_prefix(&[0xde, 0xad, 0xbe, 0xef, 0x01]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 40);
        assert!(hex.starts_with("deadbeef01"));
        assert_eq!(ObjectId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: OID_LEN,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            ObjectId::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn short_hex_is_8_chars() {
        let id = id_with_prefix(&[1, 2, 3, 4, 5]);
        assert_eq!(id.short_hex(), "01020304");
        assert_eq!(format!("{id:?}"), "ObjectId(01020304)");
    }

    #[test]
    fn ordering_is_bytewise() {
        let low = id_with_prefix(&[0x00, 0xff]);
        let mid = id_with_prefix(&[0x01, 0x00]);
        let high = id_with_prefix(&[0xff]);
        assert!(low < mid);
        assert!(mid < high);
    }

    #[test]
    fn serde_uses_byte_array() {
        let id = id_with_prefix(&[7]);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
