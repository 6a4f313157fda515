//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20-byte SHA-1 digests, written as 40 lowercase hexadecimal
//! characters. Lookups may use an abbreviated id: a 4 to 40 character hex
//! prefix, represented by [`ObjectIdPrefix`].
//!
//! ## Storage
//!
//! Loose objects live in `.git/objects/<first-2-chars>/<remaining-38-chars>`

use crate::errors::{Error, Result};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;
/// Length of a SHA-1 hash in raw bytes
pub const OBJECT_ID_BYTES: usize = 20;
/// Shortest accepted abbreviation
pub const MIN_PREFIX_LENGTH: usize = 4;

/// Git object identifier (SHA-1 hash)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    pub fn from_bytes(bytes: [u8; OBJECT_ID_BYTES]) -> Self {
        ObjectId(bytes)
    }

    /// Parse and validate a full 40-character hexadecimal object ID
    pub fn try_parse(id: &str) -> Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::InvalidObjectId(id.to_string()));
        }

        let mut bytes = [0u8; OBJECT_ID_BYTES];
        hex::decode_to_slice(id, &mut bytes).map_err(|_| Error::InvalidObjectId(id.to_string()))?;

        Ok(ObjectId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_BYTES] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Relative path of the loose object file, `XX/YYYYYY...`
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

/// Full or abbreviated object id used as a lookup key
///
/// Always lowercase, always between [`MIN_PREFIX_LENGTH`] and
/// [`OBJECT_ID_LENGTH`] hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdPrefix(String);

impl ObjectIdPrefix {
    pub fn try_parse(prefix: &str) -> Result<Self> {
        let valid_length = (MIN_PREFIX_LENGTH..=OBJECT_ID_LENGTH).contains(&prefix.len());
        if !valid_length || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidObjectId(prefix.to_string()));
        }

        Ok(ObjectIdPrefix(prefix.to_ascii_lowercase()))
    }

    pub fn is_full(&self) -> bool {
        self.0.len() == OBJECT_ID_LENGTH
    }

    /// The full id, when this prefix is not abbreviated
    pub fn to_object_id(&self) -> Option<ObjectId> {
        if self.is_full() {
            ObjectId::try_parse(&self.0).ok()
        } else {
            None
        }
    }

    /// Orders `oid` against this prefix: `Equal` when `oid` starts with the
    /// prefix, otherwise the ordering of the id's leading characters.
    pub fn cmp_object_id(&self, oid: &ObjectId) -> Ordering {
        let hex = oid.to_hex();
        hex[..self.0.len()].cmp(self.0.as_str())
    }
}

impl From<&ObjectId> for ObjectIdPrefix {
    fn from(oid: &ObjectId) -> Self {
        ObjectIdPrefix(oid.to_hex())
    }
}

impl From<ObjectId> for ObjectIdPrefix {
    fn from(oid: ObjectId) -> Self {
        ObjectIdPrefix::from(&oid)
    }
}

impl AsRef<str> for ObjectIdPrefix {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectIdPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
