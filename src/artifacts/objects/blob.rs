//! Git blob object
//!
//! Blobs store file content. They carry no structure of their own, so the
//! payload is kept as opaque bytes.
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::errors::Result;
use bytes::Bytes;
use derive_new::new;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Blob {
    raw: Bytes,
}

impl Packable for Blob {
    fn serialize(&self) -> Bytes {
        self.raw.clone()
    }
}

impl Unpackable for Blob {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        Ok(Self::new(Bytes::copy_from_slice(payload)))
    }
}
