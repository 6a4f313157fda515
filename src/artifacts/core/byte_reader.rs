//! Bounds-checked cursor over a byte slice
//!
//! Shared by the pack index reader, the pack entry header decoder and the delta
//! codec. Every read either returns the requested bytes or an [`OutOfBounds`]
//! describing what was missing; callers map that into their own error kind.

use crate::artifacts::objects::object_id::{OBJECT_ID_BYTES, ObjectId};
use byteorder::{BigEndian, ByteOrder};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutOfBounds {
    #[error("wanted {wanted} bytes at offset {position}, only {available} available")]
    Truncated {
        position: usize,
        wanted: usize,
        available: usize,
    },
    #[error("variable-length integer at offset {position} does not fit in 64 bits")]
    Overflow { position: usize },
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, position: usize) -> Result<(), OutOfBounds> {
        if position > self.data.len() {
            return Err(OutOfBounds::Truncated {
                position,
                wanted: 0,
                available: 0,
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(OutOfBounds::Truncated {
                position: self.position,
                wanted: count,
                available: self.remaining(),
            })?;

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), OutOfBounds> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32_be(&mut self) -> Result<u32, OutOfBounds> {
        self.read_bytes(4).map(BigEndian::read_u32)
    }

    pub fn read_u64_be(&mut self) -> Result<u64, OutOfBounds> {
        self.read_bytes(8).map(BigEndian::read_u64)
    }

    pub fn read_object_id(&mut self) -> Result<ObjectId, OutOfBounds> {
        let bytes = self.read_bytes(OBJECT_ID_BYTES)?;
        let mut raw = [0u8; OBJECT_ID_BYTES];
        raw.copy_from_slice(bytes);
        Ok(ObjectId::from_bytes(raw))
    }

    /// Little-endian base-128 integer: each byte contributes its low 7 bits,
    /// the high bit flags another byte.
    pub fn read_size_varint(&mut self) -> Result<u64, OutOfBounds> {
        let start = self.position;
        let mut value = 0u64;
        let mut shift = 0u32;

        loop {
            let byte = self.read_u8()?;
            if shift > 63 || (shift > 0 && u64::from(byte & 0x7f) >> (64 - shift) != 0) {
                return Err(OutOfBounds::Overflow { position: start });
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Big-endian base-128 offset used by OFS_DELTA entries. Every
    /// continuation adds one before shifting, so there is exactly one
    /// encoding per value.
    pub fn read_offset_varint(&mut self) -> Result<u64, OutOfBounds> {
        let start = self.position;
        let mut byte = self.read_u8()?;
        let mut value = u64::from(byte & 0x7f);

        while byte & 0x80 != 0 {
            byte = self.read_u8()?;
            value = value
                .checked_add(1)
                .and_then(|value| value.checked_mul(128))
                .map(|value| value | u64::from(byte & 0x7f))
                .ok_or(OutOfBounds::Overflow { position: start })?;
        }

        Ok(value)
    }
}
