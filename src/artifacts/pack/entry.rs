//! Pack entry header decoding
//!
//! Each entry starts with a variable-length header: the first byte carries the
//! type in bits 4-6 and the low nibble of the inflated size, bit 7 flags more
//! size bytes (7 bits each, little-endian). Delta entries follow it with their
//! base reference: a backward offset for OFS_DELTA, a raw id for REF_DELTA.

use crate::artifacts::core::byte_reader::{ByteReader, OutOfBounds};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};

/// Longest header we need to look at: a 10-byte size, then either a 10-byte
/// offset or a 20-byte id
pub const MAX_HEADER_SIZE: usize = 64;

const OBJ_COMMIT: u8 = 1;
const OBJ_TREE: u8 = 2;
const OBJ_BLOB: u8 = 3;
const OBJ_TAG: u8 = 4;
const OBJ_OFS_DELTA: u8 = 6;
const OBJ_REF_DELTA: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryKind {
    Base(ObjectType),
    /// Base lives in the same pack at this absolute offset
    OfsDelta { base_offset: u64 },
    /// Base is addressed by id and may live in any pack
    RefDelta { base_id: ObjectId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackEntryHeader {
    pub kind: PackEntryKind,
    /// Inflated size as declared by the header. Advisory only.
    pub size: u64,
    /// Bytes between the entry offset and its compressed data
    pub header_len: usize,
}

impl PackEntryHeader {
    /// Decode the header of the entry at `entry_offset`, whose leading bytes
    /// are `bytes`
    pub fn decode(bytes: &[u8], entry_offset: u64) -> Result<Self> {
        let corrupt = |err: OutOfBounds| {
            Error::CorruptPackEntry(format!("header at offset {entry_offset}: {err}"))
        };
        let mut reader = ByteReader::new(bytes);

        let mut byte = reader.read_u8().map_err(corrupt)?;
        let type_code = (byte >> 4) & 0x07;
        let mut size = u64::from(byte & 0x0f);
        let mut shift = 4u32;

        while byte & 0x80 != 0 {
            byte = reader.read_u8().map_err(corrupt)?;
            if shift > 63 || u64::from(byte & 0x7f) >> (64 - shift) != 0 {
                return Err(corrupt(OutOfBounds::Overflow { position: 0 }));
            }
            size |= u64::from(byte & 0x7f) << shift;
            shift += 7;
        }

        let kind = match type_code {
            OBJ_COMMIT => PackEntryKind::Base(ObjectType::Commit),
            OBJ_TREE => PackEntryKind::Base(ObjectType::Tree),
            OBJ_BLOB => PackEntryKind::Base(ObjectType::Blob),
            OBJ_TAG => PackEntryKind::Base(ObjectType::Tag),
            OBJ_OFS_DELTA => {
                let distance = reader.read_offset_varint().map_err(corrupt)?;
                let base_offset = entry_offset
                    .checked_sub(distance)
                    .filter(|_| distance != 0)
                    .ok_or_else(|| {
                        Error::CorruptPackEntry(format!(
                            "delta at offset {entry_offset} points {distance} bytes back"
                        ))
                    })?;
                PackEntryKind::OfsDelta { base_offset }
            }
            OBJ_REF_DELTA => PackEntryKind::RefDelta {
                base_id: reader.read_object_id().map_err(corrupt)?,
            },
            other => {
                return Err(Error::CorruptPackEntry(format!(
                    "invalid object type {other} at offset {entry_offset}"
                )));
            }
        };

        Ok(PackEntryHeader {
            kind,
            size,
            header_len: reader.position(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[0x15], ObjectType::Commit, 5)]
    #[case(&[0x2f], ObjectType::Tree, 15)]
    #[case(&[0xb0, 0x01], ObjectType::Blob, 16)]
    #[case(&[0xc5, 0x8e, 0x26], ObjectType::Tag, 0x26 << 11 | 0x0e << 4 | 5)]
    fn decodes_base_entries(
        #[case] bytes: &[u8],
        #[case] object_type: ObjectType,
        #[case] size: u64,
    ) {
        let header = PackEntryHeader::decode(bytes, 100).unwrap();

        assert_eq!(header.kind, PackEntryKind::Base(object_type));
        assert_eq!(header.size, size);
        assert_eq!(header.header_len, bytes.len());
    }

    #[test]
    fn decodes_offset_delta_base() {
        // size 3, distance (0 + 1) * 128 + 2 = 130
        let header = PackEntryHeader::decode(&[0x63, 0x80, 0x02, 0x78], 1000).unwrap();

        assert_eq!(header.kind, PackEntryKind::OfsDelta { base_offset: 870 });
        assert_eq!(header.header_len, 3);
    }

    #[test]
    fn decodes_ref_delta_base() {
        let mut bytes = vec![0x74];
        bytes.extend_from_slice(&[0xab; 20]);

        let header = PackEntryHeader::decode(&bytes, 12).unwrap();

        assert_eq!(
            header.kind,
            PackEntryKind::RefDelta {
                base_id: ObjectId::from_bytes([0xab; 20])
            }
        );
        assert_eq!(header.size, 4);
        assert_eq!(header.header_len, 21);
    }

    #[rstest]
    #[case(&[], 12)]
    #[case(&[0x95], 12)]
    #[case(&[0x05], 12)]
    #[case(&[0x55], 12)]
    #[case(&[0x63, 0x0d], 12)]
    #[case(&[0x63, 0x00], 12)]
    #[case(&[0x74, 0xab, 0xab], 12)]
    fn rejects_corrupt_headers(#[case] bytes: &[u8], #[case] offset: u64) {
        assert!(matches!(
            PackEntryHeader::decode(bytes, offset),
            Err(Error::CorruptPackEntry(_))
        ));
    }
}
