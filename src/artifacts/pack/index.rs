//! Pack index (`.idx`) decoding
//!
//! Two on-disk versions exist:
//!
//! - **Version 1**: a 256-entry fan-out table, then `N` records of
//!   `(4-byte offset, 20-byte id)`.
//! - **Version 2**: magic `\377tOc`, a version word, the fan-out table, `N`
//!   ids, `N` CRC32 values, `N` 4-byte offsets and a table of 8-byte offsets
//!   for entries whose 4-byte offset has the top bit set.
//!
//! Both end with the pack checksum and a SHA-1 of the index itself. Ids are
//! stored in ascending order, which is what makes [`PackIndex::binary_search`]
//! valid; the order is trusted, not re-checked.

use crate::artifacts::core::byte_reader::{ByteReader, OutOfBounds};
use crate::artifacts::objects::object_id::{OBJECT_ID_BYTES, ObjectId, ObjectIdPrefix};
use crate::errors::{Error, Result};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;

pub const INDEX_MAGIC: u32 = 0xff74_4f63;
pub const INDEX_VERSION: u32 = 2;
pub const FANOUT_ENTRIES: usize = 256;
/// Pack checksum followed by the index checksum
pub const TRAILER_SIZE: usize = 2 * OBJECT_ID_BYTES;

const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

type Decoded<T> = std::result::Result<T, OutOfBounds>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackIndexEntry {
    pub oid: ObjectId,
    /// Byte offset of the entry inside the pack file
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackIndex {
    pack_file_name: String,
    entries: Vec<PackIndexEntry>,
}

impl PackIndex {
    pub fn new(pack_file_name: String, entries: Vec<PackIndexEntry>) -> Self {
        PackIndex {
            pack_file_name,
            entries,
        }
    }

    /// Decode an index file. `pack_file_name` names the `.pack` it describes.
    pub fn parse(pack_file_name: &str, bytes: &[u8], verify_checksum: bool) -> Result<Self> {
        let corrupt = |err: OutOfBounds| Error::corrupt_index(pack_file_name, err.to_string());

        if verify_checksum {
            Self::verify_checksum(pack_file_name, bytes)?;
        }

        let mut reader = ByteReader::new(bytes);
        let entries = if reader.read_u32_be().map_err(corrupt)? == INDEX_MAGIC {
            let version = reader.read_u32_be().map_err(corrupt)?;
            if version != INDEX_VERSION {
                return Err(Error::corrupt_index(
                    pack_file_name,
                    format!("unsupported index version {version}"),
                ));
            }
            Self::parse_v2(&mut reader).map_err(corrupt)?
        } else {
            reader.seek(0).map_err(corrupt)?;
            Self::parse_v1(&mut reader).map_err(corrupt)?
        };

        tracing::debug!(
            pack = pack_file_name,
            objects = entries.len(),
            "loaded pack index"
        );

        Ok(PackIndex::new(pack_file_name.to_string(), entries))
    }

    /// Number of objects, taken from the last fan-out slot
    fn read_object_count(reader: &mut ByteReader) -> Decoded<usize> {
        reader.skip((FANOUT_ENTRIES - 1) * 4)?;
        Ok(reader.read_u32_be()? as usize)
    }

    fn parse_v1(reader: &mut ByteReader) -> Decoded<Vec<PackIndexEntry>> {
        let count = Self::read_object_count(reader)?;

        (0..count)
            .map(|_| -> Decoded<PackIndexEntry> {
                let offset = u64::from(reader.read_u32_be()?);
                let oid = reader.read_object_id()?;
                Ok(PackIndexEntry { oid, offset })
            })
            .collect()
    }

    fn parse_v2(reader: &mut ByteReader) -> Decoded<Vec<PackIndexEntry>> {
        let count = Self::read_object_count(reader)?;

        let oids = (0..count)
            .map(|_| reader.read_object_id())
            .collect::<Decoded<Vec<_>>>()?;

        // CRC32 of each packed entry, not needed for reading
        reader.skip(count * 4)?;

        let small_offsets = (0..count)
            .map(|_| reader.read_u32_be())
            .collect::<Decoded<Vec<_>>>()?;

        let large_offsets_start = reader.position();
        let mut large_offsets = reader.clone();

        oids.into_iter()
            .zip(small_offsets)
            .map(|(oid, small)| -> Decoded<PackIndexEntry> {
                let offset = if small & LARGE_OFFSET_FLAG != 0 {
                    let slot = (small & !LARGE_OFFSET_FLAG) as usize;
                    large_offsets.seek(large_offsets_start + slot * 8)?;
                    large_offsets.read_u64_be()?
                } else {
                    u64::from(small)
                };
                Ok(PackIndexEntry { oid, offset })
            })
            .collect()
    }

    fn verify_checksum(pack_file_name: &str, bytes: &[u8]) -> Result<()> {
        if bytes.len() < TRAILER_SIZE {
            return Err(Error::corrupt_index(pack_file_name, "missing trailer"));
        }

        let (content, expected) = bytes.split_at(bytes.len() - OBJECT_ID_BYTES);
        let actual = Sha1::digest(content);

        if actual.as_slice() != expected {
            return Err(Error::corrupt_index(
                pack_file_name,
                "checksum does not match index contents",
            ));
        }

        Ok(())
    }

    pub fn pack_file_name(&self) -> &str {
        &self.pack_file_name
    }

    pub fn entries(&self) -> &[PackIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Binary search by id, where an entry matches when its id starts with
    /// `prefix`.
    ///
    /// When several entries share an abbreviated prefix the first one the
    /// search lands on is returned, which is not necessarily the smallest.
    pub fn binary_search(&self, prefix: &ObjectIdPrefix) -> Option<&PackIndexEntry> {
        let mut low = 0;
        let mut high = self.entries.len();

        while low < high {
            let middle = low + (high - low) / 2;
            let entry = &self.entries[middle];

            match prefix.cmp_object_id(&entry.oid) {
                Ordering::Equal => return Some(entry),
                Ordering::Less => low = middle + 1,
                Ordering::Greater => high = middle,
            }
        }

        None
    }
}
