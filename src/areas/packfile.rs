//! Packed object store
//!
//! Loads every `objects/pack/pack-*.idx` once and keeps the decoded indices for
//! the life of the store. Lookups binary-search the indices in load order, open
//! the matching `.pack` and rebuild the entry, following delta bases through
//! the same pack (OFS_DELTA) or through any loaded pack (REF_DELTA).
//!
//! Pack files are opened per lookup and closed when it returns.

use crate::artifacts::objects::object::frame;
use crate::artifacts::objects::object_id::ObjectIdPrefix;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::delta::patch_delta;
use crate::artifacts::pack::entry::{MAX_HEADER_SIZE, PackEntryHeader, PackEntryKind};
use crate::artifacts::pack::index::{PackIndex, PackIndexEntry};
use crate::artifacts::pack::{PACK_HEADER_SIZE, PACK_SIGNATURE};
use crate::config::Config;
use crate::errors::{Error, Result};
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex matching index file names, capturing the pack base name
const INDEX_FILE_REGEX: &str = r"^(pack-[0-9a-f]{40})\.idx$";

/// Inflated object read out of a pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedObject {
    pub object_type: ObjectType,
    /// Length of the reconstructed payload
    pub size: u64,
    pub payload: Bytes,
}

impl PackedObject {
    /// `"<type> <size>\0<payload>"`, the same framing loose objects use
    pub fn to_framed(&self) -> Bytes {
        frame(self.object_type, &self.payload)
    }
}

#[derive(Debug)]
pub struct PackfileStore {
    pack_dir: Box<Path>,
    indices: Vec<PackIndex>,
    max_delta_depth: usize,
}

impl PackfileStore {
    pub fn new(pack_dir: Box<Path>, indices: Vec<PackIndex>, max_delta_depth: usize) -> Self {
        PackfileStore {
            pack_dir,
            indices,
            max_delta_depth,
        }
    }

    /// Load every index under `<objects>/pack`, in file name order
    pub fn open(objects_path: &Path, config: &Config) -> Result<Self> {
        let pack_dir = objects_path.join("pack");
        if !pack_dir.is_dir() {
            tracing::debug!(?pack_dir, "no pack directory");
            return Ok(Self::new(
                pack_dir.into_boxed_path(),
                Vec::new(),
                config.max_delta_depth,
            ));
        }

        let index_name = regex::Regex::new(INDEX_FILE_REGEX)
            .map_err(|err| Error::corrupt_index(INDEX_FILE_REGEX, err.to_string()))?;
        let mut indices = Vec::new();

        for entry in WalkDir::new(&pack_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(pack_dir.as_path()).to_path_buf();
                Error::io(path, err.into())
            })?;
            let file_name = entry.file_name().to_string_lossy();

            let Some(captures) = index_name.captures(&file_name) else {
                if file_name.ends_with(".idx") {
                    tracing::warn!(file = %file_name, "skipping index with unexpected name");
                }
                continue;
            };

            let bytes = std::fs::read(entry.path()).map_err(|err| Error::io(entry.path(), err))?;
            let pack_file_name = format!("{}.pack", &captures[1]);
            indices.push(PackIndex::parse(
                &pack_file_name,
                &bytes,
                config.verify_index_checksum,
            )?);
        }

        Ok(Self::new(
            pack_dir.into_boxed_path(),
            indices,
            config.max_delta_depth,
        ))
    }

    pub fn indices(&self) -> &[PackIndex] {
        &self.indices
    }

    /// First index (in load order) holding an id that matches `prefix`
    pub fn locate(&self, prefix: &ObjectIdPrefix) -> Option<(usize, &PackIndexEntry)> {
        self.indices
            .iter()
            .enumerate()
            .find_map(|(position, index)| index.binary_search(prefix).map(|entry| (position, entry)))
    }

    /// Reconstruct the object matching `prefix`, or `None` when no index
    /// contains it
    pub fn find_by_id(&self, prefix: &ObjectIdPrefix) -> Result<Option<PackedObject>> {
        let Some((position, entry)) = self.locate(prefix) else {
            return Ok(None);
        };

        tracing::debug!(
            %prefix,
            oid = %entry.oid,
            pack = self.indices[position].pack_file_name(),
            offset = entry.offset,
            "found object in pack"
        );

        self.read_entry(position, entry.offset).map(Some)
    }

    /// Framed bytes of the object matching `prefix`
    pub fn find(&self, prefix: &ObjectIdPrefix) -> Result<Option<Bytes>> {
        Ok(self
            .find_by_id(prefix)?
            .map(|object| object.to_framed()))
    }

    /// Reconstruct the entry at `offset` in the pack of the index at
    /// `position`
    ///
    /// Delta bases are collected on an explicit stack and applied innermost
    /// first. A chain longer than the configured depth fails with
    /// `CyclicReference`.
    pub fn read_entry(&self, position: usize, offset: u64) -> Result<PackedObject> {
        let mut packs = OpenPacks::new(self);
        let mut location = (position, offset);
        let mut deltas = Vec::new();

        let (object_type, mut payload) = loop {
            if deltas.len() > self.max_delta_depth {
                return Err(Error::CyclicReference {
                    name: format!("{}@{}", self.pack_name(position)?, offset),
                    limit: self.max_delta_depth,
                });
            }

            let (pack_position, entry_offset) = location;
            let pack = packs.get(pack_position)?;
            let header = pack.read_header(entry_offset)?;
            let data = pack.inflate(entry_offset + header.header_len as u64, header.size)?;

            match header.kind {
                PackEntryKind::Base(object_type) => break (object_type, data),
                PackEntryKind::OfsDelta { base_offset } => {
                    deltas.push(data);
                    location = (pack_position, base_offset);
                }
                PackEntryKind::RefDelta { base_id } => {
                    deltas.push(data);
                    let (base_position, base_entry) = self
                        .locate(&ObjectIdPrefix::from(base_id))
                        .ok_or_else(|| Error::ObjectNotFound(base_id.to_string()))?;
                    location = (base_position, base_entry.offset);
                }
            }
        };

        let depth = deltas.len();
        while let Some(delta) = deltas.pop() {
            payload = patch_delta(&payload, &delta)?;
        }

        tracing::trace!(%object_type, depth, size = payload.len(), "rebuilt packed entry");

        Ok(PackedObject {
            object_type,
            size: payload.len() as u64,
            payload: Bytes::from(payload),
        })
    }

    fn pack_name(&self, position: usize) -> Result<&str> {
        self.indices
            .get(position)
            .map(PackIndex::pack_file_name)
            .ok_or_else(|| Error::CorruptPackEntry(format!("no pack at position {position}")))
    }

    fn pack_path(&self, position: usize) -> Result<PathBuf> {
        Ok(self.pack_dir.join(self.pack_name(position)?))
    }
}

/// Pack files opened during a single lookup
struct OpenPacks<'s> {
    store: &'s PackfileStore,
    files: HashMap<usize, PackFile>,
}

impl<'s> OpenPacks<'s> {
    fn new(store: &'s PackfileStore) -> Self {
        OpenPacks {
            store,
            files: HashMap::new(),
        }
    }

    fn get(&mut self, position: usize) -> Result<&mut PackFile> {
        if !self.files.contains_key(&position) {
            let pack = PackFile::open(self.store.pack_path(position)?)?;
            self.files.insert(position, pack);
        }

        self.files
            .get_mut(&position)
            .ok_or_else(|| Error::CorruptPackEntry(format!("no pack at position {position}")))
    }
}

struct PackFile {
    path: PathBuf,
    reader: BufReader<File>,
}

impl PackFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).map_err(|err| Error::io(&path, err))?;
        let mut pack = PackFile {
            path,
            reader: BufReader::new(file),
        };
        pack.verify_header()?;

        Ok(pack)
    }

    fn verify_header(&mut self) -> Result<()> {
        let header = self.read_at(0, PACK_HEADER_SIZE)?;
        let version = header.get(4..8).map(BigEndian::read_u32);

        if header.len() < PACK_HEADER_SIZE
            || &header[..4] != PACK_SIGNATURE
            || !matches!(version, Some(2 | 3))
        {
            return Err(Error::CorruptPackEntry(format!(
                "{} is not a version 2 or 3 pack",
                self.path.display()
            )));
        }

        Ok(())
    }

    /// Read up to `limit` bytes at `offset`; shorter near the end of the file
    fn read_at(&mut self, offset: u64, limit: usize) -> Result<Vec<u8>> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|err| Error::io(&self.path, err))?;

        let mut buffer = Vec::with_capacity(limit);
        (&mut self.reader)
            .take(limit as u64)
            .read_to_end(&mut buffer)
            .map_err(|err| Error::io(&self.path, err))?;

        Ok(buffer)
    }

    fn read_header(&mut self, offset: u64) -> Result<PackEntryHeader> {
        let bytes = self.read_at(offset, MAX_HEADER_SIZE)?;
        PackEntryHeader::decode(&bytes, offset)
    }

    /// Inflate the zlib stream starting at `offset`. The stream decides where
    /// it ends; `declared_size` only sizes the buffer.
    fn inflate(&mut self, offset: u64, declared_size: u64) -> Result<Vec<u8>> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|err| Error::io(&self.path, err))?;

        let capacity = usize::try_from(declared_size).unwrap_or(0).min(1 << 24);
        let mut inflated = Vec::with_capacity(capacity);
        flate2::read::ZlibDecoder::new(&mut self.reader)
            .read_to_end(&mut inflated)
            .map_err(|err| {
                Error::CorruptPackEntry(format!(
                    "unable to inflate {} at offset {offset}: {err}",
                    self.path.display()
                ))
            })?;

        Ok(inflated)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artifacts::objects::object_id::ObjectId;
    use crate::artifacts::pack::index::tests::encode_v2;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use pretty_assertions::assert_eq;
    use sha1::{Digest, Sha1};
    use std::io::Write;

    pub(crate) fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn hash(object_type: ObjectType, payload: &[u8]) -> ObjectId {
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&Sha1::digest(frame(object_type, payload)));
        ObjectId::from_bytes(raw)
    }

    fn entry_header(type_code: u8, mut size: usize) -> Vec<u8> {
        let mut bytes = vec![(type_code << 4) | (size & 0x0f) as u8];
        size >>= 4;
        while size != 0 {
            *bytes.last_mut().unwrap() |= 0x80;
            bytes.push((size & 0x7f) as u8);
            size >>= 7;
        }
        bytes
    }

    fn ofs_distance(mut distance: u64) -> Vec<u8> {
        let mut out = vec![(distance & 0x7f) as u8];
        distance >>= 7;
        while distance != 0 {
            distance -= 1;
            out.push(0x80 | (distance & 0x7f) as u8);
            distance >>= 7;
        }
        out.reverse();
        out
    }

    /// Delta replacing everything after the first `keep` bytes of `base`
    fn delta_keeping(base: &[u8], keep: u8, tail: &[u8]) -> Vec<u8> {
        let mut delta = vec![base.len() as u8, keep + tail.len() as u8];
        delta.extend_from_slice(&[0x90, keep, tail.len() as u8]);
        delta.extend_from_slice(tail);
        delta
    }

    /// Builder for small in-memory packs
    pub(crate) struct PackBuilder {
        bytes: Vec<u8>,
        entries: Vec<(ObjectId, u64)>,
    }

    impl PackBuilder {
        pub(crate) fn new() -> Self {
            let mut bytes = PACK_SIGNATURE.to_vec();
            bytes.extend_from_slice(&2u32.to_be_bytes());
            bytes.extend_from_slice(&0u32.to_be_bytes());
            PackBuilder {
                bytes,
                entries: Vec::new(),
            }
        }

        pub(crate) fn base(&mut self, object_type: ObjectType, payload: &[u8]) -> u64 {
            let code = match object_type {
                ObjectType::Commit => 1,
                ObjectType::Tree => 2,
                ObjectType::Blob => 3,
                ObjectType::Tag => 4,
            };
            let offset = self.bytes.len() as u64;
            self.bytes.extend(entry_header(code, payload.len()));
            self.bytes.extend(deflate(payload));
            self.entries.push((hash(object_type, payload), offset));
            offset
        }

        pub(crate) fn ofs_delta(&mut self, oid: ObjectId, base_offset: u64, delta: &[u8]) -> u64 {
            let offset = self.bytes.len() as u64;
            self.bytes.extend(entry_header(6, delta.len()));
            self.bytes.extend(ofs_distance(offset - base_offset));
            self.bytes.extend(deflate(delta));
            self.entries.push((oid, offset));
            offset
        }

        pub(crate) fn ref_delta(&mut self, oid: ObjectId, base: ObjectId, delta: &[u8]) -> u64 {
            let offset = self.bytes.len() as u64;
            self.bytes.extend(entry_header(7, delta.len()));
            self.bytes.extend_from_slice(base.as_bytes());
            self.bytes.extend(deflate(delta));
            self.entries.push((oid, offset));
            offset
        }

        /// Write `pack-<name>.pack` and its index into `pack_dir`
        pub(crate) fn write(mut self, pack_dir: &Path, name: &str) -> Vec<ObjectId> {
            let count = self.entries.len() as u32;
            self.bytes[8..12].copy_from_slice(&count.to_be_bytes());
            self.entries.sort();

            std::fs::create_dir_all(pack_dir).unwrap();
            std::fs::write(pack_dir.join(format!("pack-{name}.pack")), &self.bytes).unwrap();
            std::fs::write(
                pack_dir.join(format!("pack-{name}.idx")),
                encode_v2(&self.entries),
            )
            .unwrap();

            self.entries.into_iter().map(|(oid, _)| oid).collect()
        }
    }

    fn pack_name(fill: char) -> String {
        fill.to_string().repeat(40)
    }

    fn open_store(dir: &TempDir, config: Config) -> PackfileStore {
        PackfileStore::open(&dir.path().join("objects"), &config).unwrap()
    }

    #[test]
    fn rebuilds_base_and_delta_entries() {
        let dir = TempDir::new().unwrap();
        let base = b"hello packed world";
        let ofs_target = b"hello packed moon";
        let ref_target = b"hello packed mars";

        let mut pack = PackBuilder::new();
        let base_offset = pack.base(ObjectType::Blob, base);
        let ofs_oid = hash(ObjectType::Blob, ofs_target);
        pack.ofs_delta(ofs_oid, base_offset, &delta_keeping(base, 13, b"moon"));
        let ref_oid = hash(ObjectType::Blob, ref_target);
        pack.ref_delta(ref_oid, ofs_oid, &delta_keeping(ofs_target, 13, b"mars"));
        let oids = pack.write(&dir.path().join("objects/pack"), &pack_name('a'));

        let store = open_store(&dir, Config::new(dir.path()));

        assert_eq!(store.indices().len(), 1);
        assert_eq!(store.indices()[0].len(), 3);
        for oid in oids {
            let object = store.find_by_id(&oid.into()).unwrap().unwrap();
            assert_eq!(object.object_type, ObjectType::Blob);
            assert_eq!(hash(object.object_type, &object.payload), oid);
        }

        let framed = store.find(&ref_oid.into()).unwrap().unwrap();
        assert_eq!(&framed[..], b"blob 17\0hello packed mars");
    }

    #[test]
    fn ref_delta_bases_resolve_across_packs() {
        let dir = TempDir::new().unwrap();
        let pack_dir = dir.path().join("objects/pack");
        let base = b"shared base content";
        let target = b"shared base payload";

        let mut first = PackBuilder::new();
        first.base(ObjectType::Blob, base);
        let base_oid = first.write(&pack_dir, &pack_name('1'))[0];

        let mut second = PackBuilder::new();
        let target_oid = hash(ObjectType::Blob, target);
        second.ref_delta(target_oid, base_oid, &delta_keeping(base, 12, b"payload"));
        second.write(&pack_dir, &pack_name('2'));

        let store = open_store(&dir, Config::new(dir.path()));
        let object = store.find_by_id(&target_oid.into()).unwrap().unwrap();

        assert_eq!(&object.payload[..], target);
        assert_eq!(store.locate(&target_oid.into()).unwrap().0, 1);
    }

    #[test]
    fn abbreviated_ids_hit_and_missing_ids_miss() {
        let dir = TempDir::new().unwrap();
        let mut pack = PackBuilder::new();
        pack.base(ObjectType::Blob, b"one");
        let oid = pack.write(&dir.path().join("objects/pack"), &pack_name('b'))[0];

        let store = open_store(&dir, Config::new(dir.path()));
        let prefix = ObjectIdPrefix::try_parse(&oid.to_hex()[..6]).unwrap();

        assert_eq!(store.locate(&prefix).unwrap().1.oid, oid);
        assert_eq!(&store.find_by_id(&prefix).unwrap().unwrap().payload[..], b"one");
        let missing = if oid.to_hex().starts_with("0000") { "ffff" } else { "0000" };
        assert!(
            store
                .find_by_id(&ObjectIdPrefix::try_parse(missing).unwrap())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn cyclic_ref_deltas_hit_the_depth_limit() {
        let dir = TempDir::new().unwrap();
        let first = ObjectId::from_bytes([0x10; 20]);
        let second = ObjectId::from_bytes([0x20; 20]);

        let mut pack = PackBuilder::new();
        pack.ref_delta(first, second, &[1, 1, 0x01, b'x']);
        pack.ref_delta(second, first, &[1, 1, 0x01, b'y']);
        pack.write(&dir.path().join("objects/pack"), &pack_name('c'));

        let store = open_store(&dir, Config::new(dir.path()).with_max_delta_depth(8));

        assert!(matches!(
            store.find_by_id(&first.into()),
            Err(Error::CyclicReference { limit: 8, .. })
        ));
    }

    #[test]
    fn missing_ref_delta_base_is_object_not_found() {
        let dir = TempDir::new().unwrap();
        let oid = ObjectId::from_bytes([0x42; 20]);

        let mut pack = PackBuilder::new();
        pack.ref_delta(oid, ObjectId::from_bytes([0x43; 20]), &[1, 1, 0x01, b'x']);
        pack.write(&dir.path().join("objects/pack"), &pack_name('d'));

        let store = open_store(&dir, Config::new(dir.path()));

        assert!(matches!(
            store.find_by_id(&oid.into()),
            Err(Error::ObjectNotFound(_))
        ));
    }

    #[test]
    fn rejects_files_without_pack_signature() {
        let dir = TempDir::new().unwrap();
        let mut pack = PackBuilder::new();
        pack.base(ObjectType::Blob, b"one");
        let oid = pack.write(&dir.path().join("objects/pack"), &pack_name('e'))[0];
        dir.child(format!("objects/pack/pack-{}.pack", pack_name('e')))
            .write_binary(b"KCAP\0\0\0\x02\0\0\0\x01")
            .unwrap();

        let store = open_store(&dir, Config::new(dir.path()));

        assert!(matches!(
            store.find_by_id(&oid.into()),
            Err(Error::CorruptPackEntry(_))
        ));
    }

    #[test]
    fn missing_pack_directory_is_an_empty_store() {
        let dir = TempDir::new().unwrap();

        let store = open_store(&dir, Config::new(dir.path()));

        assert!(store.indices().is_empty());
    }
}
