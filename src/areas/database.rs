//! Object database
//!
//! Read-only view over `.git/objects`. Lookups try the pack indices first and
//! fall back to loose objects stored at `objects/<2 hex>/<38 hex>`. Both paths
//! hand back the same `"<type> <size>\0<payload>"` framing, so parsing does not
//! care where an object came from.

use crate::areas::packfile::PackfileStore;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{ObjectRecord, ParsedBody, split_header};
use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::config::Config;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
    packs: PackfileStore,
}

impl Database {
    pub fn new(path: Box<Path>, packs: PackfileStore) -> Self {
        Database { path, packs }
    }

    /// Open the object database of `config.git_dir`, loading every pack index
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.objects_path();
        let packs = PackfileStore::open(&path, config)?;

        Ok(Self::new(path.into_boxed_path(), packs))
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Framed bytes of the object matching `prefix`
    pub fn load(&self, prefix: &ObjectIdPrefix) -> Result<Bytes> {
        if let Some(framed) = self.packs.find(prefix)? {
            return Ok(framed);
        }

        let oid = self.find_loose_object(prefix)?;
        tracing::debug!(%prefix, %oid, "reading loose object");

        self.read_object(self.path.join(oid.to_path()))
    }

    /// Full id of the object matching `prefix`
    pub fn expand(&self, prefix: &ObjectIdPrefix) -> Result<ObjectId> {
        match self.packs.locate(prefix) {
            Some((_, entry)) => Ok(entry.oid),
            None => self.find_loose_object(prefix),
        }
    }

    pub fn contains(&self, prefix: &ObjectIdPrefix) -> Result<bool> {
        match self.expand(prefix) {
            Ok(_) => Ok(true),
            Err(Error::ObjectNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn parse_object(&self, prefix: &ObjectIdPrefix) -> Result<ObjectRecord> {
        ObjectRecord::parse(&self.load(prefix)?)
    }

    /// Type and declared size, without decoding the body
    pub fn read_header(&self, prefix: &ObjectIdPrefix) -> Result<(ObjectType, u64)> {
        let framed = self.load(prefix)?;
        let (object_type, size, _) = split_header(&framed)?;

        Ok((object_type, size))
    }

    pub fn parse_object_as_commit(&self, prefix: &ObjectIdPrefix) -> Result<Option<Commit>> {
        match self.parse_object(prefix)?.body {
            ParsedBody::Commit(commit) => Ok(Some(*commit)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tree(&self, prefix: &ObjectIdPrefix) -> Result<Option<Tree>> {
        match self.parse_object(prefix)?.body {
            ParsedBody::Tree(tree) => Ok(Some(*tree)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tag(&self, prefix: &ObjectIdPrefix) -> Result<Option<Tag>> {
        match self.parse_object(prefix)?.body {
            ParsedBody::Tag(tag) => Ok(Some(*tag)),
            _ => Ok(None),
        }
    }

    /// The one loose object matching `prefix`
    fn find_loose_object(&self, prefix: &ObjectIdPrefix) -> Result<ObjectId> {
        if let Some(oid) = prefix.to_object_id() {
            return if self.path.join(oid.to_path()).is_file() {
                Ok(oid)
            } else {
                Err(Error::ObjectNotFound(prefix.to_string()))
            };
        }

        match self.find_objects_by_prefix(prefix)?.as_slice() {
            [] => Err(Error::ObjectNotFound(prefix.to_string())),
            [oid] => Ok(*oid),
            candidates => Err(Error::AmbiguousObjectId {
                prefix: prefix.to_string(),
                candidates: candidates.len(),
            }),
        }
    }

    /// Find all loose objects whose id starts with `prefix`.
    ///
    /// Only the fan-out directory named by the first two hex characters is
    /// scanned. Files whose names are not valid ids are ignored.
    pub fn find_objects_by_prefix(&self, prefix: &ObjectIdPrefix) -> Result<Vec<ObjectId>> {
        let (dir_name, file_prefix) = prefix.as_ref().split_at(2);
        let dir_path = self.path.join(dir_name);
        let mut matches = Vec::new();

        if !dir_path.is_dir() {
            return Ok(matches);
        }

        for entry in std::fs::read_dir(&dir_path).map_err(|err| Error::io(&dir_path, err))? {
            let entry = entry.map_err(|err| Error::io(&dir_path, err))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();

            if file_name.starts_with(file_prefix)
                && let Ok(oid) = ObjectId::try_parse(&format!("{dir_name}{file_name}"))
            {
                matches.push(oid);
            }
        }

        matches.sort();
        Ok(matches)
    }

    fn read_object(&self, object_path: PathBuf) -> Result<Bytes> {
        let object_content =
            std::fs::read(&object_path).map_err(|err| Error::io(&object_path, err))?;

        Self::decompress(&object_content).map_err(|err| {
            Error::parse(
                "loose",
                format!("unable to inflate {}: {err}", object_path.display()),
            )
        })
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }
}
