use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::{OBJECT_ID_BYTES, ObjectId};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, Result};
use bytes::Bytes;
use sha1::{Digest, Sha1};

pub trait Packable {
    /// Canonical payload bytes, without the `<type> <size>\0` header
    fn serialize(&self) -> Bytes;
}

pub trait Unpackable {
    fn deserialize(payload: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Decoded body of an object, one variant per object type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedBody {
    Commit(Box<Commit>),
    Tree(Box<Tree>),
    Blob(Box<Blob>),
    Tag(Box<Tag>),
}

impl ParsedBody {
    pub fn parse(object_type: ObjectType, payload: &[u8]) -> Result<Self> {
        Ok(match object_type {
            ObjectType::Commit => ParsedBody::Commit(Box::new(Commit::deserialize(payload)?)),
            ObjectType::Tree => ParsedBody::Tree(Box::new(Tree::deserialize(payload)?)),
            ObjectType::Blob => ParsedBody::Blob(Box::new(Blob::deserialize(payload)?)),
            ObjectType::Tag => ParsedBody::Tag(Box::new(Tag::deserialize(payload)?)),
        })
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            ParsedBody::Commit(_) => ObjectType::Commit,
            ParsedBody::Tree(_) => ObjectType::Tree,
            ParsedBody::Blob(_) => ObjectType::Blob,
            ParsedBody::Tag(_) => ObjectType::Tag,
        }
    }

    pub fn serialize(&self) -> Bytes {
        match self {
            ParsedBody::Commit(commit) => commit.serialize(),
            ParsedBody::Tree(tree) => tree.serialize(),
            ParsedBody::Blob(blob) => blob.serialize(),
            ParsedBody::Tag(tag) => tag.serialize(),
        }
    }
}

/// A fully decoded object: its type, declared size and structured body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub object_type: ObjectType,
    pub size: u64,
    pub body: ParsedBody,
}

impl ObjectRecord {
    /// Parse `"<type> <size>\0<payload>"`, the framing shared by loose and
    /// packed objects
    pub fn parse(framed: &[u8]) -> Result<Self> {
        let (object_type, size, payload) = split_header(framed)?;

        if size != payload.len() as u64 {
            return Err(Error::parse(
                object_type.as_str(),
                format!("header declares {size} bytes, payload has {}", payload.len()),
            ));
        }

        Ok(ObjectRecord {
            object_type,
            size,
            body: ParsedBody::parse(object_type, payload)?,
        })
    }

    /// Hash of the re-serialized object; equals the id it was stored under
    pub fn object_id(&self) -> ObjectId {
        let payload = self.body.serialize();
        let mut hasher = Sha1::new();
        hasher.update(frame(self.object_type, &payload));

        let mut digest = [0u8; OBJECT_ID_BYTES];
        digest.copy_from_slice(&hasher.finalize());
        ObjectId::from_bytes(digest)
    }
}

/// Prefix `payload` with its `"<type> <size>\0"` header
pub fn frame(object_type: ObjectType, payload: &[u8]) -> Bytes {
    let header = format!("{} {}\0", object_type.as_str(), payload.len());
    let mut framed = Vec::with_capacity(header.len() + payload.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(payload);

    Bytes::from(framed)
}

/// Split a framed object into its type, declared size and payload
pub fn split_header(framed: &[u8]) -> Result<(ObjectType, u64, &[u8])> {
    let nul = framed
        .iter()
        .position(|byte| *byte == 0)
        .ok_or_else(|| Error::parse("object", "missing NUL after header"))?;
    let header = std::str::from_utf8(&framed[..nul])
        .map_err(|_| Error::parse("object", "header is not UTF-8"))?;

    let (object_type, size) = header
        .split_once(' ')
        .ok_or_else(|| Error::parse("object", format!("malformed header {header:?}")))?;
    let object_type = ObjectType::try_from(object_type)?;
    let size = size
        .parse::<u64>()
        .map_err(|_| Error::parse(object_type.as_str(), format!("invalid size {size:?}")))?;

    Ok((object_type, size, &framed[nul + 1..]))
}

/// Header lines and message of a commit or tag payload
///
/// Lines up to the first empty line are split on whitespace into a key and
/// its tokens; everything after it, rejoined and trimmed, is the message.
pub(crate) struct HeaderBlock<'p> {
    pub(crate) headers: Vec<(&'p str, Vec<&'p str>)>,
    pub(crate) message: String,
}

impl<'p> HeaderBlock<'p> {
    pub(crate) fn parse(kind: &'static str, payload: &'p [u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|err| Error::parse(kind, format!("payload is not UTF-8: {err}")))?;

        let mut lines = text.split('\n');
        let mut headers = Vec::new();

        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let mut tokens = line.split_whitespace();
            // continuation lines of multi-line headers (e.g. gpgsig) start
            // with a space and carry no key of their own
            let key = if line.starts_with(char::is_whitespace) {
                ""
            } else {
                tokens.next().unwrap_or_default()
            };
            headers.push((key, tokens.collect()));
        }

        let message = lines.collect::<Vec<_>>().join("\n").trim().to_string();

        Ok(HeaderBlock { headers, message })
    }
}

pub(crate) fn parse_oid_token(kind: &'static str, key: &str, tokens: &[&str]) -> Result<ObjectId> {
    let token = tokens
        .first()
        .ok_or_else(|| Error::parse(kind, format!("{key} header has no value")))?;

    ObjectId::try_parse(token)
        .map_err(|_| Error::parse(kind, format!("{key} header has invalid id {token}")))
}
