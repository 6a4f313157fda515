//! Git annotated tag object
//!
//! ## Format
//!
//! ```text
//! tag <size>\0
//! object <target-sha>
//! type <target-type>
//! tag <tag-name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <tag message>
//! ```

use crate::artifacts::objects::actor::Actor;
use crate::artifacts::objects::object::{HeaderBlock, Packable, Unpackable, parse_oid_token};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use bytes::Bytes;

const KIND: &str = "tag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    object: ObjectId,
    target_type: String,
    tag: String,
    tagger: Actor,
    message: String,
}

impl Tag {
    pub fn new(
        object: ObjectId,
        target_type: String,
        tag: String,
        tagger: Actor,
        message: String,
    ) -> Self {
        Tag {
            object,
            target_type,
            tag,
            tagger,
            message,
        }
    }

    /// Id of the tagged object
    pub fn object(&self) -> &ObjectId {
        &self.object
    }

    /// Type name of the tagged object, as written in the `type` header
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn tagger(&self) -> &Actor {
        &self.tagger
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn display(&self) -> String {
        [
            format!("object {}", self.object),
            format!("type {}", self.target_type),
            format!("tag {}", self.tag),
            format!("tagger {}", self.tagger.display()),
            String::new(),
            self.message.clone(),
        ]
        .join("\n")
    }
}

impl Packable for Tag {
    fn serialize(&self) -> Bytes {
        let mut content = self.display();
        if !self.message.is_empty() {
            content.push('\n');
        }

        Bytes::from(content)
    }
}

impl Unpackable for Tag {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        let block = HeaderBlock::parse(KIND, payload)?;

        let mut object = None;
        let mut target_type = None;
        let mut tag = None;
        let mut tagger = None;

        for (key, tokens) in &block.headers {
            match *key {
                "object" => object = Some(parse_oid_token(KIND, key, tokens)?),
                "type" => target_type = tokens.first().map(|value| value.to_string()),
                "tag" => tag = tokens.first().map(|value| value.to_string()),
                "tagger" => tagger = Some(Actor::from_tokens(KIND, tokens)?),
                _ => {}
            }
        }

        Ok(Tag {
            object: object.ok_or_else(|| Error::parse(KIND, "missing object header"))?,
            target_type: target_type.ok_or_else(|| Error::parse(KIND, "missing type header"))?,
            tag: tag.ok_or_else(|| Error::parse(KIND, "missing tag header"))?,
            tagger: tagger.ok_or_else(|| Error::parse(KIND, "missing tagger header"))?,
            message: block.message,
        })
    }
}
