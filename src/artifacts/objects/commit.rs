//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! Headers this reader does not model (`encoding`, `gpgsig`, `mergetag`) are
//! skipped.

use crate::artifacts::objects::actor::Actor;
use crate::artifacts::objects::object::{HeaderBlock, Packable, Unpackable, parse_oid_token};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use bytes::Bytes;

const KIND: &str = "commit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Tree object ID representing the directory snapshot
    tree: ObjectId,
    /// Parent commit IDs in header order (empty for a root commit)
    parents: Vec<ObjectId>,
    author: Actor,
    committer: Actor,
    message: String,
}

impl Commit {
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: Actor,
        committer: Actor,
        message: String,
    ) -> Self {
        Commit {
            tree,
            parents,
            author,
            committer,
            message,
        }
    }

    pub fn tree(&self) -> &ObjectId {
        &self.tree
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Actor {
        &self.author
    }

    pub fn committer(&self) -> &Actor {
        &self.committer
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn display(&self) -> String {
        let mut lines = vec![format!("tree {}", self.tree)];
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.clone());

        lines.join("\n")
    }
}

impl Packable for Commit {
    fn serialize(&self) -> Bytes {
        let mut content = self.display();
        if !self.message.is_empty() {
            content.push('\n');
        }

        Bytes::from(content)
    }
}

impl Unpackable for Commit {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        let block = HeaderBlock::parse(KIND, payload)?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for (key, tokens) in &block.headers {
            match *key {
                "tree" => tree = Some(parse_oid_token(KIND, key, tokens)?),
                "parent" => parents.push(parse_oid_token(KIND, key, tokens)?),
                "author" => author = Some(Actor::from_tokens(KIND, tokens)?),
                "committer" => committer = Some(Actor::from_tokens(KIND, tokens)?),
                _ => {}
            }
        }

        Ok(Commit {
            tree: tree.ok_or_else(|| Error::parse(KIND, "missing tree header"))?,
            parents,
            author: author.ok_or_else(|| Error::parse(KIND, "missing author header"))?,
            committer: committer.ok_or_else(|| Error::parse(KIND, "missing committer header"))?,
            message: block.message,
        })
    }
}
