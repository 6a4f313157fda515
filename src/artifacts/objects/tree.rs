//! Git tree object
//!
//! Trees represent directory snapshots. They list files (blobs), symlinks,
//! submodules and subdirectories (other trees) along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! The leading digits of the mode select the entry kind (`40`, `100`, `120`,
//! `160`); the three permission digits after them are kept verbatim.

use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::{OBJECT_ID_BYTES, ObjectId};
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::borrow::Cow;

const KIND: &str = "tree";

/// Regex splitting a mode into its kind prefix and permission digits
const MODE_REGEX: &str = r"^(40|100|120|160)(\d{3})$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeEntryKind {
    Tree,
    Blob,
    Symlink,
    Submodule,
}

static ENTRY_KINDS: phf::Map<&'static str, TreeEntryKind> = phf::phf_map! {
    "40" => TreeEntryKind::Tree,
    "100" => TreeEntryKind::Blob,
    "120" => TreeEntryKind::Symlink,
    "160" => TreeEntryKind::Submodule,
};

impl TreeEntryKind {
    pub fn mode_prefix(&self) -> &'static str {
        match self {
            TreeEntryKind::Tree => "40",
            TreeEntryKind::Blob => "100",
            TreeEntryKind::Symlink => "120",
            TreeEntryKind::Submodule => "160",
        }
    }

    /// Type of the object the entry points at; submodules point at commits
    pub fn object_type(&self) -> ObjectType {
        match self {
            TreeEntryKind::Tree => ObjectType::Tree,
            TreeEntryKind::Blob | TreeEntryKind::Symlink => ObjectType::Blob,
            TreeEntryKind::Submodule => ObjectType::Commit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub kind: TreeEntryKind,
    /// Permission digits following the kind prefix, e.g. `644`
    pub mode_digits: String,
    /// Name bytes as stored; git does not require them to be UTF-8
    pub raw_name: Bytes,
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Full octal mode as stored, e.g. `100644` or `40000`
    pub fn mode(&self) -> String {
        format!("{}{}", self.kind.mode_prefix(), self.mode_digits)
    }

    /// Name as text, invalid UTF-8 sequences replaced
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw_name)
    }

    pub fn is_tree(&self) -> bool {
        self.kind == TreeEntryKind::Tree
    }
}

/// Entries in the order they are stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Tree { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> impl Iterator<Item = TreeEntry> {
        self.entries.into_iter()
    }

    /// `ls-tree` style listing: `<mode> <type> <id>\t<name>`
    pub fn display(&self) -> String {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{:0>6} {} {}\t{}",
                    entry.mode(),
                    entry.kind.object_type(),
                    entry.oid,
                    entry.name()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Packable for Tree {
    fn serialize(&self) -> Bytes {
        let mut content = Vec::new();

        for entry in &self.entries {
            content.extend_from_slice(entry.mode().as_bytes());
            content.push(b' ');
            content.extend_from_slice(&entry.raw_name);
            content.push(0);
            content.extend_from_slice(entry.oid.as_bytes());
        }

        Bytes::from(content)
    }
}

impl Unpackable for Tree {
    fn deserialize(payload: &[u8]) -> Result<Self> {
        let mode_regex =
            regex::Regex::new(MODE_REGEX).map_err(|err| Error::parse(KIND, err.to_string()))?;
        let mut entries = Vec::new();
        let mut rest = payload;

        while !rest.is_empty() {
            let offset = payload.len() - rest.len();
            let nul = rest
                .iter()
                .position(|byte| *byte == 0)
                .ok_or_else(|| Error::parse(KIND, format!("unterminated entry at byte {offset}")))?;

            let header = &rest[..nul];
            let malformed = || {
                Error::parse(
                    KIND,
                    format!("malformed entry {:?}", String::from_utf8_lossy(header)),
                )
            };
            let space = header
                .iter()
                .position(|byte| *byte == b' ')
                .filter(|space| space + 1 < header.len())
                .ok_or_else(malformed)?;
            let mode = std::str::from_utf8(&header[..space]).map_err(|_| malformed())?;
            let raw_name = &header[space + 1..];
            let name = String::from_utf8_lossy(raw_name);
            let captures = mode_regex
                .captures(mode)
                .ok_or_else(|| Error::parse(KIND, format!("unknown mode {mode} for {name}")))?;
            let kind = ENTRY_KINDS
                .get(&captures[1])
                .copied()
                .ok_or_else(|| Error::parse(KIND, format!("unknown mode {mode} for {name}")))?;

            let oid_bytes = rest
                .get(nul + 1..nul + 1 + OBJECT_ID_BYTES)
                .ok_or_else(|| Error::parse(KIND, format!("truncated id for {name}")))?;
            let mut raw = [0u8; OBJECT_ID_BYTES];
            raw.copy_from_slice(oid_bytes);

            entries.push(TreeEntry {
                kind,
                mode_digits: captures[2].to_string(),
                raw_name: Bytes::copy_from_slice(raw_name),
                oid: ObjectId::from_bytes(raw),
            });

            rest = &rest[nul + 1 + OBJECT_ID_BYTES..];
        }

        Ok(Tree { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry_bytes(mode: &str, name: &str, fill: u8) -> Vec<u8> {
        let mut bytes = format!("{mode} {name}\0").into_bytes();
        bytes.extend_from_slice(&[fill; OBJECT_ID_BYTES]);
        bytes
    }

    #[test]
    fn parses_entries_in_stored_order() {
        let payload = [
            entry_bytes("100644", "a.txt", 0x11),
            entry_bytes("40000", "dir", 0x22),
            entry_bytes("120000", "link", 0x33),
        ]
        .concat();

        let tree = Tree::deserialize(&payload).unwrap();
        let entries = tree.entries();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![TreeEntryKind::Blob, TreeEntryKind::Tree, TreeEntryKind::Symlink]
        );
        assert_eq!(
            entries.iter().map(|e| e.name()).collect::<Vec<_>>(),
            vec!["a.txt", "dir", "link"]
        );
        assert_eq!(entries[0].mode_digits, "644");
        assert_eq!(entries[1].mode_digits, "000");
        assert_eq!(entries[1].oid.as_bytes(), &[0x22; OBJECT_ID_BYTES]);
        assert_eq!(entries[2].oid.as_bytes(), &[0x33; OBJECT_ID_BYTES]);
        assert_eq!(&tree.serialize()[..], &payload[..]);
    }

    #[test]
    fn submodules_point_at_commits() {
        let payload = entry_bytes("160000", "vendor", 0x44);

        let tree = Tree::deserialize(&payload).unwrap();

        assert_eq!(tree.entries()[0].kind, TreeEntryKind::Submodule);
        assert_eq!(tree.entries()[0].kind.object_type(), ObjectType::Commit);
        assert!(tree.display().starts_with("160000 commit 4444"));
    }

    #[test]
    fn display_pads_directory_modes() {
        let tree = Tree::deserialize(&entry_bytes("40000", "src", 0xab)).unwrap();

        assert_eq!(
            tree.display(),
            format!("040000 tree {}\tsrc", "ab".repeat(OBJECT_ID_BYTES))
        );
    }

    #[test]
    fn keeps_names_that_are_not_utf8() {
        let mut payload = b"100644 caf\xe9.txt\0".to_vec();
        payload.extend_from_slice(&[0x55; OBJECT_ID_BYTES]);

        let tree = Tree::deserialize(&payload).unwrap();
        let entry = &tree.entries()[0];

        assert_eq!(&entry.raw_name[..], b"caf\xe9.txt");
        assert_eq!(entry.name(), "caf\u{fffd}.txt");
        assert_eq!(&tree.serialize()[..], &payload[..]);
    }

    #[test]
    fn rejects_unknown_modes_and_truncated_ids() {
        assert!(Tree::deserialize(&entry_bytes("100645x", "a", 0)).is_err());
        assert!(Tree::deserialize(&entry_bytes("200644", "a", 0)).is_err());

        let mut truncated = entry_bytes("100644", "a", 0);
        truncated.truncate(truncated.len() - 1);
        assert!(matches!(
            Tree::deserialize(&truncated),
            Err(Error::ParseError { kind: "tree", .. })
        ));
    }
}
