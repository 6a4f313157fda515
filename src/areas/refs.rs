//! Git references (HEAD, branches, tags, remotes)
//!
//! A name is looked up under a fixed list of candidate paths inside the git
//! directory. Each candidate is read as a loose ref file first and, when no
//! such file exists, looked up in `packed-refs`.
//!
//! ## File Format
//!
//! Loose ref files contain either:
//! - A 40-character SHA-1 hash (direct reference)
//! - `ref: <path>` for symbolic references
//!
//! `packed-refs` holds `<sha1> <refname>` lines; comments (`#`) and peeled
//! annotations (`^<sha1>`) are skipped.

use crate::artifacts::objects::object_id::{ObjectId, ObjectIdPrefix};
use crate::errors::{Error, Result};
use derive_new::new;
use std::collections::HashMap;
use std::path::{Component, Path};

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Regex pattern for `packed-refs` lines
const PACKED_REF_REGEX: &str = r"^([0-9a-f]{40}) (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

const PACKED_REFS_FILE: &str = "packed-refs";

/// Paths tried, in order, for a ref name
const CANDIDATE_PATTERNS: [&str; 6] = [
    "{}",
    "refs/{}",
    "refs/tags/{}",
    "refs/heads/{}",
    "refs/remotes/{}",
    "refs/remotes/{}/HEAD",
];

/// Reference resolver rooted at a git directory
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
    /// Symbolic ref hops followed before giving up
    max_depth: usize,
}

/// Content of a loose ref file
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef { target: String },
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn parse(content: &str) -> Option<SymRefOrOid> {
        let content = content.trim();

        if let Ok(oid) = ObjectId::try_parse(content) {
            return Some(SymRefOrOid::Oid(oid));
        }

        regex::Regex::new(SYMREF_REGEX)
            .ok()?
            .captures(content)
            .map(|symref_match| SymRefOrOid::SymRef {
                target: symref_match[1].to_string(),
            })
    }
}

/// Outcome of walking the candidate paths for one name
enum Lookup {
    Found(ObjectId),
    /// Nothing matched; carries the name that ended the walk
    Unmatched(String),
}

impl Refs {
    /// Resolve `name` to an object id, or to the name itself taken as a
    /// (possibly abbreviated) id when no ref matches.
    ///
    /// The returned prefix is not checked against the object database.
    pub fn resolve(&self, name: &str) -> Result<ObjectIdPrefix> {
        let packed_refs = self.packed_refs()?;

        match self.lookup(name, &packed_refs, 0)? {
            Lookup::Found(oid) => Ok(oid.into()),
            Lookup::Unmatched(literal) => {
                tracing::debug!(name, %literal, "no ref matched, using name as an id");
                ObjectIdPrefix::try_parse(&literal).map_err(|_| Error::RefNotFound(literal))
            }
        }
    }

    /// The full id `name` points at, when it names an existing ref
    pub fn read_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        match self.lookup(name, &self.packed_refs()?, 0)? {
            Lookup::Found(oid) => Ok(Some(oid)),
            Lookup::Unmatched(_) => Ok(None),
        }
    }

    pub fn read_head(&self) -> Result<Option<ObjectId>> {
        self.read_ref(HEAD_REF_NAME)
    }

    fn lookup(
        &self,
        name: &str,
        packed_refs: &HashMap<String, ObjectId>,
        depth: usize,
    ) -> Result<Lookup> {
        if depth > self.max_depth {
            return Err(Error::CyclicReference {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        for candidate in Self::candidates(name) {
            if let Some(content) = self.read_loose_ref(&candidate) {
                match SymRefOrOid::parse(&content) {
                    Some(SymRefOrOid::Oid(oid)) => {
                        tracing::debug!(name, %candidate, %oid, "resolved loose ref");
                        return Ok(Lookup::Found(oid));
                    }
                    Some(SymRefOrOid::SymRef { target }) => {
                        tracing::debug!(name, %candidate, %target, depth, "following symbolic ref");
                        return self.lookup(&target, packed_refs, depth + 1);
                    }
                    None => {
                        tracing::warn!(%candidate, "ignoring malformed ref file");
                    }
                }
            }

            if let Some(oid) = packed_refs.get(&candidate) {
                tracing::debug!(name, %candidate, %oid, "resolved packed ref");
                return Ok(Lookup::Found(*oid));
            }
        }

        Ok(Lookup::Unmatched(name.to_string()))
    }

    fn candidates(name: &str) -> impl Iterator<Item = String> + '_ {
        CANDIDATE_PATTERNS
            .iter()
            .map(move |pattern| pattern.replace("{}", name))
    }

    /// Content of the loose ref file at `candidate`, if one can be read
    fn read_loose_ref(&self, candidate: &str) -> Option<String> {
        if !Self::is_safe_ref_path(candidate) {
            return None;
        }

        let path = self.path.join(candidate);
        if !path.is_file() {
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                tracing::warn!(?path, %err, "unable to read ref file");
                None
            }
        }
    }

    /// Relative paths without `..`, so a lookup never leaves the git dir
    fn is_safe_ref_path(candidate: &str) -> bool {
        !candidate.is_empty()
            && Path::new(candidate)
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
    }

    /// Parse `packed-refs` into a refname -> id map; empty when the file is
    /// missing
    fn packed_refs(&self) -> Result<HashMap<String, ObjectId>> {
        let path = self.path.join(PACKED_REFS_FILE);
        if !path.is_file() {
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(&path).map_err(|err| Error::io(&path, err))?;
        let line_regex = regex::Regex::new(PACKED_REF_REGEX)
            .map_err(|err| Error::parse(PACKED_REFS_FILE, err.to_string()))?;

        let refs = content
            .lines()
            .filter_map(|line| line_regex.captures(line))
            .filter_map(|captures| {
                let oid = ObjectId::try_parse(&captures[1]).ok()?;
                Some((captures[2].to_string(), oid))
            })
            .collect::<HashMap<_, _>>();

        tracing::debug!(refs = refs.len(), "loaded packed refs");

        Ok(refs)
    }
}
