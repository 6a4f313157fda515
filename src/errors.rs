//! Typed failures of the object reader
//!
//! Every input is an immutable on-disk artifact, so none of these are retried.
//! The binary maps each kind to its own exit status through [`Error::exit_code`].

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("ref not found: {0}")]
    RefNotFound(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("short object id {prefix} is ambiguous ({candidates} candidates)")]
    AmbiguousObjectId { prefix: String, candidates: usize },

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("corrupt pack index {name}: {reason}")]
    CorruptIndex { name: String, reason: String },

    #[error("corrupt pack entry: {0}")]
    CorruptPackEntry(String),

    #[error("delta base size mismatch: delta expects {expected} bytes, base has {actual}")]
    DeltaSizeMismatch { expected: u64, actual: u64 },

    #[error("failed to parse {kind} object: {reason}")]
    ParseError { kind: &'static str, reason: String },

    #[error("reference chain starting at {name} exceeds {limit} hops")]
    CyclicReference { name: String, limit: usize },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(kind: &'static str, reason: impl Into<String>) -> Self {
        Error::ParseError {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_index(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptIndex {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status reported by the command line tool for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::RefNotFound(_) => 2,
            Error::ObjectNotFound(_) => 3,
            Error::AmbiguousObjectId { .. } => 4,
            Error::InvalidObjectId(_) => 5,
            Error::CorruptIndex { .. } => 6,
            Error::CorruptPackEntry(_) => 7,
            Error::DeltaSizeMismatch { .. } => 8,
            Error::ParseError { .. } => 9,
            Error::CyclicReference { .. } => 10,
            Error::Io { .. } => 11,
        }
    }
}
