//! Reader configuration
//!
//! Holds the location of the git directory and the bounds applied while
//! following symbolic refs and delta chains.

use crate::errors::{Error, Result};
use std::path::{Path, PathBuf};

/// Default number of symbolic ref hops before giving up
pub const DEFAULT_MAX_REF_DEPTH: usize = 10;
/// Default number of delta links followed while rebuilding one packed object
pub const DEFAULT_MAX_DELTA_DEPTH: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the git directory (typically `.git`)
    pub git_dir: PathBuf,
    pub max_ref_depth: usize,
    pub max_delta_depth: usize,
    /// Verify the trailing SHA-1 of every pack index on load
    pub verify_index_checksum: bool,
}

impl Config {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Config {
            git_dir: git_dir.into(),
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
            max_delta_depth: DEFAULT_MAX_DELTA_DEPTH,
            verify_index_checksum: true,
        }
    }

    pub fn with_max_ref_depth(mut self, max_ref_depth: usize) -> Self {
        self.max_ref_depth = max_ref_depth;
        self
    }

    pub fn with_max_delta_depth(mut self, max_delta_depth: usize) -> Self {
        self.max_delta_depth = max_delta_depth;
        self
    }

    pub fn with_index_checksum(mut self, verify: bool) -> Self {
        self.verify_index_checksum = verify;
        self
    }

    /// Locate the git directory for `start`
    ///
    /// Checks `start/.git`, then `start` itself (bare layout), then every
    /// ancestor of `start` in turn.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = start.canonicalize().map_err(|err| Error::io(start, err))?;

        for dir in start.ancestors() {
            let dot_git = dir.join(".git");
            if dot_git.is_dir() {
                tracing::debug!(git_dir = ?dot_git, "discovered repository");
                return Ok(Self::new(dot_git));
            }
            if Self::looks_like_git_dir(dir) {
                tracing::debug!(git_dir = ?dir, "discovered bare repository");
                return Ok(Self::new(dir));
            }
        }

        Err(Error::io(
            start,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not a git repository (or any of the parent directories)",
            ),
        ))
    }

    pub fn objects_path(&self) -> PathBuf {
        self.git_dir.join("objects")
    }

    fn looks_like_git_dir(dir: &Path) -> bool {
        dir.join("objects").is_dir() && dir.join("HEAD").is_file()
    }
}
