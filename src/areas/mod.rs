//! Stateful repository components
//!
//! - `database`: Object database, packs first with a loose object fallback
//! - `packfile`: Pack index set and delta-aware pack entry reader
//! - `refs`: Reference resolution (HEAD, branches, tags, remotes, packed refs)
//! - `repository`: Wires refs, database and the output writer together

pub mod database;
pub mod packfile;
pub mod refs;
pub mod repository;
