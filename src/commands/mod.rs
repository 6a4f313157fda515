//! Command implementations
//!
//! Only read-only plumbing is provided; every command is an `impl Repository`
//! block writing to the repository writer.

pub mod plumbing;
