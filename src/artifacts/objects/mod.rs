//! Git object types and operations
//!
//! Git stores all content as objects identified by SHA-1 hashes. There are four main types:
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//! - **Tag**: Annotated reference to another object
//!
//! Loose and packed objects share the framing `<type> <size>\0<content>`;
//! [`object::ObjectRecord`] decodes it into a typed body.

pub mod actor;
pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tag;
pub mod tree;
