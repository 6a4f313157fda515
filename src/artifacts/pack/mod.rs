//! Pack file formats
//!
//! - `index`: `.idx` files mapping object ids to pack offsets (versions 1 and 2)
//! - `entry`: the variable-length header in front of every packed entry
//! - `delta`: copy/insert instruction streams applied against a base object

pub mod delta;
pub mod entry;
pub mod index;

/// Signature at the start of every `.pack` file
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
/// Size of the `.pack` header: signature, version, object count
pub const PACK_HEADER_SIZE: usize = 12;
