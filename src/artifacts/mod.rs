//! Git data structures and decoders
//!
//! - `core`: The bounds-checked byte cursor shared by the binary decoders
//! - `objects`: Object ids and the object types (blob, tree, commit, tag)
//! - `pack`: Pack index, pack entry header and delta decoding

pub mod core;
pub mod objects;
pub mod pack;
