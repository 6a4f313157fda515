//! Plumbing commands (low-level Git operations)
//!
//! Each command resolves its argument through the repository and renders the
//! decoded objects to the repository writer.
//!
//! ## Commands
//!
//! - `cat-file`: Print an object's content, type, size or existence
//! - `ls-tree`: List the contents of a tree-ish
//! - `rev-parse`: Print the full id a name resolves to

pub mod cat_file;
pub mod ls_tree;
pub mod rev_parse;
