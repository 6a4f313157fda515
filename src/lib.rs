//! Read-only access to a git object database
//!
//! Names are resolved through [`areas::refs::Refs`], objects are looked up in
//! the pack files first ([`areas::packfile::PackfileStore`]) and then as loose
//! files, and the inflated bytes are decoded into
//! [`artifacts::objects::object::ObjectRecord`] values.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;
