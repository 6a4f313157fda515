//! Core utilities and shared types

pub mod byte_reader;
