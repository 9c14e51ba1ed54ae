//! Core data model types: parsed MIME parts and emitted files.

pub mod file;
pub mod part;
