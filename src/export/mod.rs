//! Writing conversion results to disk.

pub mod files;
