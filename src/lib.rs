//! `mhtml-split`: split MHTML web archives into standalone files.
//!
//! This crate parses an MHTML document into its MIME parts, decodes their
//! bodies, rewrites links between HTML, CSS and SVG resources so they point
//! at the extracted files, and hands back one file per part.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod rewrite;
pub mod slug;

pub use error::{MhtmlError, Result};
pub use model::file::{Content, SplitFile};
pub use parser::mhtml::{convert, MhtmlParser, ParserOptions};
