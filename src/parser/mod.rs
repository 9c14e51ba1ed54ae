//! MHTML parsing: multipart splitting, part headers, transfer decoding and the
//! parse / rewrite / spit pipeline.

pub mod decoder;
pub mod mhtml;
pub mod part;
pub mod splitter;
