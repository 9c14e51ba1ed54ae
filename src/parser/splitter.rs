//! Top-level multipart splitting: header block detection, boundary extraction
//! and a lazy iterator over the raw parts.
//!
//! Everything here works on raw bytes. Nothing is decoded before the part
//! boundaries are known, so binary bodies are sliced exactly.

use std::sync::OnceLock;

use memchr::memmem;
use regex::bytes::Regex;
use tracing::debug;

use crate::error::{MhtmlError, Result};

/// Default maximum size of a raw part in bytes (50 MB).
pub const DEFAULT_MAX_PART_SIZE: usize = 50_000_000;

/// Spans between two boundaries this short are empty filler, never parts.
const MIN_PART_SPAN: usize = 12;

fn boundary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)boundary="([^"]*)""#).expect("valid boundary regex"))
}

/// Find the offset of the blank line terminating a header block.
///
/// Matches `\r\n\r\n` or `\n\n` byte-exactly and returns the offset of the
/// first line terminator of the pair.
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    let len = data.len();
    let mut i = 0;
    while i < len {
        match data[i] {
            b'\r' => {
                if i + 3 < len && data[i + 1] == b'\n' && data[i + 2] == b'\r' && data[i + 3] == b'\n'
                {
                    return Some(i);
                }
            }
            b'\n' => {
                if i + 1 < len && data[i + 1] == b'\n' {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Extract the boundary token from a `boundary="..."` attribute in a header block.
pub fn extract_boundary(header: &[u8]) -> Result<Vec<u8>> {
    boundary_regex()
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_bytes())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_vec())
        .ok_or(MhtmlError::NoBoundary)
}

/// Split a complete MHTML document into raw parts.
///
/// Fails with [`MhtmlError::NoBoundary`] if the top-level headers declare no
/// boundary. The returned iterator is lazy: parts are located as it advances.
pub fn split(data: &[u8], max_part_size: usize) -> Result<BoundarySplitter<'_>> {
    let header_end = find_header_end(data).unwrap_or(data.len());
    let token = extract_boundary(&data[..header_end])?;

    let mut separator = Vec::with_capacity(token.len() + 2);
    separator.extend_from_slice(b"--");
    separator.extend_from_slice(&token);

    Ok(BoundarySplitter::new(data, &separator, header_end, max_part_size))
}

/// Lazy, finite iterator over the raw parts between consecutive boundaries.
///
/// Each item is the slice just past one boundary up to the start of the
/// next. Spans of at most 12 bytes are skipped as filler, spans larger than
/// the configured maximum are dropped without error.
pub struct BoundarySplitter<'a> {
    data: &'a [u8],
    finder: memmem::Finder<'static>,
    separator_len: usize,
    max_part_size: usize,
    previous: Option<usize>,
    dropped: usize,
}

impl<'a> BoundarySplitter<'a> {
    /// Create a splitter that starts looking for `separator` at `start`.
    pub fn new(data: &'a [u8], separator: &[u8], start: usize, max_part_size: usize) -> Self {
        let finder = memmem::Finder::new(separator).into_owned();
        let start = start.min(data.len());
        let previous = finder.find(&data[start..]).map(|off| start + off);
        Self {
            data,
            finder,
            separator_len: separator.len(),
            max_part_size,
            previous,
            dropped: 0,
        }
    }

    /// Number of oversized parts skipped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<'a> Iterator for BoundarySplitter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let from = self.previous?;
            let search_start = (from + self.separator_len).min(self.data.len());
            let Some(off) = self.finder.find(&self.data[search_start..]) else {
                self.previous = None;
                return None;
            };
            let index = search_start + off;
            self.previous = Some(index);

            let span = index - from;
            if span <= MIN_PART_SPAN {
                continue;
            }
            if span > self.max_part_size {
                self.dropped += 1;
                debug!(
                    offset = from,
                    size = span,
                    max_size = self.max_part_size,
                    "Skipping oversized part"
                );
                continue;
            }
            return Some(&self.data[from + self.separator_len..index]);
        }
    }
}
