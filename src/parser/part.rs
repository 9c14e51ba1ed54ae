//! Parsing of a single raw MIME part: header block, header map, decoded body.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::part::Part;
use crate::parser::decoder;
use crate::parser::splitter::find_header_end;

/// At most this many stray CR/LF bytes after the header block are skipped
/// before the body begins.
const MAX_BODY_LEADING_NOISE: usize = 10;

/// Encoding assumed when a part has no `Content-Transfer-Encoding` header.
const DEFAULT_TRANSFER_ENCODING: &str = "binary";

/// Parse one raw part into a [`Part`], decoding its body.
pub fn parse_part(raw: &[u8]) -> Result<Part> {
    let (header_bytes, body) = split_header_body(raw);
    let headers = parse_headers(&decode_header_bytes(header_bytes));

    // Decoders are keyed by the raw header value; only the stored copy is
    // lower-cased.
    let raw_encoding = headers
        .get("content-transfer-encoding")
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_TRANSFER_ENCODING);
    let body = decoder::decode(raw_encoding, body)?;
    let transfer_encoding = headers
        .get("content-transfer-encoding")
        .map(|v| v.to_ascii_lowercase())
        .unwrap_or_default();

    Ok(Part {
        location: headers
            .get("content-location")
            .filter(|v| !v.is_empty())
            .cloned(),
        id: headers
            .get("content-id")
            .map(|v| strip_angle_brackets(v))
            .filter(|v| !v.is_empty()),
        mime_type: headers.get("content-type").cloned(),
        transfer_encoding,
        body,
    })
}

/// Split a raw part into its header block and its (still encoded) body.
///
/// A part without a blank line has no headers; the whole span is body.
pub fn split_header_body(raw: &[u8]) -> (&[u8], &[u8]) {
    let Some(header_end) = find_header_end(raw) else {
        return (&[], raw);
    };

    let mut start = header_end + 1;
    while start < raw.len()
        && start < header_end + MAX_BODY_LEADING_NOISE
        && (raw[start] == b'\r' || raw[start] == b'\n')
    {
        start += 1;
    }
    (&raw[..header_end], &raw[start.min(raw.len())..])
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parse a header block into a map keyed by lower-cased header name.
///
/// Continuation lines (leading space or tab) are joined to the previous
/// header. Names and values are separated by the first `": "`. Repeated
/// headers keep the last value.
pub fn parse_headers(text: &str) -> HashMap<String, String> {
    let mut unfolded: Vec<(String, String)> = Vec::new();

    for line in text.trim().lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = unfolded.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(": ") {
            unfolded.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    unfolded.into_iter().collect()
}

/// Strip the angle brackets around a `Content-ID` value, if present.
fn strip_angle_brackets(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(trimmed)
        .to_string()
}
