//! Content-Transfer-Encoding decoders: base64, quoted-printable and the identity encodings.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use tracing::warn;

use crate::error::{MhtmlError, Result};

/// Base64 engine tolerant of missing padding and stray trailing bits,
/// as produced by some archivers.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Hex digit values, `-1` for bytes that are not hex digits.
const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i += 1;
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i += 1;
    }
    t
};

/// Decode a part body according to its transfer encoding.
///
/// Dispatch is case-sensitive on `base64`, `quoted-printable`, `8bit`,
/// `7bit` and `binary`. Anything else is [`MhtmlError::UnknownEncoding`].
pub fn decode(encoding: &str, body: &[u8]) -> Result<Vec<u8>> {
    match encoding {
        "base64" => Ok(decode_base64(body)),
        "quoted-printable" => Ok(decode_quoted_printable(body)),
        "8bit" | "7bit" | "binary" => Ok(body.to_vec()),
        other => Err(MhtmlError::unknown_encoding(other, body)),
    }
}

/// Decode a base64 body. Line breaks and other whitespace are ignored.
///
/// A body that still fails to decode is kept as-is: one broken resource
/// must not abort the extraction of the others.
pub fn decode_base64(body: &[u8]) -> Vec<u8> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    match LENIENT_BASE64.decode(&compact) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(error = %e, len = body.len(), "Invalid base64 body, keeping raw bytes");
            body.to_vec()
        }
    }
}

/// Decode quoted-printable.
///
/// Deliberately lenient, matching what browsers write into MHTML files:
///
/// - `=XX` with two hex digits (either case) becomes the byte `0xXX`
/// - `=\r\n` and a bare `=\n` are soft line breaks and vanish
/// - `=` followed by two bytes that are not both hex digits is copied
///   through together with those two bytes
/// - an `=` with fewer than two bytes after it copies the tail verbatim
///
/// The output never exceeds the input length.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let n = input.len();
    let mut out = vec![0u8; n];
    let mut len = 0;
    let mut i = 0;

    while i < n {
        let b = input[i];
        if b != b'=' {
            out[len] = b;
            len += 1;
            i += 1;
            continue;
        }

        if i + 1 < n && input[i + 1] == b'\n' {
            i += 2;
            continue;
        }

        if i + 2 >= n {
            let tail = &input[i..];
            out[len..len + tail.len()].copy_from_slice(tail);
            len += tail.len();
            break;
        }

        let (h1, h2) = (input[i + 1], input[i + 2]);
        if h1 == b'3' && h2 == b'D' {
            out[len] = b'=';
            len += 1;
        } else if h1 == b'\r' && h2 == b'\n' {
            // soft line break
        } else {
            let (v1, v2) = (HEX_DECODE[h1 as usize], HEX_DECODE[h2 as usize]);
            if v1 >= 0 && v2 >= 0 {
                out[len] = ((v1 as u8) << 4) | v2 as u8;
                len += 1;
            } else {
                out[len..len + 3].copy_from_slice(&input[i..i + 3]);
                len += 3;
            }
        }
        i += 3;
    }

    out.truncate(len);
    out
}
