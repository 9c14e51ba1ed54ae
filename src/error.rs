//! Centralized error types for mhtml-split.

use std::path::PathBuf;
use thiserror::Error;

/// Number of body bytes kept in [`MhtmlError::UnknownEncoding`] for diagnostics.
const EXCERPT_LEN: usize = 64;

/// All errors produced by the mhtml-split library.
///
/// Only structural failures live here. Content-level anomalies (bad links,
/// oversized parts, malformed CSS) are recovered where they occur.
#[derive(Error, Debug)]
pub enum MhtmlError {
    /// The top-level header block has no `boundary="..."` attribute.
    #[error("No multipart boundary found in the top-level headers")]
    NoBoundary,

    /// A part declares a Content-Transfer-Encoding we cannot decode.
    #[error("Unknown transfer encoding '{encoding}' (body starts with: {excerpt:?})")]
    UnknownEncoding { encoding: String, excerpt: String },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("MHTML file not found: {0}")]
    FileNotFound(PathBuf),

    /// An export operation failed.
    #[error("Export error: {0}")]
    ExportError(String),

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, MhtmlError>`.
pub type Result<T> = std::result::Result<T, MhtmlError>;

impl MhtmlError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an `UnknownEncoding` variant, keeping a short excerpt of the body.
    pub fn unknown_encoding(encoding: &str, body: &[u8]) -> Self {
        let end = body.len().min(EXCERPT_LEN);
        Self::UnknownEncoding {
            encoding: encoding.to_string(),
            excerpt: String::from_utf8_lossy(&body[..end]).into_owned(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MhtmlError::io`).
impl From<std::io::Error> for MhtmlError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_encoding_excerpt_is_truncated() {
        let body = vec![b'a'; 200];
        match MhtmlError::unknown_encoding("kaka", &body) {
            MhtmlError::UnknownEncoding { encoding, excerpt } => {
                assert_eq!(encoding, "kaka");
                assert_eq!(excerpt.len(), EXCERPT_LEN);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            MhtmlError::NoBoundary.to_string(),
            "No multipart boundary found in the top-level headers"
        );
        let err = MhtmlError::unknown_encoding("uuencode", b"hello");
        assert!(err.to_string().contains("uuencode"));
        assert!(err.to_string().contains("hello"));
    }
}
