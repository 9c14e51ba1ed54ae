//! Output files produced by a conversion.

/// Fallback MIME type for parts that declare no `Content-Type`.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Content of an emitted file.
///
/// Inputs given as text produce [`Content::Text`]; byte inputs produce
/// [`Content::Bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Bytes(Vec<u8>),
    Text(String),
}

impl Content {
    /// Raw bytes of the content, regardless of representation.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Bytes(b) => b,
            Content::Text(s) => s.as_bytes(),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lossy text view of the content.
    pub fn to_text(&self) -> String {
        match self {
            Content::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Content::Text(s) => s.clone(),
        }
    }
}

/// One resource extracted from the archive, ready to be written out.
///
/// One `SplitFile` is emitted per kept part, in original part order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SplitFile {
    /// Output filename, computed by the rewrite function.
    pub filename: String,

    /// Rewritten (or untouched) body.
    #[serde(skip)]
    pub content: Content,

    /// Declared MIME type of the part.
    #[serde(rename = "type")]
    pub mime_type: String,
}
