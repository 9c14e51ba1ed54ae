//! A single decoded part of an MHTML archive.

/// One MIME part after header parsing and transfer decoding.
///
/// Created once per raw part during parsing. The body is replaced exactly
/// once, during rewriting, and the part lives until the parse session ends.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Absolute `Content-Location` of the resource, if declared.
    pub location: Option<String>,

    /// `Content-ID` with the surrounding angle brackets removed.
    /// Referenced from other parts as `cid:<id>` (typically frames).
    pub id: Option<String>,

    /// Declared `Content-Type` header value, verbatim.
    pub mime_type: Option<String>,

    /// `Content-Transfer-Encoding`, lower-cased. Empty when the header is missing.
    pub transfer_encoding: String,

    /// Decoded body bytes.
    pub body: Vec<u8>,
}

impl Part {
    /// The MIME essence used for rewrite dispatch: the type before any
    /// parameters, trimmed and lower-cased (`"text/html; charset=utf-8"` → `"text/html"`).
    pub fn essence(&self) -> Option<String> {
        self.mime_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Identifier used to name the output file: the location, else the content id.
    pub fn name_source(&self) -> &str {
        self.location
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.id.as_deref())
            .unwrap_or("")
    }
}
