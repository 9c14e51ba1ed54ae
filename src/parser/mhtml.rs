//! The conversion pipeline: `parse` an archive into parts, `rewrite` the links
//! between them and `spit` out one file per part.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::model::file::{Content, SplitFile, DEFAULT_MIME_TYPE};
use crate::model::part::Part;
use crate::parser::part::parse_part;
use crate::parser::splitter::{self, DEFAULT_MAX_PART_SIZE};
use crate::rewrite::css::rewrite_css;
use crate::rewrite::html::TagRewriter;
use crate::rewrite::link::parse_base;
use crate::rewrite::map::RewriteMap;
use crate::slug::{filenamify, filenamify_with};

/// Maps a resource location (or content id) to an output file name.
pub type RewriteFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Options fixed when a parser is created.
#[derive(Clone)]
pub struct ParserOptions {
    /// Raw parts larger than this many bytes are skipped.
    pub max_file_size: usize,
    /// Naming function for output files and rewritten links.
    pub rewrite_fn: RewriteFn,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_PART_SIZE,
            rewrite_fn: Arc::new(filenamify),
        }
    }
}

impl fmt::Debug for ParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserOptions")
            .field("max_file_size", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

impl ParserOptions {
    /// Options from the `[parser]` section of the configuration.
    pub fn from_config(config: &Config) -> Self {
        let max_len = config.parser.max_filename_length;
        Self {
            max_file_size: config.parser.max_file_size,
            rewrite_fn: Arc::new(move |s: &str| filenamify_with(s, max_len)),
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_rewrite_fn<F>(mut self, rewrite_fn: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.rewrite_fn = Arc::new(rewrite_fn);
        self
    }
}

/// A parse session over one MHTML archive.
///
/// ```no_run
/// use mhtml_split::parser::mhtml::{MhtmlParser, ParserOptions};
///
/// let data = std::fs::read("page.mhtml")?;
/// let files = MhtmlParser::new(ParserOptions::default())
///     .parse(&data)?
///     .rewrite()
///     .spit();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct MhtmlParser {
    options: ParserOptions,
    parts: Vec<Part>,
    got_string: bool,
    tag_rewriter: TagRewriter,
}

impl MhtmlParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            parts: Vec::new(),
            got_string: false,
            tag_rewriter: TagRewriter::new(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parsed parts in archive order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Parse a binary archive. Results are emitted as [`Content::Bytes`].
    ///
    /// Replaces any previously parsed parts. Fails if the archive declares
    /// no boundary or a part uses an unknown transfer encoding.
    pub fn parse(&mut self, data: &[u8]) -> Result<&mut Self> {
        self.got_string = false;
        self.parse_parts(data)?;
        Ok(self)
    }

    /// Parse an archive given as text. Results are emitted as [`Content::Text`].
    pub fn parse_str(&mut self, data: &str) -> Result<&mut Self> {
        self.parse_parts(data.as_bytes())?;
        self.got_string = true;
        Ok(self)
    }

    fn parse_parts(&mut self, data: &[u8]) -> Result<()> {
        self.parts.clear();

        let mut raw_parts = splitter::split(data, self.options.max_file_size)?;
        for raw in raw_parts.by_ref() {
            self.parts.push(parse_part(raw)?);
        }

        info!(
            parts = self.parts.len(),
            dropped = raw_parts.dropped(),
            size = data.len(),
            "Parsed MHTML archive"
        );
        Ok(())
    }

    /// Rewrite links in HTML, CSS and SVG parts to the output file names.
    ///
    /// Other parts are left untouched.
    pub fn rewrite(&mut self) -> &mut Self {
        let map = RewriteMap::build(&self.parts, self.options.rewrite_fn.as_ref());
        debug!(entries = map.len(), "Built rewrite map");

        for part in &mut self.parts {
            let base = parse_base(part.location.as_deref());
            let body = match part.essence().as_deref() {
                Some("text/html") => self
                    .tag_rewriter
                    .rewrite_html(&part.body, &map, base.as_ref())
                    .to_vec(),
                Some("text/css") => rewrite_css(&part.body, base.as_ref(), &map, false).into_owned(),
                Some("image/svg+xml") => self
                    .tag_rewriter
                    .rewrite_svg(&part.body, &map, base.as_ref())
                    .to_vec(),
                _ => continue,
            };
            debug!(
                location = part.name_source(),
                mime_type = ?part.mime_type,
                before = part.body.len(),
                after = body.len(),
                "Rewrote part"
            );
            part.body = body;
        }
        self
    }

    /// Produce one output file per parsed part, in archive order.
    pub fn spit(&self) -> Vec<SplitFile> {
        self.parts
            .iter()
            .map(|part| SplitFile {
                filename: (self.options.rewrite_fn)(part.name_source()),
                content: if self.got_string {
                    Content::Text(String::from_utf8_lossy(&part.body).into_owned())
                } else {
                    Content::Bytes(part.body.clone())
                },
                mime_type: part
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            })
            .collect()
    }
}

/// Parse, rewrite and split `data` in one call.
pub fn convert(data: &[u8], options: ParserOptions) -> Result<Vec<SplitFile>> {
    Ok(MhtmlParser::new(options).parse(data)?.rewrite().spit())
}
