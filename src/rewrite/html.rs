//! Single-pass streaming rewriter for HTML and SVG markup.
//!
//! The input is walked once, left to right, and copied byte for byte into an
//! output buffer. Only the values of link-bearing attributes, `style`
//! attributes and `<style>` element bodies are replaced. There is no DOM and
//! no normalization: a document without interesting attributes comes out
//! identical to how it went in.

use memchr::{memchr, memmem};
use url::Url;

use super::css::rewrite_css;
use super::link::{resolve, rewrite_link, rewrite_srcset};
use super::map::RewriteMap;

/// Extra capacity reserved on top of the input length for every run.
/// Only a hint: the output buffer grows if replacements need more.
pub const OUTPUT_SLACK: usize = 4096;

/// Markup dialect being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Html,
    /// Standalone SVG documents: only `href` and `xlink:href` are considered.
    Svg,
}

/// Attribute names the rewriter cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attr {
    Src,
    SrcSet,
    Href,
    XlinkHref,
    Data,
    Code,
    Style,
    Other,
}

impl Attr {
    /// Classify an attribute name, case-insensitively.
    fn classify(name: &[u8]) -> Self {
        match name.len() {
            3 if name.eq_ignore_ascii_case(b"src") => Attr::Src,
            4 if name.eq_ignore_ascii_case(b"href") => Attr::Href,
            4 if name.eq_ignore_ascii_case(b"data") => Attr::Data,
            4 if name.eq_ignore_ascii_case(b"code") => Attr::Code,
            5 if name.eq_ignore_ascii_case(b"style") => Attr::Style,
            6 if name.eq_ignore_ascii_case(b"srcset") => Attr::SrcSet,
            10 if name.eq_ignore_ascii_case(b"xlink:href") => Attr::XlinkHref,
            _ => Attr::Other,
        }
    }
}

/// Whether the value of `attr` on element `tag` must be rewritten.
fn is_interesting(markup: Markup, tag: &[u8], attr: Attr) -> bool {
    match (markup, attr) {
        (_, Attr::Href) => tag_is(tag, &["link", "feimage", "image", "base"]),
        (_, Attr::XlinkHref) => tag_is(tag, &["feimage", "image", "use"]),
        (Markup::Svg, _) => false,
        (Markup::Html, Attr::Src | Attr::SrcSet | Attr::Style) => true,
        (Markup::Html, Attr::Data) => tag_is(tag, &["object"]),
        (Markup::Html, Attr::Code) => tag_is(tag, &["applet"]),
        (Markup::Html, Attr::Other) => false,
    }
}

fn tag_is(tag: &[u8], names: &[&str]) -> bool {
    names.iter().any(|name| tag.eq_ignore_ascii_case(name.as_bytes()))
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | 0x0B | 0x0C | b'\r' | b' ')
}

/// Streaming rewriter with a reusable output buffer.
///
/// Each run returns a view into the buffer, valid until the next run. The
/// buffer survives between runs so a long-lived instance stops allocating
/// once it has seen its largest document. Give every worker its own instance.
#[derive(Debug, Default)]
pub struct TagRewriter {
    out: Vec<u8>,
}

impl TagRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rewriter whose buffer can hold `capacity` bytes up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
        }
    }

    /// Current capacity of the reusable output buffer.
    pub fn capacity(&self) -> usize {
        self.out.capacity()
    }

    /// Rewrite an HTML document.
    pub fn rewrite_html(&mut self, input: &[u8], map: &RewriteMap, base: Option<&Url>) -> &[u8] {
        self.run(input, map, base, Markup::Html)
    }

    /// Rewrite a standalone SVG document.
    pub fn rewrite_svg(&mut self, input: &[u8], map: &RewriteMap, base: Option<&Url>) -> &[u8] {
        self.run(input, map, base, Markup::Svg)
    }

    fn run(&mut self, input: &[u8], map: &RewriteMap, base: Option<&Url>, markup: Markup) -> &[u8] {
        self.out.clear();
        self.out.reserve(input.len() + OUTPUT_SLACK);

        let mut cursor = Cursor {
            input,
            i: 0,
            out: &mut self.out,
            map,
            base: base.cloned(),
            markup,
        };
        cursor.walk();

        &self.out
    }
}

/// State of one rewrite run: read position `i` into `input`, output appended to `out`.
struct Cursor<'a> {
    input: &'a [u8],
    i: usize,
    out: &'a mut Vec<u8>,
    map: &'a RewriteMap,
    base: Option<Url>,
    markup: Markup,
}

impl<'a> Cursor<'a> {
    fn current(&self) -> Option<u8> {
        self.input.get(self.i).copied()
    }

    fn more(&self) -> bool {
        self.i < self.input.len()
    }

    /// Copy the current byte and move on.
    fn advance(&mut self) {
        if let Some(b) = self.current() {
            self.out.push(b);
            self.i += 1;
        }
    }

    /// Copy everything up to (not including) `end`.
    fn copy_to(&mut self, end: usize) {
        let end = end.min(self.input.len());
        self.out.extend_from_slice(&self.input[self.i..end]);
        self.i = end;
    }

    fn rest(&self) -> &'a [u8] {
        let input = self.input;
        &input[self.i..]
    }

    fn walk(&mut self) {
        while self.more() {
            let next = memchr(b'<', self.rest()).map_or(self.input.len(), |off| self.i + off);
            self.copy_to(next);
            if !self.more() {
                break;
            }
            if self.rest().starts_with(b"<!--") {
                self.comment();
            } else {
                self.tag();
            }
        }
    }

    /// `<!-- ... -->`, copied verbatim. `<!-->` and `<!--->` are complete
    /// empty comments, so the search for `-->` starts right after `<!`.
    fn comment(&mut self) {
        let end = memmem::find(&self.rest()[2..], b"-->")
            .map_or(self.input.len(), |off| self.i + 2 + off + 3);
        self.copy_to(end);
    }

    fn tag(&mut self) {
        self.advance(); // <

        if self.current() == Some(b'/') {
            let end = memchr(b'>', self.rest()).map_or(self.input.len(), |off| self.i + off + 1);
            self.copy_to(end);
            return;
        }

        let tag = self.tag_name();
        self.skip_whitespace();

        while let Some(b) = self.current() {
            if b == b'>' {
                break;
            }
            if b == b'/' {
                self.advance();
                continue;
            }

            let attr = Attr::classify(self.attribute_name());
            if self.current() != Some(b'=') {
                self.skip_whitespace();
                continue;
            }
            self.advance(); // =

            let quote = self.open_quote();
            if is_interesting(self.markup, tag, attr) {
                let (raw, closed) = self.capture_value(quote);
                self.write_replacement(tag, attr, raw);
                if let (Some(q), true) = (quote, closed) {
                    self.out.push(q);
                }
            } else {
                self.copy_value(quote);
            }
            self.skip_whitespace();
        }

        if self.current() == Some(b'>') {
            self.advance();
            if self.markup == Markup::Html && tag.eq_ignore_ascii_case(b"style") {
                self.style_body();
            }
        }
    }

    /// Copy the tag name, terminated by `>` or whitespace.
    fn tag_name(&mut self) -> &'a [u8] {
        let input = self.input;
        let start = self.i;
        while let Some(b) = self.current() {
            if b == b'>' || is_whitespace(b) {
                break;
            }
            self.advance();
        }
        &input[start..self.i]
    }

    /// Copy an attribute name, terminated by `=`, `>` or whitespace.
    fn attribute_name(&mut self) -> &'a [u8] {
        let input = self.input;
        let start = self.i;
        while let Some(b) = self.current() {
            if b == b'=' || b == b'>' || is_whitespace(b) {
                break;
            }
            self.advance();
        }
        &input[start..self.i]
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(is_whitespace) {
            self.advance();
        }
    }

    /// Copy an opening quote if there is one.
    fn open_quote(&mut self) -> Option<u8> {
        match self.current() {
            Some(q @ (b'"' | b'\'')) => {
                self.advance();
                Some(q)
            }
            _ => None,
        }
    }

    /// End of the value starting at the cursor: the closing quote, or the
    /// first whitespace or `>` for unquoted values.
    fn value_end(&self, quote: Option<u8>) -> Option<usize> {
        let found = match quote {
            Some(q) => memchr(q, self.rest()),
            None => self
                .rest()
                .iter()
                .position(|&b| b == b'>' || is_whitespace(b)),
        };
        found.map(|off| self.i + off)
    }

    /// Copy a value verbatim, including its closing quote.
    fn copy_value(&mut self, quote: Option<u8>) {
        match self.value_end(quote) {
            Some(end) if quote.is_some() => self.copy_to(end + 1),
            Some(end) => self.copy_to(end),
            None => self.copy_to(self.input.len()),
        }
    }

    /// Read a value without copying it. The closing quote is consumed.
    /// Returns the raw value and whether a closing quote was found.
    fn capture_value(&mut self, quote: Option<u8>) -> (&'a [u8], bool) {
        let input = self.input;
        let start = self.i;
        match self.value_end(quote) {
            Some(end) => {
                self.i = if quote.is_some() { end + 1 } else { end };
                (&input[start..end], quote.is_some())
            }
            None => {
                self.i = input.len();
                (&input[start..], false)
            }
        }
    }

    fn write_replacement(&mut self, tag: &[u8], attr: Attr, raw: &[u8]) {
        if attr == Attr::Href && tag.eq_ignore_ascii_case(b"base") {
            // Links are absolute from here on, so the base is neutralized.
            if let Some(base) = std::str::from_utf8(raw)
                .ok()
                .and_then(|href| resolve(href.trim(), self.base.as_ref()))
            {
                self.base = Some(base);
            }
            return;
        }

        if attr == Attr::Style {
            let css = rewrite_css(raw, self.base.as_ref(), self.map, true);
            self.out.extend_from_slice(&css);
            return;
        }

        let replacement = std::str::from_utf8(raw).ok().and_then(|value| match attr {
            Attr::SrcSet => Some(rewrite_srcset(value, self.base.as_ref(), self.map)),
            _ => rewrite_link(value, self.base.as_ref(), self.map),
        });
        match replacement {
            Some(value) => self.out.extend_from_slice(value.as_bytes()),
            None => self.out.extend_from_slice(raw),
        }
    }

    /// Body of a `<style>` element: rewritten as CSS up to `</style`.
    fn style_body(&mut self) {
        let input = self.input;
        let end = find_style_close(self.rest()).map_or(input.len(), |off| self.i + off);
        let css = rewrite_css(&input[self.i..end], self.base.as_ref(), self.map, false);
        self.out.extend_from_slice(&css);
        self.i = end;
    }
}

/// Offset of the first `</style` (any case) in `hay`.
fn find_style_close(hay: &[u8]) -> Option<usize> {
    memmem::find_iter(hay, b"</").find(|&pos| {
        hay.get(pos + 2..pos + 7)
            .is_some_and(|name| name.eq_ignore_ascii_case(b"style"))
    })
}
