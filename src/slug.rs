//! Default rewrite function: turn a URL or content id into a file name.
//!
//! Any `(&str) -> String` function can be plugged into
//! [`ParserOptions`](crate::parser::mhtml::ParserOptions) instead.

/// Maximum file name length produced by [`filenamify`], in characters.
pub const MAX_FILENAME_LENGTH: usize = 100;

/// Substitute for characters that are not allowed in file names.
const REPLACEMENT: char = '!';

/// Device names reserved on Windows.
const WINDOWS_RESERVED: &[&str] = &["con", "prn", "aux", "nul"];

/// Make `s` safe to use as a file name, truncated to [`MAX_FILENAME_LENGTH`].
///
/// `"http://example.com/1.jpg"` becomes `"http!example.com!1.jpg"`.
pub fn filenamify(s: &str) -> String {
    filenamify_with(s, MAX_FILENAME_LENGTH)
}

/// Same as [`filenamify`] with an explicit length limit.
///
/// Reserved characters (`< > : " / \ | ? *` and control characters) and
/// leading dots become `!`, runs of `!` collapse, outer `!` are stripped and
/// Windows device names get a `!` suffix.
pub fn filenamify_with(s: &str, max_len: usize) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if is_reserved(c) { REPLACEMENT } else { c })
        .collect();

    let without_dots = match replaced.strip_prefix('.') {
        Some(_) => format!("{REPLACEMENT}{}", replaced.trim_start_matches('.')),
        None => replaced,
    };

    let mut collapsed = String::with_capacity(without_dots.len());
    for c in without_dots.chars() {
        if c == REPLACEMENT && collapsed.ends_with(REPLACEMENT) {
            continue;
        }
        collapsed.push(c);
    }

    let mut name = if collapsed.chars().count() > 1 {
        collapsed.trim_matches(REPLACEMENT).to_string()
    } else {
        collapsed
    };

    if is_windows_reserved(&name) {
        name.push(REPLACEMENT);
    }

    name.chars().take(max_len).collect()
}

fn is_reserved(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
        || c.is_ascii_control()
        || ('\u{80}'..='\u{9f}').contains(&c)
}

fn is_windows_reserved(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if WINDOWS_RESERVED.contains(&lower.as_str()) {
        return true;
    }
    let bytes = lower.as_bytes();
    bytes.len() == 4
        && (lower.starts_with("com") || lower.starts_with("lpt"))
        && bytes[3].is_ascii_digit()
}
