//! `url(...)` rewriting for stylesheets, `<style>` bodies and `style` attributes.
//!
//! Matching is pattern based. The CSS is not parsed, so everything outside
//! the matched `url(...)` spans is copied byte for byte.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::{Captures, Regex};
use url::Url;

use super::link::rewrite_link;
use super::map::RewriteMap;

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i-u)url\(\s*(?:"([^"]*)"|'([^']*)'|&quot;(.*?)&quot;|([^)"'\s]*))\s*\)"#)
            .expect("valid css url regex")
    })
}

/// Rewrite every `url(...)` in `css`.
///
/// Inside an HTML attribute (`in_attribute`) replacements are written as
/// `url(&quot;...&quot;)`, elsewhere as `url('...')`. Values that are empty,
/// fragments, `data:` URLs or fail to resolve keep their original text.
pub fn rewrite_css<'c>(
    css: &'c [u8],
    base: Option<&Url>,
    map: &RewriteMap,
    in_attribute: bool,
) -> Cow<'c, [u8]> {
    css_url_regex().replace_all(css, |caps: &Captures<'_>| {
        let raw = (1..=4)
            .find_map(|group| caps.get(group))
            .map(|m| m.as_bytes())
            .unwrap_or_default();

        match rewrite_css_url(raw, base, map) {
            Some(target) => wrap_url(&target, in_attribute),
            None => caps[0].to_vec(),
        }
    })
}

/// Compute the replacement target of a single `url()` value.
fn rewrite_css_url(raw: &[u8], base: Option<&Url>, map: &RewriteMap) -> Option<String> {
    let value = std::str::from_utf8(raw).ok()?.trim();
    if value.is_empty() {
        return None;
    }
    // protocol-relative: no scheme is known here, assume http
    if value.starts_with("//") {
        return rewrite_link(&format!("http:{value}"), base, map);
    }
    rewrite_link(value, base, map)
}

fn wrap_url(target: &str, in_attribute: bool) -> Vec<u8> {
    if in_attribute {
        format!("url(&quot;{target}&quot;)").into_bytes()
    } else {
        format!("url('{target}')").into_bytes()
    }
}
