//! Link resolution against a base URL and lookup in the rewrite map.

use url::Url;

use super::map::RewriteMap;

/// Parse a part location into a base URL. Relative or malformed locations give `None`.
pub fn parse_base(location: Option<&str>) -> Option<Url> {
    location.and_then(|l| Url::parse(l.trim()).ok())
}

/// Resolve `raw` against `base`, or parse it as absolute when there is no base.
pub fn resolve(raw: &str, base: Option<&Url>) -> Option<Url> {
    match base {
        Some(base) => base.join(raw).ok(),
        None => Url::parse(raw).ok(),
    }
}

/// Compute the replacement for a single link.
///
/// Returns `None` when the value must stay as written: empty values, pure fragments,
/// inline `data:` URLs and values that do not resolve. Otherwise returns the
/// mapped file name, or the absolute URL when the map has no entry. The
/// fragment never takes part in the lookup and is re-attached afterwards.
pub fn rewrite_link(raw: &str, base: Option<&Url>, map: &RewriteMap) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || value.starts_with('#') || is_data_url(value) {
        return None;
    }

    let mut url = resolve(value, base)?;
    let fragment = url.fragment().map(str::to_string);
    url.set_fragment(None);

    let mapped = map.get(url.as_str()).unwrap_or(url.as_str());
    Some(match fragment {
        Some(fragment) => format!("{mapped}#{fragment}"),
        None => mapped.to_string(),
    })
}

/// Rewrite a `srcset` value.
///
/// The value is split on single spaces and every token is treated as a
/// link, descriptors such as `2x` included. Tokens that cannot be rewritten
/// (and empty tokens from repeated spaces) are kept verbatim.
pub fn rewrite_srcset(raw: &str, base: Option<&Url>, map: &RewriteMap) -> String {
    raw.split(' ')
        .map(|token| {
            if token.is_empty() {
                return token.to_string();
            }
            rewrite_link(token, base, map).unwrap_or_else(|| token.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_data_url(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}
