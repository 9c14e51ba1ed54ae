//! The rewrite map: original resource identifiers to output file names.

use std::collections::HashMap;

use url::Url;

use crate::model::part::Part;

/// Association from original resource keys to replacement file names.
///
/// Keys are absolute locations (as declared and in normalized URL form) and
/// `cid:<content-id>` references. Built once, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RewriteMap {
    entries: HashMap<String, String>,
}

impl RewriteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from parsed parts.
    ///
    /// Every part with a location maps `location → rewrite_fn(location)`.
    /// Every part with a content id maps `cid:<id> → rewrite_fn(location or id)`.
    /// Later parts overwrite earlier ones on key collisions.
    pub fn build(parts: &[Part], rewrite_fn: &dyn Fn(&str) -> String) -> Self {
        let mut map = Self::new();

        for part in parts {
            let Some(location) = part.location.as_deref() else {
                continue;
            };
            let location = location.trim();
            if location.is_empty() {
                continue;
            }
            let name = rewrite_fn(location).trim().to_string();
            if let Ok(url) = Url::parse(location) {
                if url.as_str() != location {
                    map.insert(url.as_str(), &name);
                }
            }
            map.insert(location, &name);
        }

        for part in parts {
            let Some(id) = part.id.as_deref() else {
                continue;
            };
            let source = part
                .location
                .as_deref()
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| id.trim());
            map.insert(&format!("cid:{id}"), &rewrite_fn(source));
        }

        map
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RewriteMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
