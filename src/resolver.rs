//! Cascading attribute resolution
//!
//! A mapping attribute is keyed by dash-joined prefixes of the identity
//! context, most general first (`["GC", "US", "GEAE"]` yields the candidates
//! `GC-US-GEAE`, `GC-US`, `GC`). Resolution picks the longest prefix present
//! in the mapping. An extension token is appended to every candidate and is
//! finally tried on its own.
//!
//! The cache remembers the winning key, not the value, and is cleared
//! whenever the context is rebuilt.

use crate::config::{ConfigSource, Value};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Extension that means "no extension"
pub const ANY: &str = "*";

/// Cache key for a resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    attribute: String,
    extension: String,
}

/// Identity fields that make up the resolution context
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFields<'a> {
    pub platform_id: &'a str,
    pub region_id: &'a str,
    pub country_id: &'a str,
    pub product_id: &'a str,
    pub product_date: &'a str,
    pub description: &'a str,
}

impl ContextFields<'_> {
    /// Build the ordered context. The country replaces the region when known.
    pub fn build(&self) -> Vec<String> {
        let region = if !self.country_id.is_empty() {
            self.country_id
        } else {
            self.region_id
        };

        [
            self.platform_id,
            region,
            self.product_id,
            self.product_date,
            self.description,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
    }
}

/// Memoized cascading resolver
#[derive(Debug, Default)]
pub struct Resolver {
    context: Vec<String>,
    cache: Mutex<HashMap<CacheKey, String>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current identity context
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// Replace the identity context and drop every cached key
    pub fn refresh(&mut self, context: Vec<String>) {
        self.context = context;
        self.cache.get_mut().clear();
    }

    /// Number of remembered keys
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    /// Resolve an attribute of `source` for the current context.
    ///
    /// Scalars are returned unchanged. Mappings are resolved by
    /// most-specific match; `None` when no key matches.
    pub fn resolve<'a>(
        &self,
        source: &'a dyn ConfigSource,
        attribute: &str,
        extension: &str,
    ) -> Option<&'a Value> {
        let value = source.get(attribute)?;
        match value {
            Value::Table(table) => {
                self.resolve_with(source.symbol(), attribute, extension, |key| table.get(key))
            }
            scalar => Some(scalar),
        }
    }

    /// Resolve through an arbitrary key lookup, caching the winning key
    /// under `(symbol, attribute, extension)`.
    pub fn resolve_with<T>(
        &self,
        symbol: &str,
        attribute: &str,
        extension: &str,
        mut lookup: impl FnMut(&str) -> Option<T>,
    ) -> Option<T> {
        let cache_key = CacheKey {
            symbol: symbol.to_string(),
            attribute: attribute.to_string(),
            extension: extension.to_string(),
        };

        let remembered = self.cache.lock().get(&cache_key).cloned();
        if let Some(key) = remembered {
            if let Some(value) = lookup(&key) {
                return Some(value);
            }
        }

        let (key, value) = resolve_key(lookup, &self.context, extension)?;
        self.cache.lock().insert(cache_key, key);
        Some(value)
    }
}

/// Find the most specific key for `context` and `extension`.
///
/// Candidates are tried from the full context down to the empty prefix,
/// each with the extension appended unless it is [`ANY`]. The extension
/// alone is the last resort. Returns the winning key with its value.
pub fn resolve_key<T>(
    mut lookup: impl FnMut(&str) -> Option<T>,
    context: &[String],
    extension: &str,
) -> Option<(String, T)> {
    for end in (0..=context.len()).rev() {
        let mut parts: Vec<&str> = context[..end].iter().map(String::as_str).collect();
        if extension != ANY {
            parts.push(extension);
        }
        if parts.is_empty() {
            continue;
        }

        let candidate = parts.join("-");
        if let Some(value) = lookup(&candidate) {
            return Some((candidate, value));
        }
    }

    lookup(extension).map(|value| (extension.to_string(), value))
}
