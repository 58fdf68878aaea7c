//! Glob matching for installation files
//!
//! Supports wildcards inside a path segment:
//! - `*` - Matches any run of characters (e.g., `*.dol`, `sys/*.bin`)
//! - `?` - Matches exactly one character of a segment
//!
//! Separators are never crossed by a wildcard.

use crate::error::Result;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Pattern matcher for relative file paths
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    matcher: GlobMatcher,
    depth: usize,
}

impl PatternMatcher {
    /// Compile `pattern`; leading `./`, `/` and doubled separators are ignored
    pub fn new(pattern: &str) -> Result<Self> {
        let parts = split(pattern);
        let glob = GlobBuilder::new(&parts.join("/"))
            .literal_separator(true)
            .build()?;

        Ok(PatternMatcher {
            matcher: glob.compile_matcher(),
            depth: parts.len(),
        })
    }

    /// Check if a relative path matches
    ///
    /// # Examples
    /// ```
    /// use alx::pattern::PatternMatcher;
    ///
    /// let matcher = PatternMatcher::new("sys/*.bin").unwrap();
    /// assert!(matcher.matches("sys/boot.bin"));
    /// assert!(!matcher.matches("sys/main.dol"));
    /// ```
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(split(path).join("/"))
    }

    /// Number of path segments a match has
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// True when the pattern contains a wildcard
    pub fn is_pattern(pattern: &str) -> bool {
        pattern.contains(['*', '?'])
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty() && *s != ".").collect()
}

/// Relative path of `path` below `root` with `/` separators
fn relative(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let parts = rest
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Expand `pattern` relative to `root`, returning matches in sorted order
pub fn glob(root: &Path, pattern: &str) -> Vec<PathBuf> {
    let matcher = match PatternMatcher::new(pattern) {
        Ok(matcher) => matcher,
        Err(e) => {
            warn!("Glob {} - {}", pattern, e);
            return Vec::new();
        }
    };
    if matcher.depth() == 0 {
        return Vec::new();
    }

    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(matcher.depth())
        .max_depth(matcher.depth())
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| relative(root, e.path()).is_some_and(|path| matcher.matches(&path)))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}
