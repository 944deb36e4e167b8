//! Glob resolution for asset roles.
//!
//! A [`GlobSet`] holds include patterns and `!`-prefixed exclude patterns,
//! all relative to the project root. Resolution keeps glob-resolution order:
//! patterns in declaration order, each pattern's matches in lexicographic
//! order, duplicates dropped.
//!
//! Every match remembers its glob base, the literal directory prefix in
//! front of the first wildcard (`assets/css/**/*.min.css` → `assets/css`),
//! so that writes can preserve the sub-path below it.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use rustc_hash::FxHashSet;

use super::error::{PipelineError, PipelineResult};
use crate::config::Patterns;
use crate::debug;
use crate::utils::path::to_slash;

/// `*` never crosses a directory separator; `**` does.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file matched by a glob, split at its glob base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobMatch {
    /// Absolute directory the pattern's literal prefix resolves to.
    pub base: PathBuf,
    /// Path below `base`.
    pub relative: PathBuf,
}

#[derive(Debug, Clone)]
struct Include {
    source: String,
    pattern: Pattern,
}

/// Include and exclude patterns for one asset role.
#[derive(Debug, Clone)]
pub struct GlobSet {
    includes: Vec<Include>,
    excludes: Vec<Pattern>,
}

impl GlobSet {
    /// Compile the patterns of an asset role.
    pub fn new(patterns: &Patterns) -> PipelineResult<Self> {
        Self::from_patterns(patterns.as_slice())
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> PipelineResult<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for raw in patterns {
            let raw = raw.as_ref();
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let body = clean_pattern(body);
            let pattern = Pattern::new(&body).map_err(|source| PipelineError::Glob {
                pattern: raw.to_string(),
                source,
            })?;

            if negated {
                excludes.push(pattern);
            } else {
                includes.push(Include {
                    source: body,
                    pattern,
                });
            }
        }

        Ok(Self { includes, excludes })
    }

    /// Whether a root-relative path belongs to this set.
    pub fn matches(&self, relative: &Path) -> bool {
        let path = to_slash(relative);
        self.includes
            .iter()
            .any(|inc| inc.pattern.matches_with(&path, MATCH_OPTIONS))
            && !self.is_excluded(&path)
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.excludes
            .iter()
            .any(|ex| ex.matches_with(path, MATCH_OPTIONS))
    }

    /// Resolve the set against `root`, returning files only.
    ///
    /// An empty result is not an error.
    pub fn resolve(&self, root: &Path) -> PipelineResult<Vec<GlobMatch>> {
        let mut seen = FxHashSet::default();
        let mut matches = Vec::new();
        let escaped_root = Pattern::escape(&root.to_string_lossy());

        for include in &self.includes {
            let full = format!("{}/{}", escaped_root.trim_end_matches('/'), include.source);
            let paths = glob::glob_with(&full, MATCH_OPTIONS).map_err(|source| {
                PipelineError::Glob {
                    pattern: include.source.clone(),
                    source,
                }
            })?;

            let base = root.join(glob_base(&include.source));

            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(err) => {
                        debug!("glob"; "skipping unreadable entry: {}", err);
                        continue;
                    }
                };
                if !path.is_file() {
                    continue;
                }

                let Ok(root_relative) = path.strip_prefix(root) else {
                    continue;
                };
                if self.is_excluded(&to_slash(root_relative)) || !seen.insert(path.clone()) {
                    continue;
                }

                let relative = path
                    .strip_prefix(&base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| root_relative.to_path_buf());
                matches.push(GlobMatch {
                    base: base.clone(),
                    relative,
                });
            }
        }

        Ok(matches)
    }
}

/// Strip a leading `./` so patterns compare against root-relative paths.
fn clean_pattern(pattern: &str) -> String {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern.to_string()
}

/// Literal directory prefix before the first wildcard component.
fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take(components.len().saturating_sub(1))
        .take_while(|part| !part.contains(['*', '?', '[']))
        .copied()
        .collect::<Vec<_>>();
    literal.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn relatives(matches: &[GlobMatch]) -> Vec<String> {
        matches.iter().map(|m| to_slash(&m.relative)).collect()
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("assets/css/**/*.min.css"), PathBuf::from("assets/css"));
        assert_eq!(glob_base("assets/scss/style.scss"), PathBuf::from("assets/scss"));
        assert_eq!(glob_base("*.html"), PathBuf::new());
        assert_eq!(glob_base("a/b?/c.js"), PathBuf::from("a"));
    }

    #[test]
    fn test_clean_pattern() {
        assert_eq!(clean_pattern("./assets/js/*.js"), "assets/js/*.js");
        assert_eq!(clean_pattern("*.html"), "*.html");
    }

    #[test]
    fn test_resolve_excludes_min_and_bundle() {
        let dir = TempDir::new().unwrap();
        for rel in [
            "assets/js/a.js",
            "assets/js/b.js",
            "assets/js/bundle.js",
            "assets/js/a.min.js",
            "assets/js/vendor/c.js",
        ] {
            touch(dir.path(), rel);
        }

        let set = GlobSet::new(&crate::config::PathsConfig::default().js).unwrap();
        let matches = set.resolve(dir.path()).unwrap();

        assert_eq!(relatives(&matches), ["a.js", "b.js", "vendor/c.js"]);
        assert!(matches.iter().all(|m| m.base == dir.path().join("assets/js")));
    }

    #[test]
    fn test_resolve_star_does_not_cross_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "about.html");
        touch(dir.path(), "nested/page.html");

        let set = GlobSet::from_patterns(&["./*.html"]).unwrap();
        let matches = set.resolve(dir.path()).unwrap();

        assert_eq!(relatives(&matches), ["about.html", "index.html"]);
    }

    #[test]
    fn test_resolve_empty_is_ok() {
        let dir = TempDir::new().unwrap();
        let set = GlobSet::from_patterns(&["assets/css/**/*.min.css"]).unwrap();
        assert!(set.resolve(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_dedups_overlapping_patterns() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/a.js");

        let set = GlobSet::from_patterns(&["js/*.js", "js/**/*.js"]).unwrap();
        assert_eq!(set.resolve(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_matches_relative_paths() {
        let set = GlobSet::new(&crate::config::PathsConfig::default().js).unwrap();
        assert!(set.matches(Path::new("assets/js/app.js")));
        assert!(set.matches(Path::new("assets/js/lib/util.js")));
        assert!(!set.matches(Path::new("assets/js/app.min.js")));
        assert!(!set.matches(Path::new("assets/js/bundle.js")));
        assert!(!set.matches(Path::new("assets/css/style.css")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = GlobSet::from_patterns(&["assets/[.js"]).unwrap_err();
        assert!(matches!(err, PipelineError::Glob { .. }));
    }
}
