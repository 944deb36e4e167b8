//! `[paths]` section configuration.
//!
//! The path registry: every asset role mapped to one or more glob patterns
//! (or a literal path), relative to the project root.
//!
//! # Example
//!
//! ```toml
//! [paths]
//! html = "*.html"
//! scss_entry = "assets/scss/style.scss"
//! js = ["assets/js/**/*.js", "!assets/js/**/*.min.js", "!assets/js/**/bundle.js"]
//! bundle = "bundle.js"
//! ```
//!
//! Patterns prefixed with `!` exclude matches of the other patterns.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// One or more glob patterns for a single asset role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct Patterns(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Patterns {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(pattern) => Self(vec![pattern]),
            OneOrMany::Many(patterns) => Self(patterns),
        }
    }
}

impl From<Patterns> for Vec<String> {
    fn from(value: Patterns) -> Self {
        value.0
    }
}

impl Patterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    pub fn single(pattern: impl Into<String>) -> Self {
        Self(vec![pattern.into()])
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|p| p.starts_with('!'))
    }
}

/// Path registry: asset role → glob pattern(s).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Markup files served and released as templates.
    pub html: Patterns,
    /// Directory receiving compiled stylesheets.
    pub css_dir: PathBuf,
    /// Minified stylesheets copied into the release.
    pub css_min: Patterns,
    /// Style entry point compiled by the style pipeline.
    pub scss_entry: Patterns,
    /// All style sources (watched and combed).
    pub scss: Patterns,
    /// Root of the style sources.
    pub scss_dir: PathBuf,
    /// Script sources, excluding minified files and the bundle itself.
    pub js: Patterns,
    /// Minified scripts copied into the release.
    pub js_min: Patterns,
    /// Directory holding scripts, the bundle and `.min.js` siblings.
    pub js_dir: PathBuf,
    /// File name of the concatenated bundle (written into `js_dir`).
    pub bundle: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            html: Patterns::single("*.html"),
            css_dir: PathBuf::from("assets/css"),
            css_min: Patterns::single("assets/css/**/*.min.css"),
            scss_entry: Patterns::single("assets/scss/style.scss"),
            scss: Patterns::single("assets/scss/**/*.scss"),
            scss_dir: PathBuf::from("assets/scss"),
            js: Patterns::new([
                "assets/js/**/*.js",
                "!assets/js/**/*.min.js",
                "!assets/js/**/bundle.js",
            ]),
            js_min: Patterns::single("assets/js/**/*.min.js"),
            js_dir: PathBuf::from("assets/js"),
            bundle: "bundle.js".into(),
        }
    }
}

impl PathsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.bundle.is_empty() || self.bundle.contains(['/', '\\']) {
            diag.error(
                "paths.bundle",
                format!("`{}` must be a plain file name", self.bundle),
            );
        }

        for (field, patterns) in [
            ("paths.html", &self.html),
            ("paths.scss_entry", &self.scss_entry),
            ("paths.scss", &self.scss),
            ("paths.js", &self.js),
        ] {
            if patterns.is_empty() {
                diag.error(field, "needs at least one include pattern");
            }
        }

        for (field, dir) in [
            ("paths.css_dir", &self.css_dir),
            ("paths.scss_dir", &self.scss_dir),
            ("paths.js_dir", &self.js_dir),
        ] {
            if dir.is_absolute() {
                diag.error(field, "must be relative to the project root");
            }
        }
    }
}
