//! `[release]` section configuration.
//!
//! Layout of the distribution tree assembled by `build`.
//!
//! # Example
//!
//! ```toml
//! [release]
//! dir = "dist"
//! templates = "tamplates"   # historical name, kept for existing deployments
//! css = "css"
//! js = "js"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Release tree settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Distribution root, relative to the project root.
    pub dir: PathBuf,
    /// Subfolder receiving markup files.
    pub templates: PathBuf,
    /// Subfolder receiving minified stylesheets.
    pub css: PathBuf,
    /// Subfolder receiving minified scripts.
    pub js: PathBuf,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            templates: PathBuf::from("tamplates"),
            css: PathBuf::from("css"),
            js: PathBuf::from("js"),
        }
    }
}

impl ReleaseConfig {
    /// The three release subfolders must not overlap so the copies stay disjoint.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let subdirs = [
            ("release.templates", &self.templates),
            ("release.css", &self.css),
            ("release.js", &self.js),
        ];

        for (field, dir) in subdirs {
            if dir.as_os_str().is_empty() || dir.is_absolute() {
                diag.error(field, "must be a non-empty relative folder");
            }
        }

        for (i, (field_a, a)) in subdirs.iter().enumerate() {
            for (field_b, b) in &subdirs[i + 1..] {
                if nested(a, b) {
                    diag.error(
                        field_b,
                        format!("overlaps with `{field_a}` ({})", a.display()),
                    );
                }
            }
        }
    }
}

fn nested(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}
