//! `[style]` section configuration.
//!
//! Controls the CSS post-processing plugin set.
//!
//! # Example
//!
//! ```toml
//! [style]
//! browsers = ["last 5 versions", "> 1%"]   # browserslist queries for prefixing
//! media_sort = "mobile-first"              # or "desktop-first"
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Ordering applied to packed `@media` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaSort {
    /// `min-width` ascending first, `max-width` descending after.
    #[default]
    MobileFirst,
    /// `max-width` descending first, `min-width` ascending after.
    DesktopFirst,
}

/// CSS post-processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Browserslist queries that decide which vendor prefixes are emitted.
    pub browsers: Vec<String>,

    /// Canonical ordering of packed media queries.
    pub media_sort: MediaSort,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            browsers: vec!["last 5 versions".into(), "> 1%".into()],
            media_sort: MediaSort::MobileFirst,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.browsers.is_empty() {
            return;
        }
        if let Err(err) = lightningcss::targets::Browsers::from_browserslist(&self.browsers) {
            diag.error("style.browsers", format!("invalid browserslist query: {err}"));
        }
    }
}
