//! `[script]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [script]
//! toplevel = true          # mangle top-level names
//! quote_style = "double"   # or "single"
//! concat_separator = ""    # inserted between concatenated files
//! ```

use serde::{Deserialize, Serialize};

/// Quote character for string literals in minified output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
}

/// Script bundling and minification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Mangle top-level declarations, not only nested scopes.
    pub toplevel: bool,

    /// Quote style for generated string literals.
    pub quote_style: QuoteStyle,

    /// Text inserted between files when concatenating.
    pub concat_separator: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            toplevel: true,
            quote_style: QuoteStyle::Double,
            concat_separator: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_script_defaults() {
        let config = test_parse_config("");
        assert!(config.script.toplevel);
        assert_eq!(config.script.quote_style, QuoteStyle::Double);
        assert!(config.script.concat_separator.is_empty());
    }

    #[test]
    fn test_script_override() {
        let config = test_parse_config(
            "[script]\ntoplevel = false\nquote_style = \"single\"\nconcat_separator = \";\\n\"",
        );
        assert!(!config.script.toplevel);
        assert_eq!(config.script.quote_style, QuoteStyle::Single);
        assert_eq!(config.script.concat_separator, ";\n");
    }
}
