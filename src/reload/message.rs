//! Live reload message protocol.
//!
//! JSON messages pushed from the development server to browser clients:
//!
//! - `connected`: handshake acknowledgement
//! - `reload`: full page reload
//! - `css`: swap the listed stylesheets in place

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// Full page reload
    Reload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheets rewritten; clients re-fetch matching `<link>` elements
    Css {
        /// Root-relative URL paths, e.g. `/assets/css/style.css`
        paths: Vec<String>,
    },
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn css(paths: Vec<String>) -> Self {
        Self::Css { paths }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
