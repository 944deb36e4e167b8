//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (livereload.js)
//!
//! ```ignore
//! use embed::serve::{LIVERELOAD_JS, LiveReloadVars};
//!
//! let js = LIVERELOAD_JS.render(&LiveReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the injected script tag points at.
    pub const LIVERELOAD_URL: &str = "/__livereload.js";

    /// Variables for livereload.js template.
    pub struct LiveReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for LiveReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__LIVERELOAD_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live reload client, served from memory.
    pub const LIVERELOAD_JS: Template<LiveReloadVars> =
        Template::new(include_str!("serve/livereload.js"));

    /// `<script>` tag injected into served HTML.
    pub fn script_tag() -> String {
        format!(r#"<script src="{LIVERELOAD_URL}"></script>"#)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_render_port() {
            let js = LIVERELOAD_JS.render(&LiveReloadVars { ws_port: 35730 });
            assert!(js.contains("var port = 35730;"));
            assert!(!js.contains("__LIVERELOAD_PORT__"));
        }

        #[test]
        fn test_script_tag() {
            assert_eq!(script_tag(), r#"<script src="/__livereload.js"></script>"#);
        }
    }
}
