//! Live reload script injection.

use crate::embed::serve::script_tag;
use crate::utils::mime;

/// Inject the live reload script when the body is HTML.
pub fn maybe_inject_livereload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_livereload_script(&body)
    } else {
        body
    }
}

/// Inject the script tag before the last `</body>`, or append it.
fn inject_livereload_script(content: &[u8]) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let script = script_tag();
    let script_bytes = script.as_bytes();
    let mut result = Vec::with_capacity(content.len() + script_bytes.len());

    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script_bytes);
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(script_bytes);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mime::types::{CSS, HTML};

    #[test]
    fn test_injects_before_body_close() {
        let html = b"<html><body><p>hi</p></BODY></html>".to_vec();
        let out = String::from_utf8(maybe_inject_livereload(html, HTML)).unwrap();
        assert_eq!(
            out,
            r#"<html><body><p>hi</p><script src="/__livereload.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn test_appends_without_body() {
        let out = maybe_inject_livereload(b"<p>fragment</p>".to_vec(), HTML);
        assert!(out.ends_with(b"</script>"));
    }

    #[test]
    fn test_leaves_other_types_alone() {
        let css = b"body{color:red}</body>".to_vec();
        assert_eq!(maybe_inject_livereload(css.clone(), CSS), css);
    }
}
