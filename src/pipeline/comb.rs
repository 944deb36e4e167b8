//! Declaration ordering.
//!
//! Sorts declarations inside every block into a canonical property order.
//! Works on text rather than a parsed stylesheet so that SCSS sources
//! (variables, mixins, nesting, interpolation) and minified CSS go through
//! the same code.
//!
//! Within a block, each maximal run of consecutive plain declarations is
//! sorted stably. Anything else (`$variables`, `@include`, nested rules,
//! custom properties, a declaration preceded by a comment) ends the run and
//! stays where it is. Whitespace and `;` terminators keep their slots, so
//! only declaration text moves and the result is idempotent.

use std::collections::HashMap;
use std::sync::LazyLock;

use rustc_hash::FxBuildHasher;

use super::{Dest, FileSet, GlobSet, Pipeline, PipelineResult, Stage};
use crate::config::ProjectConfig;

/// Canonical property order: positioning, display and box model,
/// typography, visual, animation, misc.
const ORDER: &[&str] = &[
    // positioning
    "position", "z-index", "inset", "top", "right", "bottom", "left",
    // display & box model
    "display", "visibility", "float", "clear", "overflow", "overflow-x", "overflow-y",
    "overflow-scrolling", "clip", "zoom",
    "flex", "flex-flow", "flex-direction", "flex-wrap", "flex-grow", "flex-shrink",
    "flex-basis", "grid", "grid-area", "grid-template", "grid-template-areas",
    "grid-template-rows", "grid-template-columns", "grid-row", "grid-row-start",
    "grid-row-end", "grid-column", "grid-column-start", "grid-column-end",
    "grid-auto-rows", "grid-auto-columns", "grid-auto-flow", "gap", "row-gap",
    "column-gap", "place-content", "place-items", "place-self", "justify-content",
    "justify-items", "justify-self", "align-content", "align-items", "align-self", "order",
    "box-sizing", "width", "min-width", "max-width", "height", "min-height", "max-height",
    "aspect-ratio",
    "margin", "margin-top", "margin-right", "margin-bottom", "margin-left",
    "padding", "padding-top", "padding-right", "padding-bottom", "padding-left",
    "table-layout", "empty-cells", "caption-side", "border-spacing", "border-collapse",
    "list-style", "list-style-position", "list-style-type", "list-style-image",
    // typography
    "content", "quotes", "counter-reset", "counter-increment",
    "font", "font-family", "font-size", "font-weight", "font-style", "font-variant",
    "font-size-adjust", "font-stretch", "font-effect", "font-emphasize",
    "font-smoothing", "line-height", "color", "text-align", "text-align-last",
    "vertical-align", "white-space", "text-decoration", "text-emphasis",
    "text-indent", "text-justify", "text-outline", "text-overflow", "text-shadow",
    "text-transform", "text-wrap", "text-size-adjust", "letter-spacing",
    "word-spacing", "word-break", "word-wrap", "overflow-wrap", "hyphens", "tab-size",
    "direction", "unicode-bidi", "writing-mode",
    // visual
    "opacity", "filter", "backdrop-filter",
    "background", "background-color", "background-image", "background-repeat",
    "background-attachment", "background-position", "background-position-x",
    "background-position-y", "background-clip", "background-origin", "background-size",
    "box-decoration-break", "box-shadow",
    "border", "border-width", "border-style", "border-color",
    "border-top", "border-top-width", "border-top-style", "border-top-color",
    "border-right", "border-right-width", "border-right-style", "border-right-color",
    "border-bottom", "border-bottom-width", "border-bottom-style", "border-bottom-color",
    "border-left", "border-left-width", "border-left-style", "border-left-color",
    "border-radius", "border-top-left-radius", "border-top-right-radius",
    "border-bottom-right-radius", "border-bottom-left-radius",
    "border-image", "border-image-source", "border-image-slice", "border-image-width",
    "border-image-outset", "border-image-repeat",
    "outline", "outline-width", "outline-style", "outline-color", "outline-offset",
    "object-fit", "object-position", "mask", "clip-path",
    // animation
    "transform", "transform-origin", "transform-style", "perspective",
    "perspective-origin", "backface-visibility",
    "transition", "transition-property", "transition-duration",
    "transition-timing-function", "transition-delay",
    "animation", "animation-name", "animation-duration", "animation-play-state",
    "animation-timing-function", "animation-delay", "animation-iteration-count",
    "animation-direction", "animation-fill-mode", "will-change",
    // misc
    "appearance", "resize", "cursor", "pointer-events", "user-select",
    "touch-action", "speak", "nav-index", "scroll-behavior",
];

const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

static RANK: LazyLock<HashMap<&'static str, usize, FxBuildHasher>> =
    LazyLock::new(|| ORDER.iter().enumerate().map(|(i, p)| (*p, i)).collect());

// =============================================================================
// Stage
// =============================================================================

/// Pipeline stage applying [`comb`] to every file.
#[derive(Debug, Clone, Copy)]
pub struct Comb;

impl Stage for Comb {
    fn name(&self) -> &'static str {
        "comb"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        files.try_map(|file| {
            let sorted = comb(file.text()?);
            Ok(file.with_contents(sorted))
        })
    }
}

/// Reformat every style source in place.
pub fn reformat(config: &ProjectConfig) -> PipelineResult<FileSet> {
    let globs = GlobSet::new(&config.paths.scss)?;
    let files = FileSet::resolve(config.get_root(), &globs)?;

    Pipeline::new("comb")
        .pipe(Comb)
        .pipe(Dest::new(config.root_join(&config.paths.scss_dir)))
        .run(files)
}

// =============================================================================
// Scanner
// =============================================================================

/// Sort declarations of every block in `source`.
pub fn comb(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut scanner = Scanner {
        src: source,
        bytes: source.as_bytes(),
        pos: 0,
    };
    scanner.block(&mut out, true);
    out
}

/// A declaration slot. Only `decl` moves when a run is sorted.
struct Slot<'a> {
    trivia: &'a str,
    decl: &'a str,
    tail: &'a str,
    term: &'a str,
}

enum End {
    Semicolon,
    Open,
    Close,
    Eof,
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Emit one block body; consumes the closing `}` unless `top_level`.
    fn block(&mut self, out: &mut String, top_level: bool) {
        let src = self.src;
        let mut run: Vec<Slot<'a>> = Vec::new();

        loop {
            let trivia_start = self.pos;
            let commented = self.skip_trivia();
            let trivia = &src[trivia_start..self.pos];

            let stmt_start = self.pos;
            let end = self.scan_statement();
            let text = &src[stmt_start..self.pos];

            match end {
                End::Open => {
                    flush(&mut run, out);
                    out.push_str(trivia);
                    out.push_str(text);
                    out.push('{');
                    self.pos += 1;
                    self.block(out, false);
                }
                End::Semicolon => {
                    self.pos += 1;
                    statement(&mut run, out, trivia, text, ";", commented);
                }
                End::Close | End::Eof => {
                    if text.is_empty() {
                        flush(&mut run, out);
                        out.push_str(trivia);
                    } else {
                        statement(&mut run, out, trivia, text, "", commented);
                        flush(&mut run, out);
                    }

                    if matches!(end, End::Eof) {
                        return;
                    }
                    out.push('}');
                    self.pos += 1;
                    if !top_level {
                        return;
                    }
                }
            }
        }
    }

    /// Skip whitespace and comments; returns whether a comment was seen.
    fn skip_trivia(&mut self) -> bool {
        let mut commented = false;
        while let Some(b) = self.peek(0) {
            match (b, self.peek(1)) {
                (b' ' | b'\t' | b'\n' | b'\r' | b'\x0c', _) => self.pos += 1,
                (b'/', Some(b'*')) => {
                    self.skip_block_comment();
                    commented = true;
                }
                (b'/', Some(b'/')) => {
                    while self.peek(0).is_some_and(|b| b != b'\n') {
                        self.pos += 1;
                    }
                    commented = true;
                }
                _ => break,
            }
        }
        commented
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek(0) {
            self.pos += 1;
            if b == b'\\' {
                self.pos += 1;
            } else if b == quote {
                return;
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Advance to the statement terminator without consuming it.
    fn scan_statement(&mut self) -> End {
        let mut parens = 0usize;
        let mut interpolation = 0usize;

        while let Some(b) = self.peek(0) {
            match b {
                b'"' | b'\'' => {
                    self.skip_string(b);
                    continue;
                }
                b'\\' => {
                    self.pos = (self.pos + 2).min(self.bytes.len());
                    continue;
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    self.skip_block_comment();
                    continue;
                }
                b'#' if self.peek(1) == Some(b'{') => {
                    interpolation += 1;
                    self.pos += 2;
                    continue;
                }
                b'(' => parens += 1,
                b')' => parens = parens.saturating_sub(1),
                b'}' if interpolation > 0 => interpolation -= 1,
                b';' | b'{' | b'}' if parens == 0 && interpolation == 0 => {
                    return match b {
                        b';' => End::Semicolon,
                        b'{' => End::Open,
                        _ => End::Close,
                    };
                }
                _ => {}
            }
            self.pos += 1;
        }
        End::Eof
    }
}

/// Queue a declaration into the current run, or emit anything else verbatim.
fn statement<'a>(
    run: &mut Vec<Slot<'a>>,
    out: &mut String,
    trivia: &'a str,
    text: &'a str,
    term: &'a str,
    commented: bool,
) {
    // a comment documents the declaration after it, so that one is pinned
    if commented || property_name(text).is_none() {
        flush(run, out);
        out.push_str(trivia);
        out.push_str(text);
        out.push_str(term);
        return;
    }

    let decl = text.trim_end();
    run.push(Slot {
        trivia,
        decl,
        tail: &text[decl.len()..],
        term,
    });
}

fn flush(run: &mut Vec<Slot<'_>>, out: &mut String) {
    let mut decls: Vec<&str> = run.iter().map(|slot| slot.decl).collect();
    decls.sort_by_cached_key(|decl| sort_key(decl));

    for (slot, decl) in run.drain(..).zip(decls) {
        out.push_str(slot.trivia);
        out.push_str(decl);
        out.push_str(slot.tail);
        out.push_str(slot.term);
    }
}

/// Property name of a plain declaration (`name: value`), if `text` is one.
fn property_name(text: &str) -> Option<&str> {
    let (name, _) = text.split_once(':')?;
    let name = name.trim_end();
    let body = name.strip_prefix('-').unwrap_or(name);

    let mut chars = body.chars();
    chars.next().filter(char::is_ascii_alphabetic)?;
    chars
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
        .then_some(name)
}

/// Known properties by rank, prefixed forms first; unknown ones after,
/// alphabetically.
fn sort_key(decl: &str) -> (usize, String, bool) {
    let name = property_name(decl).unwrap_or(decl).to_ascii_lowercase();
    let (base, prefixed) = VENDOR_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .map_or((name.as_str(), false), |base| (base, true));

    match RANK.get(base) {
        Some(&rank) => (rank, String::new(), !prefixed),
        None => (ORDER.len(), base.to_string(), !prefixed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_pretty_block() {
        let input = "a {\n  color: red;\n  display: block;\n  position: absolute;\n}\n";
        assert_eq!(
            comb(input),
            "a {\n  position: absolute;\n  display: block;\n  color: red;\n}\n"
        );
    }

    #[test]
    fn test_sorts_minified_css() {
        assert_eq!(
            comb("a{color:red;display:block}b{z-index:1;position:relative}"),
            "a{display:block;color:red}b{position:relative;z-index:1}"
        );
    }

    #[test]
    fn test_prefixed_before_unprefixed() {
        assert_eq!(
            comb("a{transform:none;-webkit-transform:none;display:flex}"),
            "a{display:flex;-webkit-transform:none;transform:none}"
        );
    }

    #[test]
    fn test_unknown_after_known_alphabetically() {
        assert_eq!(
            comb("a{zz-custom:1;aa-custom:2;color:red}"),
            "a{color:red;aa-custom:2;zz-custom:1}"
        );
    }

    #[test]
    fn test_scss_barriers_stay_in_place() {
        let input = "\
$gap: 10px;
.card {
  color: $text;
  display: block;
  @include shadow(2);
  margin: $gap;
  position: relative;
  &:hover {
    opacity: .5;
    background: #{$hover};
  }
}
";
        let expected = "\
$gap: 10px;
.card {
  display: block;
  color: $text;
  @include shadow(2);
  position: relative;
  margin: $gap;
  &:hover {
    opacity: .5;
    background: #{$hover};
  }
}
";
        assert_eq!(comb(input), expected);
    }

    #[test]
    fn test_semicolons_inside_values() {
        let input = "a{background:url(data:image/png;base64,AAA);color:red;display:none}";
        assert_eq!(
            comb(input),
            "a{display:none;color:red;background:url(data:image/png;base64,AAA)}"
        );
    }

    #[test]
    fn test_strings_and_comments_preserved() {
        let input = "a {\n  /* why */\n  content: \"}{;\";\n  color: red;\n  display: block;\n}";
        let out = comb(input);
        assert!(out.contains("/* why */"));
        assert!(out.contains("content: \"}{;\";"));
        assert!(out.find("display").unwrap() < out.find("color").unwrap());
    }

    #[test]
    fn test_commented_declaration_keeps_its_comment() {
        assert_eq!(
            comb("a {\n  /* brand colour */\n  color: red;\n  display: block;\n}"),
            "a {\n  /* brand colour */\n  color: red;\n  display: block;\n}"
        );
        assert_eq!(
            comb("a{color:red;width:1px;/* x */left:0;top:0;display:block;position:absolute}"),
            "a{width:1px;color:red;/* x */left:0;position:absolute;top:0;display:block}"
        );
    }

    #[test]
    fn test_media_blocks() {
        assert_eq!(
            comb("@media (min-width:768px){a{color:red;width:1px}}"),
            "@media (min-width:768px){a{width:1px;color:red}}"
        );
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "a{color:red;display:block;-webkit-box-flex:1;zoom:1}",
            ".x {\n  // note\n  color: red;\n  top: 0;\n  &__el { left: 0; position: absolute }\n}\n",
            "a { color: red; display: block }",
        ] {
            let once = comb(input);
            assert_eq!(comb(&once), once);
        }
    }

    #[test]
    fn test_lossless_on_unbalanced_input() {
        let input = "a { color: red; display: block";
        let out = comb(input);
        assert_eq!(out.len(), input.len());
        assert!(out.starts_with("a { display: block; color: red"));
        assert_eq!(comb("}}a{b:c}"), "}}a{b:c}");
    }

    #[test]
    fn test_property_name() {
        assert_eq!(property_name("color: red"), Some("color"));
        assert_eq!(property_name("-webkit-box-flex:1"), Some("-webkit-box-flex"));
        assert_eq!(property_name("$var: 1"), None);
        assert_eq!(property_name("--brand: red"), None);
        assert_eq!(property_name("@include foo"), None);
        assert_eq!(property_name("#{$prop}: 1"), None);
    }
}
