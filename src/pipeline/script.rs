//! Script pipeline: bundle concatenation and per-file minification.

use oxc::allocator::Allocator;
use oxc::ast::ast::{StringLiteral, TaggedTemplateExpression, TemplateLiteral};
use oxc::ast_visit::{Visit, walk};
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::{SourceType, Span};
use rayon::prelude::*;

use super::{
    AssetFile, Dest, FileSet, GlobSet, Pipeline, PipelineError, PipelineResult, Rename, Stage,
};
use crate::config::{ProjectConfig, QuoteStyle, ScriptConfig};
use crate::log;

// =============================================================================
// Concatenate
// =============================================================================

/// Join every file, in order, into a single file named `file_name`.
///
/// An empty input produces no file.
#[derive(Debug, Clone)]
pub struct Concat {
    file_name: String,
    separator: String,
}

impl Concat {
    pub fn new(file_name: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            separator: separator.into(),
        }
    }
}

impl Stage for Concat {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        let mut files = files.into_iter();
        let Some(first) = files.next() else {
            return Ok(FileSet::default());
        };

        let base = first.base.clone();
        let mut contents = first.contents;
        for file in files {
            contents.extend_from_slice(self.separator.as_bytes());
            contents.extend_from_slice(&file.contents);
        }

        Ok(FileSet::new(vec![AssetFile::new(base, &self.file_name, contents)]))
    }
}

/// Write `js_dir/<bundle>` from every script source.
pub fn concat(config: &ProjectConfig) -> PipelineResult<FileSet> {
    let globs = GlobSet::new(&config.paths.js)?;
    let files = FileSet::resolve(config.get_root(), &globs)?;

    Pipeline::new("concat")
        .pipe(Concat::new(
            &config.paths.bundle,
            &config.script.concat_separator,
        ))
        .pipe(Dest::new(config.root_join(&config.paths.js_dir)))
        .run(files)
}

// =============================================================================
// Minify
// =============================================================================

/// Minify every file independently.
///
/// A file that fails to parse is reported and dropped from the set; the
/// remaining files still go through.
#[derive(Debug, Clone)]
pub struct MinifyScript {
    options: ScriptConfig,
}

impl MinifyScript {
    pub fn new(options: &ScriptConfig) -> Self {
        Self {
            options: options.clone(),
        }
    }
}

impl Stage for MinifyScript {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        let results: Vec<PipelineResult<AssetFile>> = files
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|file| {
                let path = file.path();
                let code = minify_js(file.text()?, &self.options)
                    .map_err(|message| PipelineError::Script { path, message })?;
                Ok(file.with_contents(code))
            })
            .collect();

        let mut minified = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(file) => minified.push(file),
                Err(err) if err.is_compile() => log!("error"; "{}", err),
                Err(err) => return Err(err),
            }
        }
        Ok(FileSet::new(minified))
    }
}

/// Write a `.min.js` sibling for every script source.
pub fn uglify(config: &ProjectConfig) -> PipelineResult<FileSet> {
    let globs = GlobSet::new(&config.paths.js)?;
    let files = FileSet::resolve(config.get_root(), &globs)?;

    Pipeline::new("uglify")
        .pipe(MinifyScript::new(&config.script))
        .pipe(Rename::min())
        .pipe(Dest::new(config.root_join(&config.paths.js_dir)))
        .run(files)
}

/// Minify a classic browser script.
fn minify_js(source: &str, options: &ScriptConfig) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(ToString::to_string).collect();
        return Err(messages.join("\n"));
    }

    let mut program = ret.program;
    let minifier_options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(options.toplevel),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(minifier_options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(requote(&code, options.quote_style))
}

/// Reprint every string literal of minified `code` with the configured quote.
///
/// Minified codegen picks the shortest quote per literal, backticks included.
/// Templates without substitutions become plain strings again, so the output
/// stays ES5.
fn requote(code: &str, style: QuoteStyle) -> String {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, SourceType::default().with_module(false)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return code.to_string();
    }

    let mut literals = Literals {
        quote: match style {
            QuoteStyle::Double => '"',
            QuoteStyle::Single => '\'',
        },
        edits: Vec::new(),
    };
    literals.visit_program(&ret.program);
    literals.edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(code.len());
    let mut last = 0;
    for (span, text) in literals.edits {
        let (start, end) = (span.start as usize, span.end as usize);
        if start < last {
            continue;
        }
        out.push_str(&code[last..start]);
        out.push_str(&text);
        last = end;
    }
    out.push_str(&code[last..]);
    out
}

/// Collects the replacement text of every requotable literal.
struct Literals {
    quote: char,
    edits: Vec<(Span, String)>,
}

impl<'a> Visit<'a> for Literals {
    fn visit_string_literal(&mut self, it: &StringLiteral<'a>) {
        if !it.lone_surrogates {
            self.edits.push((it.span, quoted(&it.value, self.quote)));
        }
    }

    fn visit_template_literal(&mut self, it: &TemplateLiteral<'a>) {
        if it.expressions.is_empty()
            && let [element] = &it.quasis[..]
            && !element.lone_surrogates
            && let Some(cooked) = &element.value.cooked
        {
            self.edits.push((it.span, quoted(cooked, self.quote)));
            return;
        }
        walk::walk_template_literal(self, it);
    }

    fn visit_tagged_template_expression(&mut self, it: &TaggedTemplateExpression<'a>) {
        // the tag sees the raw strings, so the template itself stays
        self.visit_expression(&it.tag);
        self.visit_expressions(&it.quasi.expressions);
    }
}

/// `value` as a string literal delimited by `quote`.
fn quoted(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c < ' ' => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> (TempDir, ProjectConfig) {
        let dir = TempDir::new().unwrap();
        for (rel, text) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let config = ProjectConfig::for_root(dir.path());
        (dir, config)
    }

    #[test]
    fn test_concat_is_exact_and_skips_bundle() {
        let (dir, config) = project(&[
            ("assets/js/a.js", "var a = 1;\n"),
            ("assets/js/b.js", "var b = 2;"),
            ("assets/js/bundle.js", "stale"),
            ("assets/js/a.min.js", "var a=1;"),
        ]);

        concat(&config).unwrap();
        let bundle = dir.path().join("assets/js/bundle.js");
        assert_eq!(fs::read_to_string(&bundle).unwrap(), "var a = 1;\nvar b = 2;");

        concat(&config).unwrap();
        assert_eq!(fs::read_to_string(&bundle).unwrap(), "var a = 1;\nvar b = 2;");
    }

    #[test]
    fn test_concat_separator() {
        let (dir, mut config) = project(&[("assets/js/a.js", "a()"), ("assets/js/b.js", "b()")]);
        config.script.concat_separator = ";\n".into();

        concat(&config).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("assets/js/bundle.js")).unwrap(),
            "a();\nb()"
        );
    }

    #[test]
    fn test_concat_empty_writes_nothing() {
        let (dir, config) = project(&[]);
        assert!(concat(&config).unwrap().is_empty());
        assert!(!dir.path().join("assets/js/bundle.js").exists());
    }

    #[test]
    fn test_uglify_writes_min_siblings() {
        let (dir, config) = project(&[
            ("assets/js/app.js", "function add(first, second) { return first + second; }\nwindow.sum = add(1, 2);\n"),
            ("assets/js/lib/util.js", "window.util = function (value) { return value * 2; };"),
        ]);

        let written = uglify(&config).unwrap();
        assert_eq!(written.len(), 2);

        let app = fs::read_to_string(dir.path().join("assets/js/app.min.js")).unwrap();
        assert!(!app.contains("second"));
        assert!(dir.path().join("assets/js/lib/util.min.js").is_file());

        // rerun never minifies its own output
        uglify(&config).unwrap();
        assert!(!dir.path().join("assets/js/app.min.min.js").exists());
    }

    #[test]
    fn test_uglify_skips_broken_file() {
        let (dir, config) = project(&[
            ("assets/js/bad.js", "function ("),
            ("assets/js/good.js", "window.x = 1 + 1;"),
        ]);

        let written = uglify(&config).unwrap();
        assert_eq!(written.len(), 1);
        assert!(dir.path().join("assets/js/good.min.js").is_file());
        assert!(!dir.path().join("assets/js/bad.min.js").exists());
    }

    #[test]
    fn test_quote_style() {
        let source = "window.a = 'one'; window.b = \"two\"; window.c = \"it's\"; window.d = `three`;";

        let out = minify_js(source, &ScriptConfig::default()).unwrap();
        for literal in [r#""one""#, r#""two""#, r#""it's""#, r#""three""#] {
            assert!(out.contains(literal), "{out}");
        }
        assert!(!out.contains('`'));

        let single = ScriptConfig {
            quote_style: QuoteStyle::Single,
            ..ScriptConfig::default()
        };
        let out = minify_js(source, &single).unwrap();
        for literal in ["'one'", "'two'", r"'it\'s'", "'three'"] {
            assert!(out.contains(literal), "{out}");
        }
        assert!(!out.contains('`') && !out.contains('"'));
    }

    #[test]
    fn test_requote_keeps_substitutions_and_tags() {
        let code = "a(`x${b}y`),c`raw\\n`,d({\"k\":`line\nbreak`});";
        let out = requote(code, QuoteStyle::Single);
        assert_eq!(out, "a(`x${b}y`),c`raw\\n`,d({'k':'line\\nbreak'});");
    }

    #[test]
    fn test_quoted_escapes() {
        assert_eq!(quoted("a\"b'c\\", '"'), r#""a\"b'c\\""#);
        assert_eq!(quoted("tab\there\u{0}", '\''), r"'tab\there\x00'");
    }

    #[test]
    fn test_parse_error_message() {
        assert!(minify_js("let = ;", &ScriptConfig::default()).is_err());
    }
}
