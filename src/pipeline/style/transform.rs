//! CSS post-processing plugin set.
//!
//! The stylesheet is parsed once, every transform runs on the parsed rules
//! in order, and it is printed once at the end.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use super::media;
use crate::config::{MediaSort, StyleConfig};
use crate::pipeline::{FileSet, PipelineError, PipelineResult, Stage};
use crate::utils::path::to_slash;

/// One post-processing step with its own configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Add the vendor prefixes the browserslist queries require.
    Prefix { browsers: Vec<String> },
    /// Merge and sort top-level media queries.
    PackMedia { sort: MediaSort },
    /// Print compact output.
    Minify,
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Prefix { .. } => "prefix",
            Self::PackMedia { .. } => "pack-media",
            Self::Minify => "minify",
        }
    }
}

/// Ordered, validated list of transforms.
#[derive(Debug, Clone)]
pub struct PluginSet {
    transforms: Vec<Transform>,
    targets: Targets,
}

impl PluginSet {
    /// Validate the order and resolve prefix targets.
    ///
    /// Media packing must see prefixed rules, so it may not come before
    /// `Prefix`. Each transform may appear once.
    pub fn new(transforms: Vec<Transform>) -> PipelineResult<Self> {
        let position = |name: &str| transforms.iter().position(|t| t.name() == name);

        for (i, t) in transforms.iter().enumerate() {
            if transforms[..i].iter().any(|prev| prev.name() == t.name()) {
                return Err(PipelineError::Transform(format!("`{}` listed twice", t.name())));
            }
        }
        if let (Some(prefix), Some(pack)) = (position("prefix"), position("pack-media"))
            && pack < prefix
        {
            return Err(PipelineError::Transform(
                "`pack-media` must come after `prefix`".into(),
            ));
        }

        let mut targets = Targets::default();
        for t in &transforms {
            if let Transform::Prefix { browsers } = t {
                targets.browsers = Browsers::from_browserslist(browsers)
                    .map_err(|e| PipelineError::Transform(format!("browsers: {e}")))?;
            }
        }

        Ok(Self {
            transforms,
            targets,
        })
    }

    /// `[Prefix, PackMedia]`
    pub fn standard(style: &StyleConfig) -> PipelineResult<Self> {
        Self::new(vec![
            Transform::Prefix {
                browsers: style.browsers.clone(),
            },
            Transform::PackMedia {
                sort: style.media_sort,
            },
        ])
    }

    /// `[Prefix, PackMedia, Minify]`
    pub fn production(style: &StyleConfig) -> PipelineResult<Self> {
        let mut set = Self::standard(style)?;
        set.transforms.push(Transform::Minify);
        Ok(set)
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    fn minify(&self) -> bool {
        self.transforms.contains(&Transform::Minify)
    }

    /// Run every transform over `css`, optionally appending an inline map.
    pub fn process(&self, path: &Path, css: &str, source_map: bool) -> PipelineResult<String> {
        let fail = |message: String| PipelineError::Css {
            path: path.to_path_buf(),
            message,
        };
        let filename = path
            .file_name()
            .map_or_else(|| to_slash(path), |name| name.to_string_lossy().into_owned());

        let mut stylesheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: filename.clone(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| fail(e.to_string()))?;

        let mut minified = false;
        for transform in &self.transforms {
            match transform {
                Transform::Prefix { .. } => {
                    // lightningcss only prefixes inside `minify`, which also
                    // merges rules and collapses shorthands.
                    stylesheet
                        .minify(MinifyOptions {
                            targets: self.targets,
                            ..MinifyOptions::default()
                        })
                        .map_err(|e| fail(e.to_string()))?;
                    minified = true;
                }
                Transform::PackMedia { sort } => {
                    media::pack(&mut stylesheet.rules, *sort, self.targets)
                        .map_err(|e| fail(e.to_string()))?;
                }
                Transform::Minify if !minified => {
                    stylesheet
                        .minify(MinifyOptions {
                            targets: self.targets,
                            ..MinifyOptions::default()
                        })
                        .map_err(|e| fail(e.to_string()))?;
                    minified = true;
                }
                Transform::Minify => {}
            }
        }

        let mut map = source_map.then(|| SourceMap::new("/"));
        if let Some(map) = map.as_mut() {
            map.add_source(&filename);
            map.set_source_content(0, css)
                .map_err(|e| fail(format!("{e:?}")))?;
        }

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify(),
                targets: self.targets,
                source_map: map.as_mut(),
                ..PrinterOptions::default()
            })
            .map_err(|e| fail(e.to_string()))?;

        let mut code = printed.code;
        if let Some(mut map) = map {
            let json = map.to_json(None).map_err(|e| fail(format!("{e:?}")))?;
            code.push_str(&format!(
                "\n/*# sourceMappingURL=data:application/json;charset=utf-8;base64,{} */\n",
                STANDARD.encode(json)
            ));
        }
        Ok(code)
    }
}

/// Pipeline stage running a [`PluginSet`] over every file.
#[derive(Debug, Clone)]
pub struct Transforms {
    plugins: PluginSet,
    source_map: bool,
}

impl Transforms {
    pub fn new(plugins: PluginSet) -> Self {
        Self {
            plugins,
            source_map: false,
        }
    }

    pub fn with_source_map(mut self) -> Self {
        self.source_map = true;
        self
    }
}

impl Stage for Transforms {
    fn name(&self) -> &'static str {
        "transforms"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        files.try_map(|file| {
            let css = self
                .plugins
                .process(&file.path(), file.text()?, self.source_map)?;
            Ok(file.with_contents(css))
        })
    }
}
