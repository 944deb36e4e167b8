//! Style pipeline: SASS → post-processing → declaration order → disk.
//!
//! | Variant        | Stages                                                   |
//! |----------------|----------------------------------------------------------|
//! | `Standard`     | sass → prefix, pack-media → comb → dest → notify → reload |
//! | `Minified`     | sass → prefix, pack-media, minify → comb → `.min` → dest → notify |
//! | `SourceMapped` | sass → prefix, pack-media (+ inline map) → dest → notify → reload |

mod media;
mod sass;
mod transform;

use std::path::PathBuf;

pub use sass::Sass;
pub use transform::{PluginSet, Transforms};

use crate::config::ProjectConfig;
use crate::pipeline::comb::Comb;
use crate::pipeline::{Dest, FileSet, GlobSet, Notify, Pipeline, PipelineResult, Reload, Rename};
use crate::reload::ReloadHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleVariant {
    /// Expanded `style.css`.
    Standard,
    /// Production `style.min.css`.
    Minified,
    /// Development `style.css` with an inline source map.
    SourceMapped,
}

impl StyleVariant {
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "style",
            Self::Minified => "style:min",
            Self::SourceMapped => "style:dev",
        }
    }
}

/// A style pipeline bound to the entry point it compiles.
///
/// Built once and reused by every rebuild in watch mode.
#[derive(Debug)]
pub struct StyleTask {
    root: PathBuf,
    entry: GlobSet,
    pipeline: Pipeline,
}

impl StyleTask {
    /// Build the pipeline for `variant`.
    ///
    /// With a reload handle, written stylesheets are pushed to connected
    /// browsers (`Minified` never reloads).
    pub fn new(
        config: &ProjectConfig,
        variant: StyleVariant,
        reload: Option<ReloadHandle>,
    ) -> PipelineResult<Self> {
        let root = config.get_root().to_path_buf();
        let sass = Sass::new(config.root_join(&config.paths.scss_dir));
        let dest = Dest::new(config.root_join(&config.paths.css_dir));
        let reload = reload.map(|handle| Reload::css(handle, &root));

        let pipeline = match variant {
            StyleVariant::Standard => Pipeline::new(variant.label())
                .pipe(sass)
                .pipe(Transforms::new(PluginSet::standard(&config.style)?))
                .pipe(Comb)
                .pipe(dest)
                .pipe(Notify::new("compiled"))
                .pipe_opt(reload),
            StyleVariant::Minified => Pipeline::new(variant.label())
                .pipe(sass)
                .pipe(Transforms::new(PluginSet::production(&config.style)?))
                .pipe(Comb)
                .pipe(Rename::min())
                .pipe(dest)
                .pipe(Notify::new("minified")),
            StyleVariant::SourceMapped => Pipeline::new(variant.label())
                .pipe(sass)
                .pipe(Transforms::new(PluginSet::standard(&config.style)?).with_source_map())
                .pipe(dest)
                .pipe(Notify::new("compiled"))
                .pipe_opt(reload),
        };

        Ok(Self {
            root,
            entry: GlobSet::new(&config.paths.scss_entry)?,
            pipeline,
        })
    }

    /// Resolve the entry point and run every stage.
    pub fn run(&self) -> PipelineResult<FileSet> {
        let files = FileSet::resolve(&self.root, &self.entry)?;
        self.pipeline.run(files)
    }
}

/// One-shot style build.
pub fn run(config: &ProjectConfig, variant: StyleVariant) -> PipelineResult<FileSet> {
    StyleTask::new(config, variant, None)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project() -> (TempDir, ProjectConfig) {
        let dir = TempDir::new().unwrap();
        let scss = dir.path().join("assets/scss");
        fs::create_dir_all(&scss).unwrap();
        fs::write(scss.join("_vars.scss"), "$brand: #123456;\n$wide: 1024px;\n").unwrap();
        fs::write(
            scss.join("style.scss"),
            "@import \"vars\";\n\
             @media (min-width: $wide) { .nav { color: $brand; } }\n\
             .nav { color: $brand; display: flex; }\n\
             @media (min-width: 768px) { .nav { position: absolute; } }\n",
        )
        .unwrap();

        let mut config = ProjectConfig::for_root(dir.path());
        config.style.browsers = vec!["ie 10".into()];
        (dir, config)
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    #[test]
    fn test_standard_writes_prefixed_packed_css() {
        let (dir, config) = project();
        let written = run(&config, StyleVariant::Standard).unwrap();
        assert_eq!(written.len(), 1);

        let css = read(dir.path(), "assets/css/style.css");
        assert!(css.contains("#123456"));
        assert!(css.contains("-ms-flexbox"));
        assert!(css.find("768px").unwrap() < css.find("1024px").unwrap());
        assert!(!dir.path().join("assets/css/_vars.css").exists());
        // declaration order: display before color
        let nav = css.find(".nav {").unwrap();
        assert!(css[nav..].find("display").unwrap() < css[nav..].find("color").unwrap());
    }

    #[test]
    fn test_minified_writes_min_file() {
        let (dir, config) = project();
        run(&config, StyleVariant::Minified).unwrap();

        let css = read(dir.path(), "assets/css/style.min.css");
        assert!(!css.contains('\n'), "{css}");
        assert!(css.contains("#123456"), "{css}");
        assert!(css.contains("-ms-flexbox"), "{css}");
        assert_eq!(css.matches("@media").count(), 2, "{css}");
        assert!(css.find("768px").unwrap() < css.find("1024px").unwrap(), "{css}");
        let nav = css.find(".nav{").unwrap();
        assert!(css[nav..].find("display").unwrap() < css[nav..].find("color").unwrap());
        assert!(!dir.path().join("assets/css/style.css").exists());
    }

    #[test]
    fn test_minified_rebuild_is_byte_identical() {
        let (dir, config) = project();
        let task = StyleTask::new(&config, StyleVariant::Minified, None).unwrap();
        let path = dir.path().join("assets/css/style.min.css");

        task.run().unwrap();
        let first = fs::read(&path).unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        task.run().unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_desktop_first_minified() {
        let (dir, mut config) = project();
        config.style.media_sort = crate::config::MediaSort::DesktopFirst;
        fs::write(
            dir.path().join("assets/scss/style.scss"),
            "@media (max-width: 600px) { .a { color: red; } }
             @media (max-width: 900px) { .b { color: blue; } }
             .c { color: green; }
",
        )
        .unwrap();

        run(&config, StyleVariant::Minified).unwrap();
        let css = read(dir.path(), "assets/css/style.min.css");
        assert!(css.find(".c{").unwrap() < css.find("900px").unwrap(), "{css}");
        assert!(css.find("900px").unwrap() < css.find("600px").unwrap(), "{css}");
    }

    #[test]
    fn test_source_mapped_embeds_map() {
        let (dir, config) = project();
        run(&config, StyleVariant::SourceMapped).unwrap();

        let css = read(dir.path(), "assets/css/style.css");
        assert!(css.contains("sourceMappingURL=data:application/json"));
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let (dir, config) = project();
        let task = StyleTask::new(&config, StyleVariant::Standard, None).unwrap();
        task.run().unwrap();
        let first = read(dir.path(), "assets/css/style.css");
        task.run().unwrap();
        assert_eq!(read(dir.path(), "assets/css/style.css"), first);
    }

    #[test]
    fn test_compile_error_writes_nothing() {
        let (dir, config) = project();
        fs::write(dir.path().join("assets/scss/style.scss"), ".a { color: $nope; }").unwrap();

        let err = run(&config, StyleVariant::Standard).unwrap_err();
        assert!(err.is_compile());
        assert!(!dir.path().join("assets/css").exists());
    }

    #[test]
    fn test_missing_entry_is_empty_run() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::for_root(dir.path());
        assert!(run(&config, StyleVariant::Minified).unwrap().is_empty());
    }
}
