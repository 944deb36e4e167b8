//! SASS compilation stage.

use std::path::PathBuf;

use grass::{Options, OutputStyle};

use crate::pipeline::{AssetFile, FileSet, PipelineError, PipelineResult, Stage};

/// Compile `.scss` files to CSS, dropping partials.
///
/// Each file is compiled with its own directory and the configured style
/// root as load paths, so `@import "vars"` resolves `_vars.scss` next to it.
#[derive(Debug, Clone)]
pub struct Sass {
    load_paths: Vec<PathBuf>,
}

impl Sass {
    pub fn new(style_root: PathBuf) -> Self {
        Self {
            load_paths: vec![style_root],
        }
    }

    fn compile(&self, file: AssetFile) -> PipelineResult<AssetFile> {
        let path = file.path();

        let mut load_paths = Vec::with_capacity(self.load_paths.len() + 1);
        if let Some(dir) = path.parent() {
            load_paths.push(dir.to_path_buf());
        }
        load_paths.extend(self.load_paths.iter().cloned());

        let options = Options::default()
            .load_paths(&load_paths)
            .style(OutputStyle::Expanded);

        let css = grass::from_string(file.text()?, &options).map_err(|e| PipelineError::Sass {
            path,
            message: e.to_string(),
        })?;

        Ok(file.with_contents(css).with_extension("css"))
    }
}

impl Stage for Sass {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        files
            .into_iter()
            .filter(|file| !is_partial(file))
            .map(|file| self.compile(file))
            .collect()
    }
}

/// `_name.scss` files are only compiled through an import.
fn is_partial(file: &AssetFile) -> bool {
    file.file_name().starts_with('_')
}
