//! Asset file-stream pipeline.
//!
//! A task reads files matched by a [`GlobSet`] into a [`FileSet`], pushes it
//! through an ordered list of [`Stage`]s, and usually ends with a [`Dest`]
//! stage that writes the result to disk.
//!
//! ```text
//! ┌─────────┐   ┌──────┐   ┌────────────┐   ┌──────┐   ┌──────┐   ┌────────┐
//! │ GlobSet │ → │ sass │ → │ transforms │ → │ comb │ → │ dest │ → │ reload │
//! └─────────┘   └──────┘   └────────────┘   └──────┘   └──────┘   └────────┘
//! ```
//!
//! Stages run strictly in order. The first failing stage ends the run and
//! later stages never see the files, so a failed compile writes nothing.

pub mod comb;
pub mod error;
pub mod glob;
pub mod release;
pub mod script;
mod stage;
pub mod style;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::{PipelineError, PipelineResult};
pub use glob::GlobSet;
pub use stage::{Dest, Notify, Reload, Rename};

use crate::debug;

// =============================================================================
// Files
// =============================================================================

/// One file travelling through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Directory the relative path is anchored to (the glob base on read,
    /// the destination directory after a write).
    pub base: PathBuf,
    /// Path below `base`, preserved by [`Dest`].
    pub relative: PathBuf,
    pub contents: Vec<u8>,
}

impl AssetFile {
    pub fn new(base: impl Into<PathBuf>, relative: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            base: base.into(),
            relative: relative.into(),
            contents,
        }
    }

    /// Read a file from disk.
    pub fn read(base: &Path, relative: &Path) -> PipelineResult<Self> {
        let path = base.join(relative);
        let contents = fs::read(&path).map_err(|source| PipelineError::Read { path, source })?;
        Ok(Self::new(base, relative, contents))
    }

    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> PipelineResult<&str> {
        std::str::from_utf8(&self.contents)
            .map_err(|_| PipelineError::Encoding { path: self.path() })
    }

    pub fn with_contents(self, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            ..self
        }
    }

    pub fn with_extension(self, extension: &str) -> Self {
        let relative = self.relative.with_extension(extension);
        Self { relative, ..self }
    }

    pub fn file_name(&self) -> &str {
        self.relative
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

/// Ordered set of files; order is glob-resolution order unless a stage
/// says otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<AssetFile>,
}

impl FileSet {
    pub fn new(files: Vec<AssetFile>) -> Self {
        Self { files }
    }

    /// Read every file a glob set matches below `root`.
    pub fn resolve(root: &Path, globs: &GlobSet) -> PipelineResult<Self> {
        let files = globs
            .resolve(root)?
            .into_iter()
            .map(|m| AssetFile::read(&m.base, &m.relative))
            .collect::<PipelineResult<Vec<_>>>()?;
        Ok(Self { files })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetFile> {
        self.files.iter()
    }

    /// Apply a fallible per-file transform, keeping order.
    pub fn try_map<F>(self, f: F) -> PipelineResult<Self>
    where
        F: FnMut(AssetFile) -> PipelineResult<AssetFile>,
    {
        let files = self.files.into_iter().map(f).collect::<PipelineResult<_>>()?;
        Ok(Self { files })
    }

    /// Display paths of all files, for status messages.
    pub fn display_paths(&self) -> String {
        self.files
            .iter()
            .map(|f| f.path().display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl IntoIterator for FileSet {
    type Item = AssetFile;
    type IntoIter = std::vec::IntoIter<AssetFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl FromIterator<AssetFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = AssetFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Stages
// =============================================================================

/// One step of a pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet>;
}

/// Ordered list of stages.
///
/// ```ignore
/// let pipeline = Pipeline::new("uglify")
///     .pipe(Minify::new(&config.script))
///     .pipe(Rename::min())
///     .pipe(Dest::new(js_dir));
/// let written = pipeline.run(FileSet::resolve(root, &globs)?)?;
/// ```
pub struct Pipeline {
    name: &'static str,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    pub fn pipe(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append a stage only when `cond` holds.
    pub fn pipe_if(self, cond: bool, stage: impl Stage + 'static) -> Self {
        if cond { self.pipe(stage) } else { self }
    }

    /// Append an optional stage.
    pub fn pipe_opt(self, stage: Option<impl Stage + 'static>) -> Self {
        match stage {
            Some(stage) => self.pipe(stage),
            None => self,
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first error.
    pub fn run(&self, input: FileSet) -> PipelineResult<FileSet> {
        let mut files = input;
        for stage in &self.stages {
            debug!(self.name; "{} ({} files)", stage.name(), files.len());
            files = stage.apply(files)?;
        }
        Ok(files)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}
