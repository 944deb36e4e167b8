//! Release assembly: copy markup, minified styles and minified scripts into
//! the distribution tree.

use std::path::{Path, PathBuf};

use super::{Dest, FileSet, GlobSet, Pipeline, PipelineResult};
use crate::config::{Patterns, ProjectConfig};

/// Number of files copied per release subfolder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub templates: usize,
    pub css: usize,
    pub js: usize,
}

impl ReleaseReport {
    pub fn total(&self) -> usize {
        self.templates + self.css + self.js
    }
}

/// Run the three copies in parallel.
///
/// The copies share no output folder, so they never race on a file.
pub fn assemble(config: &ProjectConfig) -> PipelineResult<ReleaseReport> {
    let root = config.get_root();
    let dist = config.root_join(&config.release.dir);
    let release = &config.release;

    let (templates, (css, js)) = rayon::join(
        || copy(root, &config.paths.html, dist.join(&release.templates)),
        || {
            rayon::join(
                || copy(root, &config.paths.css_min, dist.join(&release.css)),
                || copy(root, &config.paths.js_min, dist.join(&release.js)),
            )
        },
    );

    Ok(ReleaseReport {
        templates: templates?,
        css: css?,
        js: js?,
    })
}

fn copy(root: &Path, patterns: &Patterns, dest: PathBuf) -> PipelineResult<usize> {
    let files = FileSet::resolve(root, &GlobSet::new(patterns)?)?;
    let written = Pipeline::new("release").pipe(Dest::new(dest)).run(files)?;
    Ok(written.len())
}
