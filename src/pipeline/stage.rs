//! Generic stages shared by several pipelines.

use std::fs;
use std::path::{Path, PathBuf};

use super::{AssetFile, FileSet, PipelineError, PipelineResult, Stage};
use crate::debug;
use crate::logger::status_success;
use crate::reload::ReloadHandle;
use crate::utils::path::to_slash;

/// Insert a suffix before the extension: `style.css` → `style.min.css`.
#[derive(Debug, Clone)]
pub struct Rename {
    suffix: &'static str,
}

impl Rename {
    pub fn min() -> Self {
        Self { suffix: ".min" }
    }
}

impl Stage for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        files.try_map(|mut file| {
            file.relative = insert_suffix(&file.relative, self.suffix);
            Ok(file)
        })
    }
}

fn insert_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// Write every file to `dir`, preserving its relative path.
///
/// Files whose bytes already match the target are left untouched so their
/// modification time does not change. The directory is created even when
/// the set is empty.
#[derive(Debug, Clone)]
pub struct Dest {
    dir: PathBuf,
}

impl Dest {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Stage for Dest {
    fn name(&self) -> &'static str {
        "dest"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        fs::create_dir_all(&self.dir).map_err(|source| PipelineError::Write {
            path: self.dir.clone(),
            source,
        })?;

        files.try_map(|file| {
            let target = self.dir.join(&file.relative);
            write_if_changed(&target, &file.contents)?;
            Ok(AssetFile {
                base: self.dir.clone(),
                ..file
            })
        })
    }
}

fn write_if_changed(path: &Path, contents: &[u8]) -> PipelineResult<()> {
    if fs::read(path).is_ok_and(|existing| existing == contents) {
        debug!("dest"; "unchanged: {}", path.display());
        return Ok(());
    }

    let write_err = |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, contents).map_err(write_err)
}

/// Report written files on the status line.
#[derive(Debug, Clone)]
pub struct Notify {
    label: &'static str,
}

impl Notify {
    pub fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Stage for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        if !files.is_empty() {
            status_success(&format!("{}: {}", self.label, files.display_paths()));
        }
        Ok(files)
    }
}

/// Swap the written stylesheets in connected browsers.
///
/// URLs are the file paths relative to `root`, so `root` must be the
/// directory the dev server serves.
pub struct Reload {
    handle: ReloadHandle,
    root: PathBuf,
}

impl Reload {
    pub fn css(handle: ReloadHandle, root: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            root: root.into(),
        }
    }
}

impl Stage for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    fn apply(&self, files: FileSet) -> PipelineResult<FileSet> {
        if files.is_empty() {
            return Ok(files);
        }

        let urls: Vec<String> = files
            .iter()
            .filter_map(|f| {
                let path = f.path();
                let relative = path.strip_prefix(&self.root).ok()?;
                Some(format!("/{}", to_slash(relative)))
            })
            .collect();
        self.handle.reload_css(&urls);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use tempfile::TempDir;

    fn css(relative: &str, text: &str) -> AssetFile {
        AssetFile::new("/src", relative, text.as_bytes().to_vec())
    }

    #[test]
    fn test_insert_suffix() {
        assert_eq!(insert_suffix(Path::new("style.css"), ".min"), PathBuf::from("style.min.css"));
        assert_eq!(
            insert_suffix(Path::new("lib/app.js"), ".min"),
            PathBuf::from("lib/app.min.js")
        );
        assert_eq!(insert_suffix(Path::new("LICENSE"), ".min"), PathBuf::from("LICENSE.min"));
    }

    #[test]
    fn test_dest_preserves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let files = FileSet::new(vec![css("a.css", "a"), css("sub/b.css", "b")]);

        let written = Pipeline::new("test")
            .pipe(Dest::new(&out))
            .run(files)
            .unwrap();

        assert_eq!(fs::read_to_string(out.join("a.css")).unwrap(), "a");
        assert_eq!(fs::read_to_string(out.join("sub/b.css")).unwrap(), "b");
        assert!(written.iter().all(|f| f.base == out));
    }

    #[test]
    fn test_dest_creates_empty_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist/css");
        Dest::new(&out).apply(FileSet::default()).unwrap();
        assert!(out.is_dir());
    }

    #[test]
    fn test_dest_skips_unchanged() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.css");
        fs::write(&target, "same").unwrap();
        let before = fs::metadata(&target).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        Dest::new(dir.path())
            .apply(FileSet::new(vec![css("a.css", "same")]))
            .unwrap();

        let after = fs::metadata(&target).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_rename_then_dest() {
        let dir = TempDir::new().unwrap();
        Pipeline::new("test")
            .pipe(Rename::min())
            .pipe(Dest::new(dir.path()))
            .run(FileSet::new(vec![css("style.css", "a{}")]))
            .unwrap();
        assert!(dir.path().join("style.min.css").is_file());
        assert!(!dir.path().join("style.css").exists());
    }
}
