//! Project configuration management for `assetline.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── paths      # [paths]   asset role → glob registry
//! │   ├── style      # [style]   prefix targets, media sort
//! │   ├── script     # [script]  minifier and bundle options
//! │   ├── serve      # [serve]   development server
//! │   └── release    # [release] distribution tree
//! ├── types/         # ConfigError, ConfigDiagnostics
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! The config file is optional. Without one, the project root is the working
//! directory and every section uses its defaults.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    MediaSort, Patterns, PathsConfig, QuoteStyle, ReleaseConfig, ScriptConfig, ServeConfig,
    StyleConfig,
};
pub use types::{ConfigDiagnostics, ConfigError};

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up when `-C` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "assetline.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing assetline.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Asset role registry
    #[serde(default)]
    pub paths: PathsConfig,

    /// CSS post-processing
    #[serde(default)]
    pub style: StyleConfig,

    /// Script bundling and minification
    #[serde(default)]
    pub script: ScriptConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Distribution tree layout
    #[serde(default)]
    pub release: ReleaseConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// With `-C`, the given file must exist. Otherwise `assetline.toml` is
    /// searched upward from the working directory; if none is found, defaults
    /// apply and the working directory becomes the project root.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let config_path = match &cli.config {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    bail!("config file `{}` not found", path.display());
                }
                Some(path)
            }
            None => find_config_file(&cwd, Path::new(DEFAULT_CONFIG_NAME)),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        let root = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.clone(), Path::to_path_buf);

        config.set_root(&crate::utils::path::normalize_path(&root));
        config.config_path = config_path;
        config.apply_command_options(cli);
        config.validate()?;

        Ok(config)
    }

    /// Defaults rooted at `root` (no config file).
    pub fn for_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Watch { serve } | Commands::WatchDev { serve } => {
                Self::update_option(&mut self.serve.interface, serve.interface.as_ref());
                Self::update_option(&mut self.serve.port, serve.port.as_ref());
                Self::update_option(
                    &mut self.serve.livereload_port,
                    serve.livereload_port.as_ref(),
                );
            }
            Commands::Min
            | Commands::Scss
            | Commands::Dev
            | Commands::Comb
            | Commands::Concat
            | Commands::Uglify
            | Commands::Build => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.paths.validate(&mut diag);
        self.style.validate(&mut diag);
        self.serve.validate(&mut diag);
        self.release.validate(&mut diag);

        diag.into_result()
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_valid() {
        let config = test_parse_config("");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            ProjectConfig::parse_with_ignored("[paths]\nhtmll = \"*.html\"\n[extra]\nx = 1")
                .unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.iter().any(|f| f == "paths.htmll"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(ProjectConfig::from_str("[paths\nhtml = ").is_err());
    }

    #[test]
    fn test_for_root_uses_defaults() {
        let config = ProjectConfig::for_root(Path::new("/tmp/project"));
        assert_eq!(config.get_root(), Path::new("/tmp/project"));
        assert_eq!(
            config.root_join(&config.paths.js_dir),
            PathBuf::from("/tmp/project/assets/js")
        );
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_root_relative() {
        let config = ProjectConfig::for_root(Path::new("/tmp/project"));
        assert_eq!(
            config.root_relative("/tmp/project/assets/css/style.css"),
            PathBuf::from("assets/css/style.css")
        );
        assert_eq!(
            config.root_relative("/elsewhere/x.css"),
            PathBuf::from("/elsewhere/x.css")
        );
    }

    #[test]
    fn test_validation_reports_every_section() {
        let mut config = test_parse_config("[serve]\nport = 35729\n[release]\njs = \"css\"");
        config.set_root(Path::new("/tmp/project"));
        let err = config.validate().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("serve.livereload_port"));
        assert!(text.contains("release.js"));
    }
}
