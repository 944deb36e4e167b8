//! Pipeline error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving, transforming or writing a file stream.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid glob pattern `{pattern}`")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to read `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write `{path}`")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{path}` is not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("sass compilation failed: {path}\n{message}")]
    Sass { path: PathBuf, message: String },

    #[error("css processing failed: {path}\n{message}")]
    Css { path: PathBuf, message: String },

    #[error("script minification failed: {path}\n{message}")]
    Script { path: PathBuf, message: String },

    #[error("invalid transform set: {0}")]
    Transform(String),
}

impl PipelineError {
    /// Compile errors are reported and absorbed; everything else is a failure
    /// of the tool itself.
    pub fn is_compile(&self) -> bool {
        matches!(
            self,
            Self::Sass { .. } | Self::Css { .. } | Self::Script { .. }
        )
    }

    /// One-line summary for status output, without the compiler detail.
    pub fn summary(&self) -> String {
        match self {
            Self::Sass { path, .. } => format!("sass failed: {}", path.display()),
            Self::Css { path, .. } => format!("css failed: {}", path.display()),
            Self::Script { path, .. } => format!("script failed: {}", path.display()),
            other => other.to_string(),
        }
    }

    /// Compiler message for compile errors, empty otherwise.
    pub fn detail(&self) -> &str {
        match self {
            Self::Sass { message, .. } | Self::Css { message, .. } | Self::Script { message, .. } => {
                message
            }
            _ => "",
        }
    }
}

/// Result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_errors_are_absorbable() {
        let sass = PipelineError::Sass {
            path: PathBuf::from("assets/scss/style.scss"),
            message: "Error: expected \";\".".into(),
        };
        assert!(sass.is_compile());
        assert_eq!(sass.summary(), "sass failed: assets/scss/style.scss");
        assert_eq!(sass.detail(), "Error: expected \";\".");

        let write = PipelineError::Write {
            path: PathBuf::from("dist/css/style.min.css"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!write.is_compile());
        assert!(write.detail().is_empty());
    }
}
