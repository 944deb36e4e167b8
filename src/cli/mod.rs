//! Command-line interface module.

mod args;
pub mod build;
pub mod serve;
pub mod watch;

pub use args::{Cli, Commands};

use anyhow::{Context, Result};

use crate::config::ProjectConfig;
use crate::logger::status_error;
use crate::pipeline::style::{self, StyleVariant};
use crate::pipeline::{FileSet, PipelineError, PipelineResult, comb, script};
use crate::{debug, log};

/// Dispatch a parsed command.
pub fn run(cli: &Cli, config: &ProjectConfig) -> Result<()> {
    match &cli.command {
        Commands::Min => compile_styles(config, &[StyleVariant::Minified]),
        Commands::Scss => {
            compile_styles(config, &[StyleVariant::Standard, StyleVariant::Minified])
        }
        Commands::Dev => compile_styles(config, &[StyleVariant::SourceMapped]),
        Commands::Watch { .. } => watch::watch(config, StyleVariant::Standard),
        Commands::WatchDev { .. } => watch::watch(config, StyleVariant::SourceMapped),
        Commands::Comb => run_task(config, "comb", comb::reformat(config)),
        Commands::Concat => run_task(config, "concat", script::concat(config)),
        Commands::Uglify => run_task(config, "uglify", script::uglify(config)),
        Commands::Build => build::build_release(config),
    }
}

fn compile_styles(config: &ProjectConfig, variants: &[StyleVariant]) -> Result<()> {
    run_variants(variants, |variant| style::run(config, variant))
}

/// Run style variants in order. A compile error in one variant is reported
/// and the next one still runs.
fn run_variants(
    variants: &[StyleVariant],
    mut run: impl FnMut(StyleVariant) -> PipelineResult<FileSet>,
) -> Result<()> {
    for &variant in variants {
        absorb(run(variant)).with_context(|| format!("{} style build failed", variant.label()))?;
    }
    Ok(())
}

fn run_task(config: &ProjectConfig, name: &str, result: PipelineResult<FileSet>) -> Result<()> {
    let Some(files) = absorb(result).with_context(|| format!("{name} failed"))? else {
        return Ok(());
    };

    log!(name; "wrote {} file{}", files.len(), if files.len() == 1 { "" } else { "s" });
    for file in files.iter() {
        debug!(name; "{}", config.root_relative(file.path()).display());
    }
    Ok(())
}

/// Report a compile error and turn it into `Ok(None)`.
///
/// Any other pipeline error is handed back to the caller.
pub(crate) fn absorb<T>(result: PipelineResult<T>) -> Result<Option<T>, PipelineError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_compile() => {
            status_error(&e.summary(), e.detail());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
