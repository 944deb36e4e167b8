//! Release command: copy markup, minified styles and minified scripts into
//! the distribution tree.

use anyhow::{Context, Result};

use crate::config::ProjectConfig;
use crate::log;
use crate::pipeline::release::{ReleaseReport, assemble};

/// Assemble the release tree and print a summary.
pub fn build_release(config: &ProjectConfig) -> Result<()> {
    let dir = config.root_join(&config.release.dir);
    log!("build"; "assembling {}", dir.display());

    let report =
        assemble(config).with_context(|| format!("failed to assemble {}", dir.display()))?;

    log!("build"; "{}", summary(&report));
    Ok(())
}

fn summary(report: &ReleaseReport) -> String {
    format!(
        "copied {} file{} ({} templates, {} css, {} js)",
        report.total(),
        if report.total() == 1 { "" } else { "s" },
        report.templates,
        report.css,
        report.js
    )
}
