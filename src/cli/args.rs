//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Front-end asset pipeline: styles, scripts, dev server and release tree
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: assetline.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the style entry point to a minified `.min.css`
    Min,

    /// Compile the style entry point, plain then minified
    Scss,

    /// Compile the style entry point with an inline source map
    Dev,

    /// Serve the project and recompile styles on change
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Like `watch`, recompiling with inline source maps
    #[command(name = "watch-dev", alias = "watchDev")]
    WatchDev {
        #[command(flatten)]
        serve: ServeArgs,
    },

    /// Sort declarations of every style source in place
    Comb,

    /// Concatenate scripts into the bundle
    Concat,

    /// Minify every script into a `.min.js` sibling
    Uglify,

    /// Assemble the release tree
    #[command(visible_alias = "b")]
    Build,
}

/// Development server overrides for the watch commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// WebSocket port for live reload
    #[arg(long)]
    pub livereload_port: Option<u16>,
}
