//! Command-line interface definition.
//!
//! - `sitepack build` - one-shot (or watched) build to the output directory
//! - `sitepack dev` - development server with rebuild on change
//! - `sitepack check` - load, validate and plan without emitting

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, ConfigArgs, DevArgs};

/// sitepack - static site asset pipeline
#[derive(Parser, Debug)]
#[command(
    name = "sitepack",
    version,
    about = "Build the static assets of a web site",
    long_about = "sitepack discovers the files reachable from your entry points, runs each\n\
                  through its configured transforms (TypeScript, Sass, CSS, JSON, ...), and\n\
                  writes content-hashed outputs plus an HTML entry document."
)]
pub struct Cli {
    /// Enable debug logging for sitepack crates
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
