use std::path::PathBuf;

use clap::{Args, Subcommand};
use sitepack_config::BuildMode;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the site into the output directory
    ///
    /// Production builds minify, hash file names and clean the output
    /// directory first. With --watch the build repeats on every change.
    Build(BuildArgs),

    /// Start the development server
    ///
    /// Builds in development mode, serves the outputs from memory and pushes
    /// updates to the browser as files change.
    Dev(DevArgs),

    /// Validate the configuration and the source graph
    ///
    /// Reports missing entries, unresolved references and illegal cycles
    /// without transforming or writing anything.
    Check(CheckArgs),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (defaults to sitepack.toml in the project root)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Build mode
    #[arg(short, long, value_enum, default_value = "production")]
    pub mode: BuildMode,

    /// Output directory, relative to the project root
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Rebuild when source files change
    #[arg(short, long)]
    pub watch: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Port to listen on (the next free port is used if taken)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Open the site in a browser once the server is up
    #[arg(long)]
    pub open: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the planned graph as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
