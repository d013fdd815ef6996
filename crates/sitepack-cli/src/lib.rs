//! sitepack command-line interface.
//!
//! - [`cli`] - argument definitions
//! - [`commands`] - `build`, `dev` and `check`
//! - [`dev`] - watcher, rebuild coordination and the development server
//! - [`error`] - CLI errors and their `miette` rendering
//! - [`logger`] - `tracing` subscriber setup
//! - [`ui`] - terminal output

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;
