//! Command implementations.
//!
//! - [`build`] - build to disk, optionally watching
//! - [`dev`] - development server
//! - [`check`] - validate and plan without emitting

pub mod build;
pub mod check;
pub mod dev;
pub(crate) mod utils;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
