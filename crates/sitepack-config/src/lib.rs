//! Configuration for sitepack builds.
//!
//! This crate owns everything that is decided before a build starts: the
//! [`BuildMode`] and its derived [`ModeFlags`], the extension [`RuleTable`],
//! and the project [`SitepackConfig`] loaded from `sitepack.toml`.

pub mod config;
pub mod dev;
pub mod discovery;
pub mod error;
pub mod mode;
pub mod rules;
pub mod validation;

pub use config::*;
pub use dev::*;
pub use error::*;
pub use mode::{BuildMode, ModeFlags};
pub use rules::{RuleTable, TransformId, TransformRule};

pub use discovery::{CONFIG_FILE, ConfigDiscovery, ENV_PREFIX, discover};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
