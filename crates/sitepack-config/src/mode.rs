//! Build modes and the flags derived from them.
//!
//! A build run has exactly one [`BuildMode`]. Everything the rest of the
//! pipeline needs to know about the mode is captured in [`ModeFlags`], which
//! is computed once per invocation and passed by value to each component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Coarse build mode selected per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

/// Options derived from a [`BuildMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModeFlags {
    /// Minify scripts, styles and the HTML document.
    pub minimize: bool,
    /// Attach source maps to transformed scripts.
    pub source_map: bool,
    /// Produce hot update payloads on rebuild.
    pub hot_reload: bool,
    /// Embed content hashes in output filenames.
    pub hash_filenames: bool,
    /// Keep rebuilding on file changes.
    pub watch: bool,
    /// Abort the build on the first transform failure.
    pub fail_fast: bool,
}

impl BuildMode {
    /// Derive the flag set for this mode.
    pub const fn flags(self) -> ModeFlags {
        let production = matches!(self, BuildMode::Production);
        ModeFlags {
            minimize: production,
            source_map: !production,
            hot_reload: !production,
            hash_filenames: production,
            watch: !production,
            fail_fast: production,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }

    pub const fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl ModeFlags {
    /// Same flags, but continuing to watch after the first build.
    ///
    /// Production builds can be watched too; hashing and minification stay on.
    pub const fn watching(mut self) -> Self {
        self.watch = true;
        self
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(ConfigError::InvalidValue {
                field: "mode".to_string(),
                hint: Some(format!(
                    "unknown mode '{other}', expected 'development' or 'production'"
                )),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_flags() {
        let flags = BuildMode::Development.flags();
        assert!(!flags.minimize);
        assert!(flags.source_map);
        assert!(flags.hot_reload);
        assert!(!flags.hash_filenames);
        assert!(flags.watch);
        assert!(!flags.fail_fast);
    }

    #[test]
    fn production_flags() {
        let flags = BuildMode::Production.flags();
        assert!(flags.minimize);
        assert!(!flags.source_map);
        assert!(!flags.hot_reload);
        assert!(flags.hash_filenames);
        assert!(!flags.watch);
        assert!(flags.fail_fast);
    }

    #[test]
    fn watching_keeps_production_flags() {
        let flags = BuildMode::Production.flags().watching();
        assert!(flags.watch);
        assert!(flags.hash_filenames);
        assert!(flags.minimize);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("prod".parse::<BuildMode>().unwrap(), BuildMode::Production);
        assert_eq!(
            " Development ".parse::<BuildMode>().unwrap(),
            BuildMode::Development
        );
        assert!("staging".parse::<BuildMode>().is_err());
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&BuildMode::Production).unwrap();
        assert_eq!(json, "\"production\"");
    }
}
