//! File-based config discovery and layered loading for CLI use.
//!
//! Sources are merged with `figment`, lowest priority first:
//! built-in defaults, `sitepack.toml`, `SITEPACK_*` environment variables,
//! then caller-supplied overrides.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Json, Serialized, Toml};
use serde::Serialize;

use crate::config::SitepackConfig;
use crate::error::{ConfigError, Result};

/// Conventional config file name in the project root.
pub const CONFIG_FILE: &str = "sitepack.toml";

/// Environment variable prefix. Nested keys are separated by `__`,
/// e.g. `SITEPACK_DEV__PORT=3000`.
pub const ENV_PREFIX: &str = "SITEPACK_";

/// Locates and loads the configuration for a project root.
///
/// # Example
///
/// ```no_run
/// use sitepack_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load().unwrap();
/// println!("writing to {}", config.out_dir.display());
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
    explicit: Option<PathBuf>,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            explicit: None,
        }
    }

    /// Use a specific config file instead of searching the root.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.explicit = Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        });
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the config file, if any.
    ///
    /// An explicit file must exist; otherwise `sitepack.toml` in the root is optional.
    pub fn find(&self) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound);
            }
            return Ok(Some(path.clone()));
        }

        let candidate = self.root.join(CONFIG_FILE);
        Ok(candidate.is_file().then_some(candidate))
    }

    /// Load the layered configuration without overrides.
    pub fn load(&self) -> Result<SitepackConfig> {
        self.figment()?.extract().map_err(ConfigError::from)
    }

    /// Load the layered configuration, merging `overrides` last.
    ///
    /// `overrides` is typically a struct of `Option` fields with
    /// `skip_serializing_if = "Option::is_none"`, so only flags the user
    /// actually passed replace lower layers.
    pub fn load_with<T: Serialize>(&self, overrides: &T) -> Result<SitepackConfig> {
        self.figment()?
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(ConfigError::from)
    }

    fn figment(&self) -> Result<Figment> {
        // Defaults come from `#[serde(default)]`; merging a serialized default
        // record would union its entry map with the user's.
        let mut figment = Figment::new();

        if let Some(path) = self.find()? {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = if path.extension().is_some_and(|ext| ext == "json") {
                figment.merge(Json::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

/// Load the configuration for `root`, honoring an optional explicit file.
pub fn discover(root: impl AsRef<Path>, file: Option<&Path>) -> Result<SitepackConfig> {
    let mut discovery = ConfigDiscovery::new(root);
    if let Some(file) = file {
        discovery = discovery.with_file(file);
    }
    discovery.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let config = ConfigDiscovery::new(jail.directory()).load().unwrap();
            assert_eq!(config, SitepackConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_entries_replace_default_entry() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                out_dir = "public"

                [entries]
                docs = ["src/docs/ts/App.ts"]
                "#,
            )?;
            let config = ConfigDiscovery::new(jail.directory()).load().unwrap();
            assert_eq!(config.entries.len(), 1);
            assert!(config.entries.contains_key("docs"));
            assert_eq!(config.out_dir, PathBuf::from("public"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[dev]\nport = 3000\n")?;
            jail.set_env("SITEPACK_DEV__PORT", "4000");
            let config = ConfigDiscovery::new(jail.directory()).load().unwrap();
            assert_eq!(config.dev.port, 4000);
            Ok(())
        });
    }

    #[test]
    fn overrides_win_over_everything() {
        #[derive(Serialize)]
        struct Overrides {
            #[serde(skip_serializing_if = "Option::is_none")]
            out_dir: Option<String>,
        }

        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "out_dir = \"public\"\n")?;
            jail.set_env("SITEPACK_OUT_DIR", "env-out");
            let config = ConfigDiscovery::new(jail.directory())
                .load_with(&Overrides {
                    out_dir: Some("cli-out".into()),
                })
                .unwrap();
            assert_eq!(config.out_dir, PathBuf::from("cli-out"));
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|jail| {
            let result = ConfigDiscovery::new(jail.directory())
                .with_file("custom.toml")
                .load();
            assert!(matches!(result, Err(ConfigError::NotFound)));
            Ok(())
        });
    }

    #[test]
    fn unknown_transform_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                "[[rules]]\ntest = [\"css\"]\nuse = [\"uglify\"]\n",
            )?;
            let result = ConfigDiscovery::new(jail.directory()).load();
            assert!(matches!(result, Err(ConfigError::Extract(_))));
            Ok(())
        });
    }
}
