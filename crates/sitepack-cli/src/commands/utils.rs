//! Helpers shared by the commands.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sitepack_config::{ConfigDiscovery, SitepackConfig};
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result, ResultExt};

/// Command-line values that replace configured ones.
///
/// Unset fields are skipped so they never shadow the config file.
#[derive(Debug, Default, Serialize)]
pub(crate) struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "DevOverrides::is_empty")]
    pub dev: DevOverrides,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct DevOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

impl DevOverrides {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.port.is_none() && self.open.is_none()
    }
}

/// Absolute project root: `--cwd` (relative to the current directory) or
/// the current directory.
pub(crate) fn resolve_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    let root = match cwd {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current.join(dir),
        None => current,
    };
    if !root.is_dir() {
        return Err(CliError::FileNotFound(root));
    }
    Ok(canonical(root))
}

fn canonical(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

/// Load the layered configuration for `root` and apply `overrides`.
pub(crate) fn load_config(
    root: &Path,
    args: &ConfigArgs,
    overrides: &Overrides,
) -> Result<SitepackConfig> {
    let mut discovery = ConfigDiscovery::new(root);
    if let Some(file) = &args.config {
        discovery = discovery.with_file(file);
    }
    if let Some(path) = discovery.find()? {
        debug!(path = %path.display(), "using config file");
    }
    let config = discovery
        .load_with(overrides)
        .with_hint("Check sitepack.toml and SITEPACK_* environment variables")?;
    sitepack_config::validate_fs(&config, root)?;
    Ok(config)
}

/// Resolves on Ctrl+C. If the handler cannot be installed the future
/// never resolves and the process is stopped the default way.
pub(crate) async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        debug!(error = %err, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Watcher ignore list: configured patterns plus the output directory.
pub(crate) fn watch_ignores(config: &SitepackConfig) -> Vec<String> {
    let mut ignores = config.dev.watch_ignore.clone();
    let out_dir = config.out_dir.to_string_lossy().trim_end_matches('/').to_string();
    if !out_dir.is_empty() && !ignores.contains(&out_dir) {
        ignores.push(out_dir);
    }
    ignores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_skip_unset_fields() {
        let json = serde_json::to_value(Overrides::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));

        let overrides = Overrides {
            out_dir: Some("public".into()),
            dev: DevOverrides {
                port: Some(3000),
                ..DevOverrides::default()
            },
        };
        let json = serde_json::to_value(overrides).unwrap();
        assert_eq!(json, serde_json::json!({ "out_dir": "public", "dev": { "port": 3000 } }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/index.ts"), "").unwrap();
        let toml = "out_dir = \"www\"\n[dev]\nport = 4000\n";
        std::fs::write(dir.path().join("sitepack.toml"), toml).unwrap();

        let overrides = Overrides {
            dev: DevOverrides {
                port: Some(5000),
                ..DevOverrides::default()
            },
            ..Overrides::default()
        };
        let config = load_config(dir.path(), &ConfigArgs::default(), &overrides).unwrap();
        assert_eq!(config.out_dir, PathBuf::from("www"));
        assert_eq!(config.dev.port, 5000);
    }

    #[test]
    fn missing_root_is_reported() {
        let err = resolve_root(Some(Path::new("/definitely/not/here"))).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn output_dir_is_ignored_by_the_watcher() {
        let config = SitepackConfig::default();
        let ignores = watch_ignores(&config);
        assert!(ignores.contains(&"dist".to_string()));
        assert!(ignores.contains(&"node_modules".to_string()));
    }
}
