//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation
//! (for in-memory projects and tests).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::SitepackConfig;
use crate::error::{ConfigError, Result};

pub trait ConfigValidator {
    fn validate(&self, config: &SitepackConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// # Example
///
/// ```
/// use sitepack_config::{SitepackConfig, SchemaValidator, ConfigValidator};
///
/// let config = SitepackConfig::default();
/// SchemaValidator.validate(&config).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &SitepackConfig) -> Result<()> {
        if config.entries.values().all(Vec::is_empty) {
            return Err(ConfigError::NoEntries);
        }

        for (name, paths) in &config.entries {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("invalid entry name '{name}'"),
                    hint: Some(
                        "Entry names become file names; use letters, digits, '-' or '_'".into(),
                    ),
                });
            }
            if paths.iter().any(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("entry '{name}' contains an empty path"),
                    hint: None,
                });
            }
        }

        if config.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "out_dir cannot be empty".to_string(),
                hint: Some("Set out_dir to a directory such as \"dist\"".to_string()),
            });
        }

        let mut seen = HashSet::new();
        for (index, rule) in config.rules.rules().iter().enumerate() {
            let blank = |t: &String| t.trim_start_matches('.').is_empty();
            if rule.test.is_empty() || rule.test.iter().any(blank) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("rule #{} has an empty extension pattern", index + 1),
                    hint: Some("Patterns are extensions without the dot, e.g. \"scss\"".into()),
                });
            }
            if rule.chain.is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: format!("rule #{} has no transforms", index + 1),
                    hint: Some("Use [\"file\"] to copy matching files unchanged".into()),
                });
            }
            for pattern in &rule.test {
                let normalized = pattern.trim_start_matches('.').to_ascii_lowercase();
                if !seen.insert(normalized.clone()) {
                    tracing::warn!(
                        pattern = %normalized,
                        "extension pattern declared twice; the first rule wins"
                    );
                }
            }
        }

        for (field, template) in [
            ("output.script", &config.output.script),
            ("output.style", &config.output.style),
            ("output.asset", &config.output.asset),
        ] {
            if !template.contains("[name]") {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    hint: Some(format!("'{template}' must contain the [name] placeholder")),
                });
            }
            let directory = template.rfind('/').map_or("", |i| &template[..i]);
            if directory.contains("[hash]") {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    hint: Some(format!("'{template}' may only use [hash] in the file name")),
                });
            }
        }

        if !(4..=64).contains(&config.output.hash_length) {
            return Err(ConfigError::InvalidValue {
                field: "output.hash_length".to_string(),
                hint: Some("Use a value between 4 and 64".to_string()),
            });
        }

        if config.dev.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dev.port".to_string(),
                hint: Some("Port must be between 1 and 65535".to_string()),
            });
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Validates that entry points and the HTML template exist on disk.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &SitepackConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        for (_, entry) in config.entry_files() {
            let path = self.root.join(entry);
            if !path.is_file() {
                return Err(ConfigError::EntryNotFound { path });
            }
        }

        if let Some(template) = &config.html.template {
            let path = self.root.join(template);
            if !path.is_file() {
                return Err(ConfigError::TemplateNotFound { path });
            }
        }

        Ok(())
    }
}

pub fn validate_schema(config: &SitepackConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

pub fn validate_fs(config: &SitepackConfig, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleTable, TransformId, TransformRule};
    use std::fs;

    #[test]
    fn schema_validator_rejects_empty_entries() {
        let mut config = SitepackConfig::default();
        config.entries.clear();
        assert!(matches!(
            SchemaValidator.validate(&config),
            Err(ConfigError::NoEntries)
        ));
    }

    #[test]
    fn schema_validator_accepts_defaults() {
        assert!(validate_schema(&SitepackConfig::default()).is_ok());
    }

    #[test]
    fn schema_validator_rejects_empty_chain() {
        let mut config = SitepackConfig::default();
        config.rules = RuleTable::new(vec![TransformRule::new(["css"], vec![])]);
        let err = validate_schema(&config).unwrap_err();
        assert!(err.to_string().contains("no transforms"));
    }

    #[test]
    fn schema_validator_rejects_template_without_name() {
        let mut config = SitepackConfig::default();
        config.output.script = "bundle.js".to_string();
        let err = validate_schema(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "output.script"
        ));
    }

    #[test]
    fn schema_validator_rejects_hash_in_directory() {
        let mut config = SitepackConfig::default();
        config.output.asset = "[hash]/[name].[ext]".to_string();
        let err = validate_schema(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "output.asset"
        ));
    }

    #[test]
    fn schema_validator_rejects_empty_pattern() {
        let mut config = SitepackConfig::default();
        config.rules = RuleTable::new(vec![TransformRule::new(["."], vec![TransformId::Raw])]);
        assert!(validate_schema(&config).is_err());
    }

    #[test]
    fn fs_validator_reports_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_fs(&SitepackConfig::default(), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::EntryNotFound { .. }));
    }

    #[test]
    fn fs_validator_accepts_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();
        assert!(validate_fs(&SitepackConfig::default(), dir.path()).is_ok());
    }
}
