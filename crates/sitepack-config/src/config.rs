//! The project configuration record.
//!
//! Every field has a default, so an empty `sitepack.toml` (or none at all)
//! describes a working project rooted at `src/`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dev::DevSettings;
use crate::error::{ConfigError, Result};
use crate::rules::RuleTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitepackConfig {
    /// Named entry points. Each name maps to one or more source files.
    pub entries: IndexMap<String, Vec<PathBuf>>,

    /// Output directory, relative to the project root.
    pub out_dir: PathBuf,

    pub resolve: ResolveOptions,

    /// Extension rules, consulted for every discovered file.
    pub rules: RuleTable,

    pub output: OutputOptions,

    pub html: HtmlOptions,

    pub style: StyleOptions,

    pub script: ScriptOptions,

    pub sass: SassOptions,

    pub dev: DevSettings,
}

impl Default for SitepackConfig {
    fn default() -> Self {
        let mut entries = IndexMap::new();
        entries.insert("app".to_string(), vec![PathBuf::from("src/index.ts")]);
        Self {
            entries,
            out_dir: PathBuf::from("dist"),
            resolve: ResolveOptions::default(),
            rules: RuleTable::default(),
            output: OutputOptions::default(),
            html: HtmlOptions::default(),
            style: StyleOptions::default(),
            script: ScriptOptions::default(),
            sass: SassOptions::default(),
            dev: DevSettings::default(),
        }
    }
}

impl SitepackConfig {
    /// Create from a JSON value (programmatic configuration).
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| ConfigError::InvalidValue {
            field: "toml".to_string(),
            hint: Some(format!("Invalid TOML syntax: {e}")),
        })
    }

    /// Entry files in declaration order, paired with their entry name.
    pub fn entry_files(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .flat_map(|(name, paths)| paths.iter().map(move |p| (name.as_str(), p.as_path())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Roots searched for bare specifiers, relative to the project root.
    pub modules: Vec<PathBuf>,

    /// Extensions tried, in order, when a specifier has none.
    pub extensions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            modules: vec![PathBuf::from("src"), PathBuf::from("node_modules")],
            extensions: [
                ".css", ".sass", ".scss", ".js", ".jsx", ".ts", ".tsx", ".json", ".png", ".svg",
                ".jpg", ".jpeg", ".gif", ".txt",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// Source map emission for development builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    /// Data URL appended to the emitted file.
    #[default]
    Inline,
    /// Separate `.map` file next to the asset.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Template for emitted scripts. Supports `[name]` and `[hash]`.
    pub script: String,
    /// Template for emitted stylesheets.
    pub style: String,
    /// Template for copied files. Also supports `[ext]`.
    pub asset: String,
    pub source_map: SourceMapMode,
    /// Number of hex digits of the content hash kept in filenames.
    pub hash_length: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            script: "[name].[hash].min.js".to_string(),
            style: "[name].[hash].min.css".to_string(),
            asset: "img/[name].[hash].[ext]".to_string(),
            source_map: SourceMapMode::Inline,
            hash_length: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    /// Template for the entry document. Without one a minimal page is generated.
    pub template: Option<PathBuf>,
    /// Output path of the entry document, relative to `out_dir`.
    pub filename: PathBuf,
    /// Page title used by the generated document.
    pub title: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            template: None,
            filename: PathBuf::from("index.html"),
            title: "sitepack".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    /// Browserslist queries used for vendor prefixing.
    pub targets: Vec<String>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            targets: vec!["last 2 versions".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    /// Language target for lowering, e.g. `es2015` or `es2022`.
    pub target: String,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            target: "es2022".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SassOptions {
    /// External compiler reading from stdin.
    pub program: String,
    /// Extra arguments passed before the generated ones.
    pub args: Vec<String>,
}

impl Default for SassOptions {
    fn default() -> Self {
        Self {
            program: "sass".to_string(),
            args: Vec::new(),
        }
    }
}
