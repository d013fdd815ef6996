//! Static rule table mapping file extensions to transform chains.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Identifier of a transform step.
///
/// Serialized as a plain string: the built-in names (`"style"`, `"sass"`, ...)
/// or `"command:<program> [args...]"` for an external stdin/stdout filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TransformId {
    /// CSS parse, prefix and print.
    Style,
    /// Sass/SCSS compilation through an external compiler.
    Sass,
    /// JavaScript/JSX lowering.
    Script,
    /// TypeScript stripping plus script lowering.
    TypeScript,
    /// Binary passthrough.
    File,
    /// Text wrapped as a default-exported string.
    Raw,
    /// JSON wrapped as a default-exported value.
    Json,
    /// HTML document.
    Html,
    /// Arbitrary external program.
    Command { program: String, args: Vec<String> },
}

impl TransformId {
    pub fn name(&self) -> &str {
        match self {
            TransformId::Style => "style",
            TransformId::Sass => "sass",
            TransformId::Script => "script",
            TransformId::TypeScript => "typescript",
            TransformId::File => "file",
            TransformId::Raw => "raw",
            TransformId::Json => "json",
            TransformId::Html => "html",
            TransformId::Command { program, .. } => program,
        }
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformId::Command { program, args } if args.is_empty() => {
                write!(f, "command:{program}")
            }
            TransformId::Command { program, args } => {
                write!(f, "command:{program} {}", args.join(" "))
            }
            other => f.write_str(other.name()),
        }
    }
}

impl TryFrom<String> for TransformId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransformId> for String {
    fn from(id: TransformId) -> Self {
        id.to_string()
    }
}

impl std::str::FromStr for TransformId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(command) = s.strip_prefix("command:") {
            let mut parts = command.split_whitespace().map(str::to_string);
            let program = parts
                .next()
                .ok_or_else(|| ConfigError::UnknownTransform(s.to_string()))?;
            return Ok(TransformId::Command {
                program,
                args: parts.collect(),
            });
        }

        Ok(match s {
            "style" | "css" => TransformId::Style,
            "sass" | "scss" => TransformId::Sass,
            "script" | "js" => TransformId::Script,
            "typescript" | "ts" => TransformId::TypeScript,
            "file" => TransformId::File,
            "raw" => TransformId::Raw,
            "json" => TransformId::Json,
            "html" => TransformId::Html,
            _ => return Err(ConfigError::UnknownTransform(s.to_string())),
        })
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRule {
    /// Extension patterns without the leading dot (`"scss"`, `"d.ts"`).
    pub test: Vec<String>,
    /// Transforms applied in declared order.
    #[serde(rename = "use")]
    pub chain: Vec<TransformId>,
}

impl TransformRule {
    pub fn new<I, S>(test: I, chain: Vec<TransformId>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            test: test.into_iter().map(Into::into).collect(),
            chain,
        }
    }

    /// Length of the longest pattern matching `file_name`, if any.
    pub fn match_len(&self, file_name: &str) -> Option<usize> {
        let lower = file_name.to_ascii_lowercase();
        self.test
            .iter()
            .filter(|pattern| {
                let pattern = pattern.trim_start_matches('.').to_ascii_lowercase();
                lower.len() > pattern.len()
                    && lower.ends_with(&pattern)
                    && lower.as_bytes()[lower.len() - pattern.len() - 1] == b'.'
            })
            .map(|pattern| pattern.trim_start_matches('.').len())
            .max()
    }
}

/// Ordered rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<TransformRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<TransformRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Select the rule for a path.
    ///
    /// The rule with the longest matching pattern wins; rules whose best
    /// patterns are equally long keep declaration order.
    pub fn select(&self, path: &Path) -> Option<&TransformRule> {
        let file_name = path.file_name()?.to_str()?;
        let mut best: Option<(usize, &TransformRule)> = None;
        for rule in &self.rules {
            if let Some(len) = rule.match_len(file_name) {
                if best.is_none_or(|(best_len, _)| len > best_len) {
                    best = Some((len, rule));
                }
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// Whether any rule handles the given path.
    pub fn handles(&self, path: &Path) -> bool {
        self.select(path).is_some()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        use TransformId::*;
        Self::new(vec![
            TransformRule::new(["css"], vec![Style]),
            TransformRule::new(["scss", "sass"], vec![Sass, Style]),
            TransformRule::new(["js", "jsx", "mjs"], vec![Script]),
            TransformRule::new(["ts", "tsx"], vec![TypeScript]),
            TransformRule::new(
                ["png", "svg", "jpg", "jpeg", "gif", "webp", "ico", "woff", "woff2", "ttf", "eot"],
                vec![File],
            ),
            TransformRule::new(["txt"], vec![Raw]),
            TransformRule::new(["json"], vec![Json]),
            TransformRule::new(["html"], vec![Html]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn chain_for(table: &RuleTable, path: &str) -> Option<Vec<TransformId>> {
        table
            .select(&PathBuf::from(path))
            .map(|rule| rule.chain.clone())
    }

    #[test]
    fn default_table_matches_sources() {
        let table = RuleTable::default();
        assert_eq!(
            chain_for(&table, "src/main.scss"),
            Some(vec![TransformId::Sass, TransformId::Style])
        );
        assert_eq!(
            chain_for(&table, "src/App.ts"),
            Some(vec![TransformId::TypeScript])
        );
        assert_eq!(
            chain_for(&table, "img/LOGO.PNG"),
            Some(vec![TransformId::File])
        );
        assert_eq!(chain_for(&table, "notes.md"), None);
    }

    #[test]
    fn longest_pattern_wins() {
        let table = RuleTable::new(vec![
            TransformRule::new(["ts"], vec![TransformId::TypeScript]),
            TransformRule::new(["d.ts"], vec![TransformId::Raw]),
        ]);
        assert_eq!(
            chain_for(&table, "types/index.d.ts"),
            Some(vec![TransformId::Raw])
        );
        assert_eq!(
            chain_for(&table, "types/index.ts"),
            Some(vec![TransformId::TypeScript])
        );
    }

    #[test]
    fn equal_length_keeps_declaration_order() {
        let table = RuleTable::new(vec![
            TransformRule::new(["css"], vec![TransformId::Style]),
            TransformRule::new(["css"], vec![TransformId::Raw]),
        ]);
        assert_eq!(chain_for(&table, "a.css"), Some(vec![TransformId::Style]));
    }

    #[test]
    fn pattern_must_follow_a_dot() {
        let table = RuleTable::new(vec![TransformRule::new(["ss"], vec![TransformId::Raw])]);
        assert_eq!(chain_for(&table, "a.css"), None);
        assert_eq!(chain_for(&table, "ss"), None);
        assert_eq!(chain_for(&table, "a.ss"), Some(vec![TransformId::Raw]));
    }

    #[test]
    fn transform_ids_round_trip_as_strings() {
        let id: TransformId = "command:tr a-z A-Z".parse().unwrap();
        assert_eq!(
            id,
            TransformId::Command {
                program: "tr".into(),
                args: vec!["a-z".into(), "A-Z".into()],
            }
        );
        assert_eq!(id.to_string(), "command:tr a-z A-Z");
        assert!("uglify".parse::<TransformId>().is_err());
        assert!("command:".parse::<TransformId>().is_err());
    }

    #[test]
    fn rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            rules: RuleTable,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[rules]]
            test = ["scss"]
            use = ["sass", "style"]
            "#,
        )
        .unwrap();
        assert_eq!(doc.rules.rules().len(), 1);
        assert_eq!(
            doc.rules.rules()[0].chain,
            vec![TransformId::Sass, TransformId::Style]
        );
    }
}
