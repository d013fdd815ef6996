//! Content flowing through a transform chain.

use serde::{Deserialize, Serialize};
use sitepack_graph::SourceKind;

/// What a piece of content currently is. A chain may change it, e.g. `raw`
/// turns text into a script module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Script,
    Style,
    Document,
    File,
}

impl ContentKind {
    /// Kind of a node's bytes before any transform ran.
    pub fn initial(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Script => ContentKind::Script,
            SourceKind::Style | SourceKind::Sass => ContentKind::Style,
            SourceKind::Document => ContentKind::Document,
            SourceKind::Data | SourceKind::Text | SourceKind::File => ContentKind::File,
        }
    }

    pub fn is_textual(self) -> bool {
        !matches!(self, ContentKind::File)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Script => "script",
            ContentKind::Style => "style",
            ContentKind::Document => "document",
            ContentKind::File => "file",
        }
    }
}

/// A generated source map in both serialized forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    pub json: String,
    /// `data:application/json;...;base64,` URL of the same map.
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
    pub source_map: Option<SourceMap>,
}

impl Content {
    pub fn new(bytes: impl Into<Vec<u8>>, kind: ContentKind) -> Self {
        Self {
            bytes: bytes.into(),
            kind,
            source_map: None,
        }
    }

    pub fn script(code: impl Into<String>) -> Self {
        Self::new(code.into(), ContentKind::Script)
    }

    pub fn style(code: impl Into<String>) -> Self {
        Self::new(code.into(), ContentKind::Style)
    }

    pub fn with_source_map(mut self, map: Option<SourceMap>) -> Self {
        self.source_map = map;
        self
    }

    /// Borrow the bytes as UTF-8 text.
    pub fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| anyhow::anyhow!("content is not valid UTF-8: {e}"))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_kind_follows_source_family() {
        assert_eq!(ContentKind::initial(SourceKind::Sass), ContentKind::Style);
        assert_eq!(ContentKind::initial(SourceKind::Text), ContentKind::File);
        assert_eq!(ContentKind::initial(SourceKind::Document), ContentKind::Document);
    }

    #[test]
    fn text_rejects_binary() {
        let content = Content::new(vec![0xff, 0xfe], ContentKind::File);
        assert!(content.text().is_err());
        assert_eq!(Content::script("x").text().unwrap(), "x");
    }
}
