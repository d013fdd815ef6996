//! Hot update payloads pushed to connected dev clients.

use serde::{Deserialize, Serialize};

use crate::content::ContentKind;
use crate::emit::EmitOutcome;

/// Minimal description of what a rebuild changed.
///
/// Style-only updates are applied in place by the client. A script or the
/// document whose bytes changed asks for a full reload; importers re-emitted
/// with identical bytes do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotUpdate {
    pub build: u64,
    /// URLs of re-emitted assets.
    pub updated: Vec<String>,
    /// URLs that no longer exist.
    pub removed: Vec<String>,
    pub full_reload: bool,
}

impl HotUpdate {
    pub fn from_outcome(build: u64, outcome: &EmitOutcome) -> Self {
        let mut full_reload = false;
        let mut updated = Vec::new();
        for asset in outcome.emitted_assets() {
            if matches!(asset.kind, ContentKind::Script | ContentKind::Document)
                && outcome.is_changed(&asset.path)
            {
                full_reload = true;
            }
            updated.push(asset.url());
        }
        let removed: Vec<String> = outcome.removed.iter().map(|path| format!("/{path}")).collect();
        // A removed script leaves stale modules in the page.
        if removed.iter().any(|url| url.ends_with(".js")) {
            full_reload = true;
        }
        Self {
            build,
            updated,
            removed,
            full_reload,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}
