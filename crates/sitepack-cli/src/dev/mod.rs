//! Development server: watch, rebuild, serve and push updates.

pub mod coordinator;
pub mod debounce;
pub mod overlay;
pub mod server;
pub mod state;
pub mod watcher;

use serde::Serialize;
use sitepack_bundler::HotUpdate;

pub use coordinator::{BuildHandler, Coordinator};
pub use debounce::{ChangeBatch, debounce};
pub use server::DevServer;
pub use state::{BuildStatus, DevState, SharedState};
pub use watcher::{FileChange, FileWatcher};

/// URL of the reload client script.
pub const CLIENT_PATH: &str = "/__sitepack/client.js";

/// Events pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DevEvent {
    BuildStarted { changed: Vec<String> },
    /// A rebuild finished; the client patches styles or reloads.
    HotUpdate(HotUpdate),
    /// A build finished without a usable hot update.
    BuildCompleted { build: u64 },
    BuildFailed { error: String },
}

impl DevEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            DevEvent::BuildStarted { .. } => "build-started",
            DevEvent::HotUpdate(_) => "hot-update",
            DevEvent::BuildCompleted { .. } => "build-completed",
            DevEvent::BuildFailed { .. } => "build-failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let update = DevEvent::HotUpdate(HotUpdate {
            build: 4,
            updated: vec!["/main.min.css".into()],
            removed: Vec::new(),
            full_reload: false,
        });
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "hotUpdate");
        assert_eq!(json["fullReload"], false);
        assert_eq!(json["updated"][0], "/main.min.css");

        let failed = serde_json::to_value(DevEvent::BuildFailed { error: "x".into() }).unwrap();
        assert_eq!(failed, serde_json::json!({ "type": "buildFailed", "error": "x" }));
    }
}
