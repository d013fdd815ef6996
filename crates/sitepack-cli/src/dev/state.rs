//! Shared state of the development server.
//!
//! The coordinating loop writes build results here; HTTP handlers read the
//! served outputs and subscribe to the event channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use sitepack_bundler::{BuildReport, EmittedAsset};
use tokio::sync::broadcast;

use super::DevEvent;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BuildStatus {
    NotStarted,
    Building,
    #[serde(rename_all = "camelCase")]
    Ready {
        build: u64,
        duration_ms: u64,
        warnings: Vec<String>,
    },
    Failed {
        error: String,
    },
}

impl BuildStatus {
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// An output ready to be served.
#[derive(Debug, Clone)]
pub struct ServedFile {
    pub bytes: Arc<[u8]>,
    pub content_type: &'static str,
}

pub struct DevState {
    status: RwLock<BuildStatus>,
    /// URL path (leading `/`) to file.
    files: RwLock<Arc<HashMap<String, ServedFile>>>,
    document_url: RwLock<String>,
    has_built: RwLock<bool>,
    events: broadcast::Sender<DevEvent>,
    clients: AtomicUsize,
}

pub type SharedState = Arc<DevState>;

impl Default for DevState {
    fn default() -> Self {
        Self::new()
    }
}

impl DevState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            files: RwLock::new(Arc::new(HashMap::new())),
            document_url: RwLock::new("/index.html".to_string()),
            has_built: RwLock::new(false),
            events,
            clients: AtomicUsize::new(0),
        }
    }

    pub fn status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Whether any build has succeeded.
    pub fn has_built(&self) -> bool {
        *self.has_built.read()
    }

    pub fn start_build(&self, changed: Vec<String>) {
        *self.status.write() = BuildStatus::Building;
        self.broadcast(DevEvent::BuildStarted { changed });
    }

    /// Publish a successful build and notify clients.
    pub fn complete_build(
        &self,
        report: &BuildReport,
        assets: &[EmittedAsset],
        document_path: &str,
    ) {
        let files: HashMap<String, ServedFile> = assets
            .iter()
            .map(|asset| {
                (
                    asset.url(),
                    ServedFile {
                        bytes: Arc::from(asset.bytes.as_slice()),
                        content_type: content_type(&asset.path),
                    },
                )
            })
            .collect();
        *self.files.write() = Arc::new(files);
        *self.document_url.write() = format!("/{document_path}");
        *self.has_built.write() = true;
        *self.status.write() = BuildStatus::Ready {
            build: report.build,
            duration_ms: report.duration.as_millis() as u64,
            warnings: report.diagnostics.iter().map(ToString::to_string).collect(),
        };

        match &report.hot {
            Some(update) if !update.is_empty() => {
                self.broadcast(DevEvent::HotUpdate(update.clone()))
            }
            Some(_) => {}
            None => self.broadcast(DevEvent::BuildCompleted { build: report.build }),
        }
        // Sent last so the overlay stays up after the update is applied.
        for diagnostic in &report.diagnostics {
            self.broadcast(DevEvent::BuildFailed {
                error: diagnostic.to_string(),
            });
        }
    }

    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error: error.clone() };
        self.broadcast(DevEvent::BuildFailed { error });
    }

    /// Look up an output by URL path; `/` and directory URLs map to the
    /// entry document.
    pub fn file(&self, url: &str) -> Option<ServedFile> {
        let files = Arc::clone(&self.files.read());
        let resolved = if url == "/" {
            self.document_url.read().clone()
        } else if url.ends_with('/') {
            format!("{url}index.html")
        } else {
            url.to_string()
        };
        files.get(&resolved).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DevEvent> {
        self.events.subscribe()
    }

    pub fn broadcast(&self, event: DevEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn client_connected(&self) -> usize {
        self.clients.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn client_disconnected(&self) {
        self.clients.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }
}

/// MIME type by file extension.
pub fn content_type(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}
