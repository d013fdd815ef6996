//! Recursive file watcher for rebuild-on-change.
//!
//! Watches the whole project root and forwards relevant changes on a tokio
//! channel. Dependencies, VCS metadata, hidden files, the output directory
//! and the writer's temporary files are filtered out before sending.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{CliError, Result};

const CHANNEL_CAPACITY: usize = 256;

/// Suffix of the output writer's in-flight files.
const TEMP_SUFFIX: &str = ".sitepack-tmp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Keeps the underlying watcher alive; dropping it stops the events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let filter_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "file watcher error");
                    return;
                }
            };
            for path in event.paths {
                if should_ignore(&path, &filter_root, &ignore_patterns) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path),
                    EventKind::Modify(_) => FileChange::Modified(path),
                    EventKind::Remove(_) => FileChange::Removed(path),
                    _ => continue,
                };
                trace!(?change, "file change");
                // Closed receiver: the watch loop has ended.
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Whether a change to `path` should be dropped.
///
/// Patterns are root-relative path prefixes (`node_modules`, `dist`) or
/// `*.ext` suffixes.
pub fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    let relative_str = relative.to_string_lossy().replace('\\', "/");
    if relative_str.is_empty() || relative_str.ends_with(TEMP_SUFFIX) {
        return true;
    }

    for pattern in ignore_patterns {
        let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
        if let Some(suffix) = pattern.strip_prefix('*') {
            if relative_str.ends_with(suffix) {
                return true;
            }
        } else if relative_str == pattern
            || relative_str.starts_with(&format!("{pattern}/"))
            || relative_str.contains(&format!("/{pattern}/"))
        {
            return true;
        }
    }

    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| name.starts_with('.') && name != "." && name != "..")
}
