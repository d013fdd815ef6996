//! Groups bursts of file changes into batches.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use async_stream::stream;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use super::watcher::FileChange;

/// Distinct paths changed within one debounce window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    paths: BTreeSet<PathBuf>,
}

impl ChangeBatch {
    pub fn push(&mut self, change: FileChange) {
        self.paths.insert(change.path().to_path_buf());
    }

    /// Fold an interrupted batch into this one.
    pub fn merge(&mut self, other: ChangeBatch) {
        self.paths.extend(other.paths);
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Short description for status lines.
    pub fn describe(&self, root: &std::path::Path) -> String {
        match self.paths.iter().next() {
            Some(path) if self.paths.len() == 1 => {
                path.strip_prefix(root).unwrap_or(path).display().to_string()
            }
            _ => format!("{} files", self.paths.len()),
        }
    }
}

/// Emit one batch once `window` passes without a new change.
pub fn debounce(
    mut changes: mpsc::Receiver<FileChange>,
    window: Duration,
) -> impl Stream<Item = ChangeBatch> {
    stream! {
        while let Some(first) = changes.recv().await {
            let mut batch = ChangeBatch::default();
            batch.push(first);
            let mut closed = false;
            loop {
                match tokio::time::timeout(window, changes.recv()).await {
                    Ok(Some(change)) => batch.push(change),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break,
                }
            }
            yield batch;
            if closed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn modified(path: &str) -> FileChange {
        FileChange::Modified(PathBuf::from(path))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_becomes_one_batch() {
        let (tx, rx) = mpsc::channel(16);
        let batches = debounce(rx, Duration::from_millis(100));
        tokio::pin!(batches);

        tx.send(modified("/p/a.ts")).await.unwrap();
        tx.send(modified("/p/b.ts")).await.unwrap();
        tx.send(modified("/p/a.ts")).await.unwrap();

        let batch = batches.next().await.unwrap();
        assert_eq!(batch.len(), 2);

        tx.send(modified("/p/c.ts")).await.unwrap();
        drop(tx);
        let batch = batches.next().await.unwrap();
        assert_eq!(batch.describe(std::path::Path::new("/p")), "c.ts");
        assert!(batches.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn changes_after_the_window_start_a_new_batch() {
        let (tx, rx) = mpsc::channel(16);
        let batches = debounce(rx, Duration::from_millis(100));
        tokio::pin!(batches);

        tx.send(modified("/p/a.ts")).await.unwrap();
        let first = batches.next().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(modified("/p/b.ts")).await.unwrap();
        let second = batches.next().await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.paths().next(), Some(&PathBuf::from("/p/b.ts")));
    }

    #[test]
    fn merge_unions_paths() {
        let mut a = ChangeBatch::default();
        a.push(modified("/p/a.ts"));
        let mut b = ChangeBatch::default();
        b.push(modified("/p/b.ts"));
        b.push(modified("/p/a.ts"));
        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.describe(std::path::Path::new("/p")), "2 files");
    }
}
