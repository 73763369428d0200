use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use spdlog::{info, warn};
use tokio::sync::mpsc;

use crate::engine::SyncEngine;

/// Bridges OS file-change notification to the engine. Notifications mark the
/// index stale immediately; the actual reconcile runs after a fixed debounce
/// delay, and every notification landing inside the window collapses into the
/// same pass. The delay also rides out editors and sync tools that delete and
/// recreate a file during an atomic save.
pub struct FileWatcher {
    engine: Arc<SyncEngine>,
    debounce: Duration,
    rx: mpsc::UnboundedReceiver<()>,
    // Dropping the watcher removes the OS watches, so it lives as long as
    // the run loop.
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    pub fn new(
        engine: Arc<SyncEngine>,
        patterns: &[String],
        debounce: Duration,
    ) -> notify::Result<FileWatcher> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if !event.kind.is_access() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => warn!("watch error: {}", e),
            }
        })?;

        for root in watch_roots(patterns) {
            info!("watching {}", root.display());
            watcher.watch(&root, RecursiveMode::Recursive)?;
        }

        Ok(FileWatcher {
            engine,
            debounce,
            rx,
            _watcher: watcher,
        })
    }

    /// Debounce-and-drain loop. Never returns while the watch is alive.
    pub async fn run(mut self) {
        while self.rx.recv().await.is_some() {
            self.engine.invalidate();
            tokio::time::sleep(self.debounce).await;
            // Collapse everything that arrived during the window.
            while self.rx.try_recv().is_ok() {}

            match self.engine.reconcile().await {
                Ok(diff) if !diff.is_empty() => info!(
                    "content reloaded: {} created, {} changed, {} deleted",
                    diff.created.len(),
                    diff.changed.len(),
                    diff.deleted.len()
                ),
                Ok(_) => {}
                Err(e) => warn!("background reconcile failed: {}", e),
            }
        }
    }
}

/// Longest literal directory prefix of each pattern; that is what the OS
/// watch attaches to. A pattern without wildcards watches itself when it is
/// a directory, otherwise its parent.
fn watch_roots(patterns: &[String]) -> Vec<PathBuf> {
    let mut roots = vec![];
    for pattern in patterns {
        let mut root = PathBuf::new();
        for component in Path::new(pattern).components() {
            if let Component::Normal(name) = component {
                if name.to_string_lossy().contains('*') {
                    break;
                }
            }
            root.push(component.as_os_str());
        }
        if root.is_dir() {
            roots.push(root);
        } else if let Some(parent) = root.parent() {
            if parent.is_dir() {
                roots.push(parent.to_path_buf());
            }
        }
    }
    roots.sort();
    roots.dedup();
    roots
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::scanner::ContentScanner;
    use crate::test_data::HELLO_MD;

    use super::*;

    #[test]
    fn test_watch_roots_stop_at_wildcards() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("content")).unwrap();

        let pattern = format!("{}/content/*.md", dir.path().display());
        let roots = watch_roots(&[pattern]);
        assert_eq!(roots, vec![dir.path().join("content")]);
    }

    #[test]
    fn test_watch_roots_dedup_and_skip_missing() {
        let dir = tempfile::tempdir().unwrap();
        let a = format!("{}/*", dir.path().display());
        let b = format!("{}/*.md", dir.path().display());
        let missing = "/no/such/place/*".to_string();

        let roots = watch_roots(&[a, b, missing]);
        assert_eq!(roots, vec![dir.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn test_change_triggers_debounced_reconcile() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*", dir.path().display());
        let engine = Arc::new(SyncEngine::new(ContentScanner::new(vec![pattern.clone()])));
        engine.reconcile().await.unwrap();

        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        engine.subscribe(move |event| {
            if let crate::content::PostEvent::Created(_) = event {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let watcher =
            FileWatcher::new(engine.clone(), &[pattern], Duration::from_millis(50)).unwrap();
        tokio::spawn(watcher.run());

        fs::write(dir.path().join("a.md"), HELLO_MD).unwrap();

        // Generous bound; inotify delivery plus the debounce window.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while created.load(Ordering::SeqCst) == 0 {
            assert!(tokio::time::Instant::now() < deadline, "watcher never reconciled");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }
}
