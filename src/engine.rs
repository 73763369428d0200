use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use spdlog::{debug, warn};
use tokio::sync::broadcast;

use crate::content::post_parser::parse_posts;
use crate::content::{Post, PostEvent};
use crate::error::BlogError;
use crate::post_index::PostIndex;
use crate::scanner::ContentScanner;

/// Minimal set of lifecycle changes produced by one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileDiff {
    pub created: Vec<Arc<Post>>,
    pub changed: Vec<Arc<Post>>,
    pub deleted: Vec<Arc<Post>>,
}

impl ReconcileDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}

type EventHook = Box<dyn Fn(&PostEvent) + Send + Sync>;

/// The content synchronization engine. Owns the authoritative `PostIndex`
/// snapshot and reconciles it against the filesystem: a fresh scan is diffed
/// per file against the previously known posts, changed files are reparsed,
/// and Created/Changed/Deleted events fire for exactly what moved.
///
/// Concurrent `reconcile` calls coalesce into a single in-flight pass; every
/// waiter receives the result of that one shared run. Between invalidations,
/// `reconcile` is free: it returns an empty diff and reuses the snapshot.
pub struct SyncEngine {
    scanner: ContentScanner,
    shared: Mutex<Shared>,
    subscribers: Mutex<Vec<EventHook>>,
}

struct Shared {
    /// None until the first successful pass populates it.
    index: Option<Arc<PostIndex>>,
    /// Set by `invalidate`, cleared when a pass starts. An invalidation that
    /// lands mid-pass stays set, so the next debounced reconcile runs again.
    invalid: bool,
    next_seq: u64,
    /// Present while a pass is running; late callers subscribe to it instead
    /// of starting an overlapping scan.
    in_flight: Option<broadcast::Sender<Result<ReconcileDiff, BlogError>>>,
}

impl SyncEngine {
    pub fn new(scanner: ContentScanner) -> SyncEngine {
        SyncEngine {
            scanner,
            shared: Mutex::new(Shared {
                index: None,
                invalid: true,
                next_seq: 0,
                in_flight: None,
            }),
            subscribers: Mutex::new(vec![]),
        }
    }

    /// Marks the index stale. Cheap and synchronous; the actual reload runs
    /// on the next `reconcile`, typically after the watcher's debounce delay.
    pub fn invalidate(&self) {
        self.shared.lock().unwrap().invalid = true;
    }

    pub fn is_invalid(&self) -> bool {
        self.shared.lock().unwrap().invalid
    }

    /// Registers a lifecycle-event hook. Hooks run synchronously, after the
    /// new index has been swapped in and before the reconcile call resolves.
    pub fn subscribe(&self, hook: impl Fn(&PostEvent) + Send + Sync + 'static) {
        self.subscribers.lock().unwrap().push(Box::new(hook));
    }

    /// Rebuilds the index if it is stale and reports what changed.
    pub async fn reconcile(&self) -> Result<ReconcileDiff, BlogError> {
        let mut rx = {
            let mut shared = self.shared.lock().unwrap();
            if let Some(ref tx) = shared.in_flight {
                Some(tx.subscribe())
            } else {
                if !shared.invalid && shared.index.is_some() {
                    return Ok(ReconcileDiff::default());
                }
                let (tx, _) = broadcast::channel(1);
                shared.in_flight = Some(tx);
                None
            }
        };

        if let Some(rx) = rx.as_mut() {
            return match rx.recv().await {
                Ok(shared_result) => shared_result,
                Err(_) => Err(BlogError::Scan("reconciliation aborted".to_string())),
            };
        }

        let result = self.run_pass();

        let tx = self.shared.lock().unwrap().in_flight.take();
        if let Some(tx) = tx {
            // No waiters is fine.
            let _ = tx.send(result.clone());
        }
        result
    }

    /// One scan+parse+diff pass. Runs to completion or failure; there is no
    /// cancellation. On scan failure the previous index stays authoritative.
    fn run_pass(&self) -> Result<ReconcileDiff, BlogError> {
        let (previous, mut next_seq) = {
            let mut shared = self.shared.lock().unwrap();
            shared.invalid = false;
            (shared.index.clone(), shared.next_seq)
        };
        let first_load = previous.is_none();

        let snapshot = match self.scanner.scan() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.shared.lock().unwrap().invalid = true;
                return Err(e);
            }
        };

        let mut previous_by_file: HashMap<PathBuf, Vec<Arc<Post>>> = HashMap::new();
        if let Some(ref index) = previous {
            for post in &index.all {
                previous_by_file
                    .entry(post.source_path.clone())
                    .or_default()
                    .push(post.clone());
            }
        }

        let mut new_posts: Vec<Arc<Post>> = vec![];
        let mut events: Vec<PostEvent> = vec![];

        for (path, mtime) in &snapshot {
            match previous_by_file.remove(path) {
                None => match parse_file(path, *mtime, &mut next_seq) {
                    Ok(posts) => {
                        for post in posts {
                            let post = Arc::new(post);
                            if !first_load {
                                debug!("post created: {}", post.title);
                                events.push(PostEvent::Created(post.clone()));
                            }
                            new_posts.push(post);
                        }
                    }
                    Err(e) => warn!("skipping new file: {}", e),
                },
                Some(mut previous_posts) => {
                    if *mtime > previous_posts[0].mtime {
                        match parse_file(path, *mtime, &mut next_seq) {
                            Ok(posts) => {
                                for post in posts {
                                    let post = Arc::new(post);
                                    let known = previous_posts
                                        .iter()
                                        .position(|old| old.url == post.url);
                                    match known {
                                        Some(at) => {
                                            let old = previous_posts.remove(at);
                                            if !old.content_eq(&post) {
                                                debug!("post changed: {}", post.title);
                                                events.push(PostEvent::Changed(post.clone()));
                                            }
                                        }
                                        None => {
                                            debug!("post created: {}", post.title);
                                            events.push(PostEvent::Created(post.clone()));
                                        }
                                    }
                                    new_posts.push(post);
                                }
                                // Headings that vanished from the file.
                                for old in previous_posts {
                                    debug!("post deleted: {}", old.title);
                                    events.push(PostEvent::Deleted(old));
                                }
                            }
                            Err(e) => {
                                // Keep the previously known posts until a
                                // reparse succeeds; a half-written save must
                                // not drop them from the site.
                                warn!("{}; keeping previous posts", e);
                                new_posts.extend(previous_posts);
                            }
                        }
                    } else {
                        new_posts.extend(previous_posts);
                    }
                }
            }
        }

        // Files that disappeared take all their posts with them.
        for (_, previous_posts) in previous_by_file {
            for old in previous_posts {
                debug!("post deleted: {}", old.title);
                events.push(PostEvent::Deleted(old));
            }
        }

        let index = Arc::new(PostIndex::build(new_posts));
        {
            let mut shared = self.shared.lock().unwrap();
            shared.index = Some(index);
            shared.next_seq = next_seq;
        }

        // Deliver events only after the new snapshot is visible, so hooks
        // that re-query observe the reconciled state.
        let subscribers = self.subscribers.lock().unwrap();
        for event in &events {
            for hook in subscribers.iter() {
                hook(event);
            }
        }

        Ok(diff_from(events))
    }

    /// Returns the current snapshot, reconciling first if it is stale. Every
    /// query funnels through this, so any read can trigger a (coalesced)
    /// reload.
    pub async fn index(&self) -> Result<Arc<PostIndex>, BlogError> {
        {
            let shared = self.shared.lock().unwrap();
            if !shared.invalid {
                if let Some(ref index) = shared.index {
                    return Ok(index.clone());
                }
            }
        }
        self.reconcile().await?;
        let shared = self.shared.lock().unwrap();
        shared
            .index
            .clone()
            .ok_or_else(|| BlogError::Scan("no index after reconcile".to_string()))
    }

    pub async fn get_all(&self) -> Result<Vec<Arc<Post>>, BlogError> {
        Ok(self.index().await?.chronological.clone())
    }

    pub async fn get_by_page(
        &self,
        page_num: usize,
        page_size: usize,
    ) -> Result<Vec<Arc<Post>>, BlogError> {
        Ok(self.index().await?.by_page(page_num, page_size).to_vec())
    }

    pub async fn get_by_date(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Vec<Arc<Post>>, BlogError> {
        Ok(self.index().await?.by_date(year, month, day))
    }

    pub async fn get_by_slug_and_date(
        &self,
        slug: &str,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Vec<Arc<Post>>, BlogError> {
        Ok(self.index().await?.by_slug_and_date(slug, year, month, day))
    }

    pub async fn get_by_group(&self, group_name: &str) -> Result<Vec<Arc<Post>>, BlogError> {
        Ok(self.index().await?.by_group(group_name))
    }
}

fn parse_file(path: &Path, mtime: SystemTime, next_seq: &mut u64) -> Result<Vec<Post>, BlogError> {
    let file_body = fs::read_to_string(path).map_err(|e| BlogError::parse(path, e))?;
    parse_posts(&file_body, path, mtime, next_seq)
}

fn diff_from(events: Vec<PostEvent>) -> ReconcileDiff {
    let mut diff = ReconcileDiff::default();
    for event in events {
        match event {
            PostEvent::Created(post) => diff.created.push(post),
            PostEvent::Changed(post) => diff.changed.push(post),
            PostEvent::Deleted(post) => diff.deleted.push(post),
        }
    }
    diff
}
