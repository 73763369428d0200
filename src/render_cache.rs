use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};
use spdlog::warn;

/// One cached rendered page.
#[derive(Debug, PartialEq)]
pub struct CacheEntry {
    pub body: String,
    pub mime_type: String,
}

impl CacheEntry {
    pub fn html(body: String) -> CacheEntry {
        CacheEntry {
            body,
            mime_type: "text/html; charset=utf-8".to_string(),
        }
    }

    pub fn json(body: String) -> CacheEntry {
        CacheEntry {
            body,
            mime_type: "application/json".to_string(),
        }
    }
}

/// Key -> entry store partitioned into categories, so related pages can be
/// evicted in bulk (a category per listing kind, a category per group page).
/// Entries live in memory behind a RwLock; when a cache directory is
/// configured they are also written through to disk, keyed by a hash of the
/// entry key. Disk writes are best-effort: a failure is logged, never
/// propagated.
pub struct RenderCache {
    entries: RwLock<HashMap<String, HashMap<String, Arc<CacheEntry>>>>,
    disk_path: Option<PathBuf>,
}

impl RenderCache {
    pub fn new() -> RenderCache {
        RenderCache {
            entries: RwLock::new(HashMap::new()),
            disk_path: None,
        }
    }

    pub fn with_disk(disk_path: PathBuf) -> RenderCache {
        RenderCache {
            entries: RwLock::new(HashMap::new()),
            disk_path: Some(disk_path),
        }
    }

    pub fn get(&self, key: &str, category: Option<&str>) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read().unwrap();
        entries
            .get(category.unwrap_or(""))
            .and_then(|bucket| bucket.get(key))
            .cloned()
    }

    pub fn put(&self, key: &str, entry: CacheEntry, category: Option<&str>) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        {
            let mut entries = self.entries.write().unwrap();
            entries
                .entry(category.unwrap_or("").to_string())
                .or_default()
                .insert(key.to_string(), entry.clone());
        }
        if let Some(path) = self.file_for(key, category) {
            if let Some(dir) = path.parent() {
                let _ = fs::create_dir_all(dir);
            }
            if let Err(e) = fs::write(&path, &entry.body) {
                warn!("cache write failed for {}: {}", key, e);
            }
        }
        entry
    }

    pub fn evict(&self, key: &str, category: Option<&str>) {
        {
            let mut entries = self.entries.write().unwrap();
            if let Some(bucket) = entries.get_mut(category.unwrap_or("")) {
                bucket.remove(key);
            }
        }
        if let Some(path) = self.file_for(key, category) {
            let _ = fs::remove_file(path);
        }
    }

    pub fn evict_category(&self, category: Option<&str>) {
        {
            let mut entries = self.entries.write().unwrap();
            entries.remove(category.unwrap_or(""));
        }
        if let Some(ref root) = self.disk_path {
            let dir = match category {
                Some(category) => root.join(category),
                None => root.clone(),
            };
            if let Ok(listing) = fs::read_dir(dir) {
                for entry in listing.flatten() {
                    if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                        let _ = fs::remove_file(entry.path());
                    }
                }
            }
        }
    }

    fn file_for(&self, key: &str, category: Option<&str>) -> Option<PathBuf> {
        let root = self.disk_path.as_ref()?;
        let dir = match category {
            Some(category) => root.join(category),
            None => root.clone(),
        };
        let digest = Sha256::digest(key.as_bytes());
        Some(dir.join(format!("{:x}.html", digest)))
    }
}
