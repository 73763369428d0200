use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::NaiveDate;

pub mod heading;
pub mod post_parser;

/// One article or page, extracted from a single level-1 heading block in a
/// content file. Posts are replaced wholesale when their source file changes,
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct Post {
    pub title: String,
    pub slug: String,
    /// Set for chronological posts only.
    pub date: Option<NaiveDate>,
    /// Set for grouped posts only. "drafts" when the heading carries no
    /// bracketed suffix.
    pub group: Option<String>,
    /// group name, or YYYY/MM/DD/slug for chronological posts.
    pub url: String,
    pub source_path: PathBuf,
    /// File mtime at parse time. Drives change detection.
    pub mtime: SystemTime,
    /// Raw markdown of the body block, between this heading and the next
    /// level-1 heading. Rendered to HTML on demand.
    pub body: String,
    /// Parse-order counter, monotonic for the lifetime of the engine. Breaks
    /// ties between posts sharing an identical date.
    pub seq: u64,
}

impl Post {
    pub fn is_chronological(&self) -> bool {
        self.date.is_some()
    }

    /// Equality as the reconciliation engine sees it: same title and same
    /// body source. mtime and seq are bookkeeping, not content.
    pub fn content_eq(&self, other: &Post) -> bool {
        self.title == other.title && self.body == other.body
    }
}

/// Lifecycle event emitted during reconciliation. All events for one pass are
/// delivered before the reconcile call resolves; ordering across files is
/// discovery order, not global.
#[derive(Debug, Clone)]
pub enum PostEvent {
    Created(Arc<Post>),
    Changed(Arc<Post>),
    Deleted(Arc<Post>),
}

impl PostEvent {
    pub fn post(&self) -> &Arc<Post> {
        match self {
            PostEvent::Created(post) => post,
            PostEvent::Changed(post) => post,
            PostEvent::Deleted(post) => post,
        }
    }
}
