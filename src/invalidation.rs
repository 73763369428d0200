use crate::content::{Post, PostEvent};
use crate::render_cache::RenderCache;

/// Category holding the paged listing pages. Order-sensitive: any change to a
/// chronological post reshuffles them.
pub const PAGE_LISTING: &str = "page-listing";
/// Category holding the full archive listing.
pub const FULL_LISTING: &str = "full-listing";
/// Cache key of the drafts listing, kept in the default category.
pub const DRAFTS_KEY: &str = "group/drafts";

/// Cache key of a single rendered post page.
pub fn post_key(post: &Post) -> String {
    format!("post/{}", post.url)
}

/// Evicts exactly the cache entries a lifecycle event makes stale.
pub fn apply(event: &PostEvent, cache: &RenderCache) {
    on_post_modified(event.post(), cache);
}

/// A chronological post invalidates its own page plus every listing, since
/// listings are order-sensitive. A draft only touches the drafts listing.
/// Any other group page may be served under several cache categories keyed
/// by its URL, so the whole category goes.
pub fn on_post_modified(post: &Post, cache: &RenderCache) {
    if post.is_chronological() {
        cache.evict(&post_key(post), None);
        cache.evict_category(Some(PAGE_LISTING));
        cache.evict_category(Some(FULL_LISTING));
    } else if post.group.as_deref() == Some("drafts") {
        cache.evict(DRAFTS_KEY, None);
    } else {
        cache.evict_category(Some(&post.url));
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use chrono::NaiveDate;

    use crate::render_cache::CacheEntry;

    use super::*;

    fn chronological_post() -> Post {
        Post {
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 1, 1),
            group: None,
            url: "2020/01/01/hello".to_string(),
            source_path: PathBuf::from("blog/a.md"),
            mtime: SystemTime::now(),
            body: "First words.".to_string(),
            seq: 0,
        }
    }

    fn grouped(group: &str) -> Post {
        Post {
            title: group.to_string(),
            slug: group.to_string(),
            date: None,
            group: Some(group.to_string()),
            url: group.to_string(),
            source_path: PathBuf::from("blog/pages.md"),
            mtime: SystemTime::now(),
            body: String::new(),
            seq: 1,
        }
    }

    fn seeded_cache() -> RenderCache {
        let cache = RenderCache::new();
        cache.put("post/2020/01/01/hello", CacheEntry::html("post".into()), None);
        cache.put("page/0", CacheEntry::html("p0".into()), Some(PAGE_LISTING));
        cache.put("archive", CacheEntry::html("all".into()), Some(FULL_LISTING));
        cache.put(DRAFTS_KEY, CacheEntry::html("drafts".into()), None);
        cache.put("group/about", CacheEntry::html("about".into()), Some("about"));
        cache
    }

    #[test]
    fn test_chronological_change_evicts_own_page_and_listings() {
        let cache = seeded_cache();
        on_post_modified(&chronological_post(), &cache);

        assert!(cache.get("post/2020/01/01/hello", None).is_none());
        assert!(cache.get("page/0", Some(PAGE_LISTING)).is_none());
        assert!(cache.get("archive", Some(FULL_LISTING)).is_none());
        // Untouched by chronological changes.
        assert!(cache.get(DRAFTS_KEY, None).is_some());
        assert!(cache.get("group/about", Some("about")).is_some());
    }

    #[test]
    fn test_draft_change_evicts_only_drafts_listing() {
        let cache = seeded_cache();
        on_post_modified(&grouped("drafts"), &cache);

        assert!(cache.get(DRAFTS_KEY, None).is_none());
        assert!(cache.get("post/2020/01/01/hello", None).is_some());
        assert!(cache.get("page/0", Some(PAGE_LISTING)).is_some());
        assert!(cache.get("group/about", Some("about")).is_some());
    }

    #[test]
    fn test_group_change_evicts_its_category() {
        let cache = seeded_cache();
        on_post_modified(&grouped("about"), &cache);

        assert!(cache.get("group/about", Some("about")).is_none());
        assert!(cache.get(DRAFTS_KEY, None).is_some());
        assert!(cache.get("page/0", Some(PAGE_LISTING)).is_some());
    }
}
