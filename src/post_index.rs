use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::content::Post;

/// Derived, immutable-per-version views over the full post set. Rebuilt
/// atomically after every successful reconciliation and swapped in as a new
/// `Arc`; readers holding the previous snapshot keep a consistent view.
pub struct PostIndex {
    /// Reconciliation order.
    pub all: Vec<Arc<Post>>,
    /// Posts with a date, newest first. Equal dates keep declaration order
    /// via the ascending sequence number.
    pub chronological: Vec<Arc<Post>>,
    /// Posts without a date, keyed by group name, relative order preserved.
    pub grouped: HashMap<String, Vec<Arc<Post>>>,
}

impl PostIndex {
    pub fn empty() -> PostIndex {
        PostIndex {
            all: vec![],
            chronological: vec![],
            grouped: HashMap::new(),
        }
    }

    pub fn build(posts: Vec<Arc<Post>>) -> PostIndex {
        let mut chronological: Vec<Arc<Post>> = posts
            .iter()
            .filter(|post| post.date.is_some())
            .cloned()
            .collect();
        chronological.sort_by(|a, b| b.date.cmp(&a.date).then(a.seq.cmp(&b.seq)));

        let mut grouped: HashMap<String, Vec<Arc<Post>>> = HashMap::new();
        for post in posts.iter() {
            if let Some(ref group) = post.group {
                grouped.entry(group.clone()).or_default().push(post.clone());
            }
        }

        PostIndex {
            all: posts,
            chronological,
            grouped,
        }
    }

    /// 0-based page over the chronological view, slice semantics: a page past
    /// the end is empty, never an error.
    pub fn by_page(&self, page_num: usize, page_size: usize) -> &[Arc<Post>] {
        let start = page_num.saturating_mul(page_size);
        if start >= self.chronological.len() {
            return &[];
        }
        let end = (start + page_size).min(self.chronological.len());
        &self.chronological[start..end]
    }

    pub fn by_date(&self, year: i32, month: u32, day: u32) -> Vec<Arc<Post>> {
        let Some(target) = NaiveDate::from_ymd_opt(year, month, day) else {
            return vec![];
        };
        self.chronological
            .iter()
            .filter(|post| post.date == Some(target))
            .cloned()
            .collect()
    }

    /// 0 or 1 results expected; returned as a list like every other query.
    pub fn by_slug_and_date(&self, slug: &str, year: i32, month: u32, day: u32) -> Vec<Arc<Post>> {
        self.by_date(year, month, day)
            .into_iter()
            .filter(|post| post.slug == slug)
            .collect()
    }

    pub fn by_group(&self, group_name: &str) -> Vec<Arc<Post>> {
        self.grouped.get(group_name).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use super::*;

    fn dated_post(title: &str, date: (i32, u32, u32), seq: u64) -> Arc<Post> {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let slug = crate::content::heading::slugify(title);
        Arc::new(Post {
            title: title.to_string(),
            slug: slug.clone(),
            date: Some(date),
            group: None,
            url: format!("{}/{}", date.format("%Y/%m/%d"), slug),
            source_path: PathBuf::from("blog/posts.md"),
            mtime: SystemTime::now(),
            body: format!("body of {}", title),
            seq,
        })
    }

    fn grouped_post(title: &str, group: &str, seq: u64) -> Arc<Post> {
        Arc::new(Post {
            title: title.to_string(),
            slug: crate::content::heading::slugify(title),
            date: None,
            group: Some(group.to_string()),
            url: group.to_string(),
            source_path: PathBuf::from("blog/pages.md"),
            mtime: SystemTime::now(),
            body: String::new(),
            seq,
        })
    }

    #[test]
    fn test_chronological_is_newest_first() {
        let index = PostIndex::build(vec![
            dated_post("Old", (2020, 1, 1), 0),
            dated_post("New", (2022, 5, 1), 1),
            dated_post("Middle", (2021, 3, 1), 2),
        ]);
        let titles: Vec<&str> = index.chronological.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Middle", "Old"]);
    }

    #[test]
    fn test_equal_dates_keep_declaration_order() {
        let index = PostIndex::build(vec![
            dated_post("First", (2020, 1, 1), 0),
            dated_post("Second", (2020, 1, 1), 1),
            dated_post("Third", (2020, 1, 1), 2),
        ]);
        let seqs: Vec<u64> = index.chronological.iter().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_grouped_views() {
        let index = PostIndex::build(vec![
            grouped_post("About Me", "about", 0),
            dated_post("Dated", (2020, 1, 1), 1),
            grouped_post("Draft A", "drafts", 2),
            grouped_post("Draft B", "drafts", 3),
        ]);
        assert_eq!(index.by_group("about").len(), 1);
        let drafts = index.by_group("drafts");
        let draft_titles: Vec<&str> = drafts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(draft_titles, vec!["Draft A", "Draft B"]);
        assert!(index.by_group("missing").is_empty());
        assert_eq!(index.chronological.len(), 1);
    }

    #[test]
    fn test_by_page_slice_semantics() {
        let posts: Vec<Arc<Post>> = (0..25)
            .map(|i| dated_post(&format!("Post {}", i), (2020, 1, 25 - i as u32), i as u64))
            .collect();
        let index = PostIndex::build(posts);

        assert_eq!(index.by_page(0, 10).len(), 10);
        assert_eq!(index.by_page(2, 10).len(), 5);
        assert!(index.by_page(3, 10).is_empty());
        assert!(index.by_page(usize::MAX, 10).is_empty());
    }

    #[test]
    fn test_by_slug_and_date() {
        let index = PostIndex::build(vec![
            dated_post("Hello", (2020, 1, 1), 0),
            dated_post("World", (2020, 1, 1), 1),
        ]);
        let found = index.by_slug_and_date("hello", 2020, 1, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hello");
        assert!(index.by_slug_and_date("hello", 2020, 1, 2).is_empty());
    }
}
