use std::io;

use lazy_static::lazy_static;
use regex::Regex;
use spdlog::warn;

/// What a transform sees when its pattern matched a URL: the full URL plus
/// the pattern's capture groups.
pub struct TransformContext<'a> {
    pub url: &'a str,
    pub groups: Vec<String>,
}

/// A URL rewriter for post bodies. Transforms are tried in registration
/// order; the first whose pattern matches owns the URL.
pub trait Transform: Send + Sync {
    fn pattern(&self) -> &Regex;
    fn transform(&self, ctx: &TransformContext) -> io::Result<String>;
}

#[derive(Default)]
pub struct TransformSet {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformSet {
    pub fn new() -> TransformSet {
        TransformSet { transforms: vec![] }
    }

    pub fn add(&mut self, transform: impl Transform + 'static) {
        self.transforms.push(Box::new(transform));
    }

    pub fn match_url<'a>(&'a self, url: &'a str) -> Option<(&'a dyn Transform, TransformContext<'a>)> {
        for transform in &self.transforms {
            if let Some(caps) = transform.pattern().captures(url) {
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                return Some((transform.as_ref(), TransformContext { url, groups }));
            }
        }
        None
    }

    /// Runs the first matching transform. A transform failure leaves the URL
    /// alone; it is logged, never fatal to rendering.
    pub fn apply(&self, url: &str) -> Option<String> {
        let (transform, ctx) = self.match_url(url)?;
        match transform.transform(&ctx) {
            Ok(rewritten) => Some(rewritten),
            Err(e) => {
                warn!("transform failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Rewrites every markdown image destination `![alt](url)` the transform
    /// set claims, leaving the rest of the body untouched.
    pub fn rewrite_images(&self, body: &str) -> String {
        let mut rewritten = String::with_capacity(body.len());
        let mut remaining = body;

        while let Some(bang) = remaining.find("![") {
            let after_bang = bang + 2;
            rewritten.push_str(&remaining[..after_bang]);
            remaining = &remaining[after_bang..];

            let Some(alt_end) = remaining.find("](") else {
                continue;
            };
            let url_start = alt_end + 2;
            let Some(url_len) = remaining[url_start..].find(')') else {
                continue;
            };

            let url = &remaining[url_start..url_start + url_len];
            rewritten.push_str(&remaining[..alt_end]);
            rewritten.push_str("](");
            match self.apply(url) {
                Some(new_url) => rewritten.push_str(&new_url),
                None => rewritten.push_str(url),
            }
            rewritten.push(')');

            remaining = &remaining[url_start + url_len + 1..];
        }

        rewritten.push_str(remaining);
        rewritten
    }
}

/// Prefixes relative image paths with a base URL, so images checked in next
/// to a content file resolve when the post is served from its own route.
/// Absolute paths and full URLs are left alone.
pub struct RelativeImagePrefix {
    prefix: String,
}

impl RelativeImagePrefix {
    pub fn new(prefix: impl Into<String>) -> RelativeImagePrefix {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        RelativeImagePrefix { prefix }
    }
}

impl Transform for RelativeImagePrefix {
    fn pattern(&self) -> &Regex {
        lazy_static! {
            // A leading plain path component: rejects "/abs" and "http://".
            static ref RELATIVE_REGEX: Regex = Regex::new(r"^[\w.-]+(?:/|$)").unwrap();
        }
        &RELATIVE_REGEX
    }

    fn transform(&self, ctx: &TransformContext) -> io::Result<String> {
        Ok(format!("{}/{}", self.prefix, ctx.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Regex);

    impl Transform for Fixed {
        fn pattern(&self) -> &Regex {
            &self.1
        }
        fn transform(&self, _ctx: &TransformContext) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_first_matching_transform_wins() {
        let mut set = TransformSet::new();
        set.add(Fixed("first", Regex::new("^a").unwrap()));
        set.add(Fixed("second", Regex::new("^ab").unwrap()));
        assert_eq!(set.apply("abc"), Some("first".to_string()));
        assert_eq!(set.apply("zzz"), None);
    }

    #[test]
    fn test_capture_groups_reach_the_transform() {
        let mut set = TransformSet::new();
        set.add(Fixed("x", Regex::new(r"^photos/(\d+)/(\w+)$").unwrap()));
        let (_, ctx) = set.match_url("photos/42/sunset").unwrap();
        assert_eq!(ctx.groups, vec!["42".to_string(), "sunset".to_string()]);
    }

    #[test]
    fn test_relative_prefix_leaves_absolute_urls_alone() {
        let mut set = TransformSet::new();
        set.add(RelativeImagePrefix::new("/content/2020/01/01/hello/"));

        assert_eq!(
            set.apply("salvia.jpg"),
            Some("/content/2020/01/01/hello/salvia.jpg".to_string())
        );
        assert_eq!(set.apply("img/deep.png").unwrap(), "/content/2020/01/01/hello/img/deep.png");
        assert_eq!(set.apply("/already/rooted.png"), None);
        assert_eq!(set.apply("https://example.com/x.jpg"), None);
    }

    #[test]
    fn test_rewrite_images_in_body() {
        let mut set = TransformSet::new();
        set.add(RelativeImagePrefix::new("/content/about"));

        let body = "Intro ![a pic](pic.jpg) and ![ext](https://example.com/e.png) done.";
        let rewritten = set.rewrite_images(body);
        assert_eq!(
            rewritten,
            "Intro ![a pic](/content/about/pic.jpg) and ![ext](https://example.com/e.png) done."
        );
    }

    #[test]
    fn test_rewrite_images_without_images_is_identity() {
        let set = TransformSet::new();
        let body = "No images here, just [a link](somewhere).";
        assert_eq!(set.rewrite_images(body), body);
    }
}
