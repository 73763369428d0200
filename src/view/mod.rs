use std::io;
use std::io::ErrorKind;

use markdown::Options;

use crate::content::Post;
use crate::transform::TransformSet;

pub mod list_renderer;
pub mod post_renderer;
pub mod rss_renderer;

/// Renders a post body to HTML. Image destinations go through the transform
/// set first, then the markdown is compiled with GFM extensions.
pub fn render_body(post: &Post, transforms: &TransformSet) -> io::Result<String> {
    let body = transforms.rewrite_images(&post.body);
    markdown::to_html_with_options(&body, &Options::gfm())
        .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e.reason))
}

/// First paragraph of a body, for listings and feed descriptions.
pub fn summarize(body: &str) -> &str {
    let body = body.trim_start();
    match body.find("\n\n") {
        Some(end) => body[..end].trim_end(),
        None => body.trim_end(),
    }
}

pub fn format_date(post: &Post) -> String {
    match post.date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_takes_first_paragraph() {
        let body = "First paragraph\nstill first.\n\nSecond paragraph.";
        assert_eq!(summarize(body), "First paragraph\nstill first.");
        assert_eq!(summarize("only one"), "only one");
        assert_eq!(summarize(""), "");
    }
}
