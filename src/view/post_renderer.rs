use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

use crate::content::Post;
use crate::view::format_date;

#[derive(ramhorns::Content)]
struct ViewItem<'a> {
    date: &'a str,
    group: &'a str,
    post_title: &'a str,
    post_content: &'a str,
}

pub struct PostRenderer<'a> {
    template: Template<'a>,
}

impl PostRenderer<'_> {
    pub fn new(view_tpl_src: &str) -> io::Result<PostRenderer> {
        let template = Template::new(view_tpl_src).map_err(|e| {
            io::Error::new(
                ErrorKind::InvalidInput,
                format!("Error parsing post view template: {}", e),
            )
        })?;

        Ok(PostRenderer { template })
    }

    /// `content` is the post body already rendered to HTML.
    pub fn render(&self, post: &Post, content: &str) -> String {
        let date = format_date(post);
        self.template.render(&ViewItem {
            date: date.as_str(),
            group: post.group.as_deref().unwrap_or(""),
            post_title: post.title.as_str(),
            post_content: content,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use chrono::NaiveDate;

    use crate::content::Post;

    use super::*;

    #[test]
    fn test_render_view() {
        let template_src = r##"
TITLE=[{{{post_title}}}]
DATE=[{{date}}]
CONTENT=[{{{post_content}}}]"##;
        let renderer = PostRenderer::new(template_src).unwrap();
        let post = Post {
            title: "<Hello>".to_string(),
            slug: "hello".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 1, 1),
            group: None,
            url: "2020/01/01/hello".to_string(),
            source_path: PathBuf::from("blog/a.md"),
            mtime: SystemTime::now(),
            body: "First words.".to_string(),
            seq: 0,
        };
        let rendered = renderer.render(&post, "<p>First words.</p>");
        assert_eq!(
            rendered,
            r##"
TITLE=[<Hello>]
DATE=[2020-01-01]
CONTENT=[<p>First words.</p>]"##
        );
    }
}
