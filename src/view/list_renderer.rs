use std::io;
use std::io::ErrorKind;
use std::sync::Arc;

use ramhorns::Template;

use crate::content::Post;
use crate::view::{format_date, summarize};

#[derive(ramhorns::Content)]
struct ListPage {
    post_list: Vec<ListItem>,
    page_list: Vec<ViewPagination>,
    show_pagination: bool,
}

#[derive(ramhorns::Content)]
struct ListItem {
    date: String,
    link: String,
    title: String,
    summary: String,
}

#[derive(ramhorns::Content)]
struct ViewPagination {
    current: bool,
    number: usize,
}

pub struct ListRenderer<'a> {
    template: Template<'a>,
    page_count: usize,
}

impl ListRenderer<'_> {
    pub fn new(list_tpl_src: &str, page_count: usize) -> io::Result<ListRenderer> {
        let template = Template::new(list_tpl_src).map_err(|e| {
            io::Error::new(ErrorKind::InvalidInput, format!("Error parsing list template: {}", e))
        })?;

        Ok(ListRenderer {
            template,
            page_count,
        })
    }

    pub fn render(&self, posts: &[Arc<Post>], cur_page: usize) -> String {
        let post_list = posts
            .iter()
            .map(|post| ListItem {
                date: format_date(post),
                link: format!("/{}", post.url),
                title: post.title.clone(),
                summary: summarize(&post.body).to_string(),
            })
            .collect();

        let page_list = (1..=self.page_count)
            .map(|number| ViewPagination {
                current: number == cur_page,
                number,
            })
            .collect();

        self.template.render(&ListPage {
            post_list,
            page_list,
            show_pagination: self.page_count > 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::SystemTime;

    use chrono::NaiveDate;

    use super::*;

    fn post(title: &str, day: u32) -> Arc<Post> {
        let slug = crate::content::heading::slugify(title);
        Arc::new(Post {
            title: title.to_string(),
            slug: slug.clone(),
            date: NaiveDate::from_ymd_opt(2020, 1, day),
            group: None,
            url: format!("2020/01/{:02}/{}", day, slug),
            source_path: PathBuf::from("blog/posts.md"),
            mtime: SystemTime::now(),
            body: format!("Summary of {}.\n\nRest of {}.", title, title),
            seq: day as u64,
        })
    }

    #[test]
    fn test_render_listing() {
        let template_src = "{{#post_list}}[{{date}}|{{link}}|{{title}}|{{summary}}]{{/post_list}}\
{{#show_pagination}}pages:{{#page_list}}({{#current}}*{{/current}}{{number}}){{/page_list}}{{/show_pagination}}";

        let renderer = ListRenderer::new(template_src, 3).unwrap();
        let posts = vec![post("Alpha", 2), post("Beta", 1)];
        let rendered = renderer.render(&posts, 2);

        assert_eq!(
            rendered,
            "[2020-01-02|/2020/01/02/alpha|Alpha|Summary of Alpha.]\
[2020-01-01|/2020/01/01/beta|Beta|Summary of Beta.]\
pages:(1)(*2)(3)"
        );
    }

    #[test]
    fn test_single_page_hides_pagination() {
        let template_src = "{{#show_pagination}}pages{{/show_pagination}}ok";
        let renderer = ListRenderer::new(template_src, 1).unwrap();
        assert_eq!(renderer.render(&[], 1), "ok");
    }
}
