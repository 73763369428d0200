use std::path::Path;
use std::time::SystemTime;

use markdown::mdast::Node;
use markdown::ParseOptions;

use crate::content::heading::{parse_heading, relative_url, slugify};
use crate::content::Post;
use crate::error::BlogError;

/// Splits one content file into posts, one per level-1 heading. Everything
/// between a heading and the next level-1 heading (or end of file) is the
/// post body. Content before the first heading is ignored.
///
/// `next_seq` is the engine's parse-order counter; every post consumes one
/// value. It is never reset while the process lives.
pub fn parse_posts(
    file_body: &str,
    file_path: &Path,
    mtime: SystemTime,
    next_seq: &mut u64,
) -> Result<Vec<Post>, BlogError> {
    let tree = markdown::to_mdast(file_body, &ParseOptions::gfm())
        .map_err(|e| BlogError::parse(file_path, e.reason))?;

    let children = match &tree {
        Node::Root(root) => &root.children,
        _ => return Ok(vec![]),
    };

    // Byte offsets of every level-1 heading, in document order.
    let mut cuts: Vec<(usize, usize)> = vec![];
    for node in children {
        if let Node::Heading(heading) = node {
            if heading.depth == 1 {
                if let Some(pos) = heading.position.as_ref() {
                    cuts.push((pos.start.offset, pos.end.offset));
                }
            }
        }
    }

    let mut posts = Vec::with_capacity(cuts.len());
    for (i, (start, end)) in cuts.iter().enumerate() {
        let heading_text = heading_source(&file_body[*start..*end]);
        let body_end = cuts.get(i + 1).map(|(next, _)| *next).unwrap_or(file_body.len());
        let body = file_body[*end..body_end].trim().to_string();

        let info = parse_heading(&heading_text);
        let slug = slugify(&info.title);
        let url = relative_url(&info, &slug);

        let seq = *next_seq;
        *next_seq += 1;

        posts.push(Post {
            title: info.title,
            slug,
            date: info.date,
            group: info.group,
            url,
            source_path: file_path.to_path_buf(),
            mtime,
            body,
            seq,
        });
    }

    Ok(posts)
}

/// Recovers the heading text from its raw source line, so bracketed suffixes
/// survive untouched by inline markdown parsing.
fn heading_source(raw: &str) -> String {
    let text = raw.trim().trim_start_matches('#').trim();
    // ATX closing sequence: "# Title #" keeps only the title.
    text.trim_end_matches('#').trim_end().to_string()
}
