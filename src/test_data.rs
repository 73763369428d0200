#![cfg(test)]

/// One content file holding two chronological posts, one grouped page and one
/// draft, in declaration order.
pub const MIXED_CONTENT_MD: &str = "# Post Uno [2011-08-03]

This is a post.

# Post Duo [2011-08-02]

A second post, with more to say.

## A subsection

Still part of the second post.

# About Me [about]

A static page about the author.

# Untitled

A draft without a suffix.
";

/// Single chronological post, as used by the create/update/delete scenarios.
pub const HELLO_MD: &str = "# Hello [2020-01-01]

First words.
";

/// Same post with an edited body. Title and url are unchanged.
pub const HELLO_EDITED_MD: &str = "# Hello [2020-01-01]

Second thoughts.
";
