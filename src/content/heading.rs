use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// Parsed level-1 heading. A heading carries exactly one classification:
/// a date (chronological post) or a group name (everything else).
#[derive(Debug, PartialEq)]
pub struct HeadingInfo {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub group: Option<String>,
}

/// Classifies a heading text of the form `Title [suffix]`.
///
/// - suffix parses as a calendar date -> chronological post
/// - suffix present but not a date -> grouped post
/// - no bracketed suffix -> grouped under "drafts"
pub fn parse_heading(text: &str) -> HeadingInfo {
    lazy_static! {
        static ref TITLE_REGEX: Regex = Regex::new(r"(.*?)\s*\[(.*?)\]").unwrap();
    }

    if let Some(caps) = TITLE_REGEX.captures(text) {
        let title = caps[1].to_string();
        let suffix = &caps[2];
        match NaiveDate::parse_from_str(suffix, "%Y-%m-%d") {
            Ok(date) => HeadingInfo {
                title,
                date: Some(date),
                group: None,
            },
            Err(_) => HeadingInfo {
                title,
                date: None,
                group: Some(suffix.to_string()),
            },
        }
    } else {
        HeadingInfo {
            title: text.trim().to_string(),
            date: None,
            group: Some("drafts".to_string()),
        }
    }
}

/// Derives a URL slug from a title: transliterate, lowercase, collapse
/// whitespace runs to single hyphens, strip anything outside [a-z0-9-].
pub fn slugify(title: &str) -> String {
    let title = unidecode::unidecode(title).to_lowercase();
    let hyphenated: Vec<&str> = title.split_whitespace().collect();
    let hyphenated = hyphenated.join("-");
    hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Relative URL for a post: the group name as-is, or YYYY/MM/DD/slug.
pub fn relative_url(info: &HeadingInfo, slug: &str) -> String {
    match (&info.date, &info.group) {
        (Some(date), _) => format!("{}/{}", date.format("%Y/%m/%d"), slug),
        (None, Some(group)) => group.clone(),
        (None, None) => slug.to_string(),
    }
}
