use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Builds a url slug out of a post title.
///
/// Non-ascii letters are transliterated first, so `ábaco` becomes `abaco`.
pub fn slug_from_title(title: &str) -> String {
    let ascii = unidecode::unidecode(title);
    let lower_chars = ascii.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' });

    let mut slug = String::new();
    let mut prev_char = None;

    for c in lower_chars {
        if c != '-' || (prev_char != Some('-') && !slug.is_empty()) {
            slug.push(c);
        }
        prev_char = Some(c);
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
