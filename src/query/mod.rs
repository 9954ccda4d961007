//! Turns the free text a user sends into a search request.
//!
//! Three forms are understood, tried in order:
//! `Author - Title`, tagged fields (`author: X, title: "Y: Z"`) and, as a fallback,
//! the whole text taken as an author name.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref AUTHOR_TITLE_REGEX: Regex = Regex::new(
        r"^(.+?)[ \t\x{00A0}]+[-\x{2010}\x{2011}\x{2012}\x{2013}\x{2014}\x{2212}\x{FE63}\x{FF0D}][ \t\x{00A0}]+(.+)$"
    )
    .unwrap();
    static ref AUTHOR_FIELD_REGEX: Regex = Regex::new(r"(?i)\b(?:author|a)\s*:(\s*)").unwrap();
    static ref TITLE_FIELD_REGEX: Regex =
        Regex::new(r"(?i)\b(?:title|name|t|n)\s*:(\s*)").unwrap();
    static ref VALUE_TAIL_REGEX: Regex = Regex::new(r"(?i)^\s*(?:$|,\s*[a-z]+\s*:)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Literal string handed to every source.
    pub request: String,
    pub title: Option<String>,
    pub author: Option<String>,
}

impl SearchQuery {
    fn new(title: Option<String>, author: Option<String>) -> Self {
        let request = match (&author, &title) {
            (Some(author), Some(title)) => format!("{} {}", author, title),
            (Some(author), None) => author.clone(),
            (None, Some(title)) => title.clone(),
            (None, None) => String::new(),
        };
        Self {
            request,
            title,
            author,
        }
    }
}

pub fn parse(text: &str) -> SearchQuery {
    if let Some((author, title)) = split_author_title(text) {
        return SearchQuery::new(Some(title), Some(author));
    }

    let author = find_field(&AUTHOR_FIELD_REGEX, text);
    let title = find_field(&TITLE_FIELD_REGEX, text);
    if author.is_none() && title.is_none() {
        return SearchQuery::new(None, Some(text.trim().to_string()));
    }
    SearchQuery::new(title, author)
}

fn split_author_title(text: &str) -> Option<(String, String)> {
    let captures = AUTHOR_TITLE_REGEX.captures(text)?;
    let author = captures.get(1)?.as_str().trim();
    let title = captures.get(2)?.as_str().trim();
    if author.is_empty() || title.is_empty() {
        return None;
    }
    Some((author.to_string(), title.to_string()))
}

fn find_field(marker: &Regex, text: &str) -> Option<String> {
    marker.captures_iter(text).find_map(|captures| {
        let (whitespace_start, value_start) = whitespace_span(&captures)?;
        // The value may also start inside the whitespace after the colon.
        let mut start = value_start;
        loop {
            if let Some(value) = value_at(&text[start..]) {
                return Some(value);
            }
            if start == whitespace_start {
                return None;
            }
            start = text[..start]
                .char_indices()
                .next_back()
                .map(|(idx, _)| idx)
                .unwrap_or(whitespace_start);
        }
    })
}

fn whitespace_span(captures: &Captures<'_>) -> Option<(usize, usize)> {
    let whitespace = captures.get(1)?;
    Some((whitespace.start(), whitespace.end()))
}

/// Reads one field value from the beginning of `rest`: either a non-empty
/// quoted string or the shortest run of non-colon, non-quote characters, in both
/// cases followed by the end of the text or by the next `, field:` marker.
fn value_at(rest: &str) -> Option<String> {
    if let Some(quoted) = rest.strip_prefix('"') {
        let closing = quoted.find('"')?;
        if closing == 0 {
            return None;
        }
        let after = &quoted[closing + 1..];
        return VALUE_TAIL_REGEX
            .is_match(after)
            .then(|| quoted[..closing].to_string());
    }

    for (idx, c) in rest.char_indices() {
        if c == ':' || c == '"' {
            return None;
        }
        let end = idx + c.len_utf8();
        if VALUE_TAIL_REGEX.is_match(&rest[end..]) {
            return Some(rest[..end].to_string());
        }
    }
    None
}
