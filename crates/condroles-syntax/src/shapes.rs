//! Single-line shapes: list items, block titles, section headers, attribute
//! definitions, comments, block attribute lines and continuation markers.

use std::sync::LazyLock;

use regex::Regex;

/// `*`, `**`, `.`, `..` ... followed by required whitespace.
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*+|\.+)[ \t]+(.*)$").unwrap());

/// `=` to `======`, whitespace, title, optional trailing `=` run.
static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={1,6})[ \t]+(.+?)(?:[ \t]+=+)?[ \t]*$").unwrap());

/// `:name: value`, `:!name:`
static ATTRIBUTE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:(!)?([a-zA-Z0-9_-]+):(.*)$").unwrap());

/// A line recognized as a list item start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItemLine<'a> {
    /// The marker run (`*`, `**`, `.`, ...).
    pub marker: &'a str,
    /// Byte offset where the item text starts (after marker and whitespace).
    pub content_start: usize,
}

impl<'a> ListItemLine<'a> {
    /// Marker plus the whitespace that follows it.
    #[must_use]
    pub fn prefix(self, line: &'a str) -> &'a str {
        &line[..self.content_start]
    }
}

/// Match a list item start line.
#[must_use]
pub fn match_list_item(line: &str) -> Option<ListItemLine<'_>> {
    let caps = LIST_ITEM.captures(line)?;
    let marker = caps.get(1)?.as_str();
    let content_start = caps.get(2)?.start();
    Some(ListItemLine {
        marker,
        content_start,
    })
}

/// `.Title`: a dot followed by neither whitespace nor another dot.
#[must_use]
pub fn is_block_title(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('.')
        && chars
            .next()
            .is_some_and(|c| !c.is_whitespace() && c != '.')
}

/// Section header (`== Title`), levels 1 to 6.
#[must_use]
pub fn is_section_header(line: &str) -> bool {
    SECTION_HEADER.is_match(line)
}

/// Attribute definition or unset (`:name: value`, `:!name:`).
#[must_use]
pub fn is_attribute_definition(line: &str) -> bool {
    ATTRIBUTE_DEFINITION.is_match(line)
}

/// `//` line comment; `///` and longer runs are not comments.
#[must_use]
pub fn is_line_comment(line: &str) -> bool {
    line.strip_prefix("//")
        .is_some_and(|rest| !rest.starts_with('/'))
}

/// Block attribute line (`[source,bash]`, `[NOTE]`, `[[anchor]]`).
#[must_use]
pub fn is_block_attribute_line(line: &str) -> bool {
    line.starts_with('[') && line.ends_with(']')
}

/// Lone `+` list continuation marker.
#[must_use]
pub fn is_continuation(line: &str) -> bool {
    line == "+"
}
