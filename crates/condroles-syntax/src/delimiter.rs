//! Delimited block openers and closers.
//!
//! A delimiter is either the two-character open block `--`, a run of four or
//! more identical characters from `= * _ - . / +`, or a table fence such as
//! `|===`.

use std::sync::LazyLock;

use regex::Regex;

/// Characters that form four-or-more delimiters.
const REPEATED_CHARS: &[char] = &['=', '*', '_', '-', '.', '/', '+'];

/// Table fences: `|===`, `!===`, `,===`, `:===`.
static TABLE_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[|!,:]={3,}[ \t]*$").unwrap());

/// Return the delimiter if the line opens or closes a delimited block.
///
/// Trailing whitespace is not part of the delimiter.
#[must_use]
pub fn match_delimiter(line: &str) -> Option<&str> {
    let stripped = line.trim_end();

    if stripped == "--" || is_repeated_run(stripped) || TABLE_DELIMITER.is_match(stripped) {
        Some(stripped)
    } else {
        None
    }
}

/// Four or more copies of the same supported character and nothing else.
fn is_repeated_run(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    REPEATED_CHARS.contains(&first) && s.len() >= 4 && chars.all(|c| c == first)
}

/// Whether the block opened by `delimiter` keeps its content verbatim.
///
/// Listing, passthrough, comment and literal blocks are verbatim. Tables are
/// treated as verbatim too: their cells are never reinterpreted as structure.
/// The argument is assumed to be a delimiter returned by [`match_delimiter`].
#[must_use]
pub fn is_verbatim_delimiter(delimiter: &str) -> bool {
    if delimiter == "--" {
        return false;
    }
    matches!(
        delimiter.chars().next(),
        Some('-' | '+' | '/' | '.' | '|' | '!' | ',' | ':')
    )
}

/// Whether the block opened by `delimiter` is a comment block (`////`).
#[must_use]
pub fn is_comment_delimiter(delimiter: &str) -> bool {
    delimiter.len() >= 4 && delimiter.chars().all(|c| c == '/')
}
