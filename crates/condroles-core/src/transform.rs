//! Conditional transformer.
//!
//! Rewrites every classified span so its value restriction becomes role
//! markup, then deletes the directive lines. Deletion waits until all spans
//! are rewritten so that line ids recorded during parsing (block ends, list
//! starts) stay valid for the whole pass.

use std::collections::BTreeSet;

use condroles_syntax::{is_comment_delimiter, match_list_item};
use tracing::debug;

use crate::classifier::{Conditional, ConditionalMap, SpanKind};
use crate::document::{Document, Line, LineId};
use crate::error::Error;
use crate::roles::{INLINE_CLOSE, RoleFormat};
use crate::state::{BlockPhase, BlockPrefix, DelimitedBlock, ListPhase, ParagraphPhase, State};

/// Apply every conditional in `map` to `document`.
pub fn transform(
    document: &mut Document,
    map: &ConditionalMap,
    roles: &RoleFormat,
) -> Result<(), Error> {
    let conditionals = map.as_slice();
    let mut index = 0;
    while let Some(conditional) = conditionals.get(index) {
        debug!(line = %conditional.start, kind = %conditional.kind, "resolving conditional");
        index += match conditional.kind {
            SpanKind::Partial => {
                wrap_inline(document, conditional, roles)?;
                1
            }
            SpanKind::SingleListItem | SpanKind::PartStartListItem => {
                wrap_list_item(document, conditional, roles, true)?;
                1
            }
            SpanKind::GroupStartListItem => {
                transform_group(document, &conditionals[index..], roles)?
            }
            SpanKind::Blocks => {
                transform_blocks(document, conditional, roles)?;
                1
            }
        };
    }

    for conditional in conditionals {
        document.remove(conditional.start)?;
        document.remove(conditional.end)?;
    }
    Ok(())
}

/// First and last non-blank lines between the directives.
fn text_bounds(doc: &Document, conditional: &Conditional) -> Result<(LineId, LineId), Error> {
    let span = doc.range(conditional.start, conditional.end)?;
    let inner = span.get(1..span.len().saturating_sub(1)).unwrap_or_default();
    let mut text = Vec::new();
    for &id in inner {
        if !doc.line(id)?.is_blank() {
            text.push(id);
        }
    }
    match (text.first(), text.last()) {
        (Some(&first), Some(&last)) => Ok((first, last)),
        _ => Err(Error::UnexpectedState {
            line: conditional.start,
            expected: "content between directives",
            found: "blank lines".to_owned(),
        }),
    }
}

fn close_inline(doc: &mut Document, id: LineId) -> Result<(), Error> {
    let line = doc.line_mut(id)?;
    line.content = format!("{}{INLINE_CLOSE}", line.content.trim_end());
    Ok(())
}

fn wrap_inline(doc: &mut Document, conditional: &Conditional, roles: &RoleFormat) -> Result<(), Error> {
    let (first, last) = text_bounds(doc, conditional)?;
    let open = roles.inline_open(&conditional.values);
    let line = doc.line_mut(first)?;
    line.content = format!("{open}{}", line.content.trim_start());
    close_inline(doc, last)
}

/// Marker of the list item a list item span starts with.
fn item_marker(doc: &Document, conditional: &Conditional) -> Result<String, Error> {
    let (first, _) = text_bounds(doc, conditional)?;
    let line = doc.line(first)?;
    match_list_item(&line.content)
        .map(|item| item.marker.to_owned())
        .ok_or_else(|| not_a_list_item(line))
}

fn not_a_list_item(line: &Line) -> Error {
    Error::UnexpectedState {
        line: line.id(),
        expected: "list item marker",
        found: line.content.clone(),
    }
}

/// Splice `open` in right after the list marker of `id`. Without
/// `keep_marker` the marker is dropped, folding the item into the one before
/// it.
fn open_after_marker(
    doc: &mut Document,
    id: LineId,
    open: &str,
    keep_marker: bool,
) -> Result<(), Error> {
    let line = doc.line_mut(id)?;
    let item = match_list_item(&line.content).ok_or_else(|| not_a_list_item(line))?;
    let (prefix, text) = line.content.split_at(item.content_start);
    line.content = if keep_marker {
        format!("{prefix}{open}{text}")
    } else {
        format!("{open}{text}")
    };
    Ok(())
}

/// Open an inline role after the item marker and close it at the last line
/// of the span.
fn wrap_list_item(
    doc: &mut Document,
    conditional: &Conditional,
    roles: &RoleFormat,
    keep_marker: bool,
) -> Result<(), Error> {
    let (first, last) = text_bounds(doc, conditional)?;
    open_after_marker(doc, first, &roles.inline_open(&conditional.values), keep_marker)?;
    close_inline(doc, last)
}

/// Resolve a chain of adjacent group spans sharing one marker. Returns how
/// many spans the chain consumed.
fn transform_group(
    doc: &mut Document,
    chain: &[Conditional],
    roles: &RoleFormat,
) -> Result<usize, Error> {
    let Some((head, rest)) = chain.split_first() else {
        return Ok(1);
    };
    let marker = item_marker(doc, head)?;
    wrap_list_item(doc, head, roles, true)?;

    let mut previous = head;
    let mut consumed = 1;
    for member in rest {
        let adjacent = doc.next_line(previous.end)?.map(Line::id) == Some(member.start);
        if member.kind != SpanKind::GroupStartListItem
            || !adjacent
            || item_marker(doc, member)? != marker
        {
            break;
        }
        wrap_list_item(doc, member, roles, false)?;
        previous = member;
        consumed += 1;
    }
    Ok(consumed)
}

/// Insert `[role="..."]` above `before`.
fn insert_role_line(
    doc: &mut Document,
    before: LineId,
    roles: &RoleFormat,
    values: &BTreeSet<String>,
) -> Result<(), Error> {
    let mut stack = doc.line(before)?.stack.clone();
    stack.pop();
    stack.push(State::BlockPrefix(BlockPrefix::Attributes));
    doc.insert_before(before, roles.attribute_line(values), stack)?;
    Ok(())
}

fn attach_or_insert(
    doc: &mut Document,
    id: LineId,
    roles: &RoleFormat,
    values: &BTreeSet<String>,
) -> Result<(), Error> {
    let attached = roles.attach(&doc.line(id)?.content, values);
    match attached {
        Some(updated) => doc.line_mut(id)?.content = updated,
        None => insert_role_line(doc, id, roles, values)?,
    }
    Ok(())
}

/// Wrap the text of the list item starting at `id` inline, up to its first
/// joiner, blank line or `end`. Returns the last wrapped line.
fn wrap_item_text(
    doc: &mut Document,
    id: LineId,
    end: LineId,
    roles: &RoleFormat,
    values: &BTreeSet<String>,
) -> Result<LineId, Error> {
    let mut last = id;
    let mut cursor = doc.position(id)? + 1;
    while let Some(next) = doc.id_at(cursor)
        && next != end
    {
        let same_item = matches!(
            doc.line(next)?.stack.top(),
            State::ListItem(item) if item.phase == ListPhase::Normal && item.item_start_line == id
        );
        if !same_item {
            break;
        }
        last = next;
        cursor += 1;
    }
    open_after_marker(doc, id, &roles.inline_open(values), true)?;
    close_inline(doc, last)?;
    Ok(last)
}

/// If the whole list starting at `list_start` ends before `end`, return its
/// last line.
fn list_end_within(doc: &Document, list_start: LineId, end: LineId) -> Result<Option<LineId>, Error> {
    let mut last = list_start;
    let mut cursor = doc.position(list_start)? + 1;
    while let Some(id) = doc.id_at(cursor) {
        if id == end {
            let continues = doc
                .next_significant(end)?
                .is_some_and(|line| line.stack.contains_list(list_start));
            return Ok((!continues).then_some(last));
        }
        let line = doc.line(id)?;
        let mut resume = id;
        if !line.is_skippable() {
            if !line.stack.contains_list(list_start) {
                return Ok(Some(last));
            }
            // Blocks attached to an item belong to the list.
            if let State::DelimitedBlock(DelimitedBlock {
                phase: BlockPhase::Start,
                block_end_line,
                ..
            }) = line.stack.top()
            {
                resume = block_end_line.ok_or(Error::UnsealedBlock(id))?;
            }
            last = resume;
        }
        cursor = doc.position(resume)? + 1;
    }
    Ok(Some(last))
}

/// Give every paragraph, block and list in the span an attribute line.
///
/// `pending` is set once an attribute line is in place for the next element,
/// so a title followed by attributes and a block gets a single role.
fn transform_blocks(
    doc: &mut Document,
    conditional: &Conditional,
    roles: &RoleFormat,
) -> Result<(), Error> {
    let values = &conditional.values;
    let mut pending = false;
    let mut cursor = doc.position(conditional.start)? + 1;

    while let Some(id) = doc.id_at(cursor) {
        if id == conditional.end {
            break;
        }
        let mut resume = id;
        let top = doc.line(id)?.stack.top().clone();
        match top {
            State::BlockPrefix(BlockPrefix::Attributes) => {
                if !pending {
                    attach_or_insert(doc, id, roles, values)?;
                }
                pending = true;
            }
            State::BlockPrefix(BlockPrefix::Title) => {
                if !pending {
                    insert_role_line(doc, id, roles, values)?;
                }
                pending = true;
            }
            State::DelimitedBlock(block) if block.phase == BlockPhase::Start => {
                resume = block.block_end_line.ok_or(Error::UnsealedBlock(id))?;
                if !is_comment_delimiter(&block.delimiter) {
                    if !pending {
                        insert_role_line(doc, id, roles, values)?;
                    }
                    pending = false;
                }
            }
            State::Paragraph {
                phase: ParagraphPhase::FirstLine,
                ..
            } => {
                if !pending {
                    insert_role_line(doc, id, roles, values)?;
                }
                pending = false;
            }
            State::ListItem(item) if item.phase == ListPhase::JoinedFirstLine => {
                if !pending {
                    insert_role_line(doc, id, roles, values)?;
                }
                pending = false;
            }
            State::ListItem(item) if item.phase == ListPhase::FirstLine => {
                let whole_list = if item.list_start_line == id {
                    list_end_within(doc, id, conditional.end)?
                } else {
                    None
                };
                resume = match whole_list {
                    Some(list_end) => {
                        if !pending {
                            insert_role_line(doc, id, roles, values)?;
                        }
                        list_end
                    }
                    None => wrap_item_text(doc, id, conditional.end, roles, values)?,
                };
                pending = false;
            }
            State::Conditional(_) | State::LineComment | State::AttributeDefinition => {}
            _ => pending = false,
        }
        cursor = doc.position(resume)? + 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::classifier::classify;
    use crate::parser::parse;

    fn resolve(lines: &[&str]) -> Vec<String> {
        let mut parsed = parse(lines).unwrap();
        let values = ["azure", "aws", "gcp"].iter().map(|v| (*v).to_owned()).collect();
        let classified = classify(&parsed.document, &values).unwrap();
        let roles = RoleFormat::new(Some("platform".to_owned()));
        transform(&mut parsed.document, &classified.map, &roles).unwrap();
        parsed.document.contents()
    }

    #[test]
    fn test_paragraph_gets_attribute_line() {
        let output = resolve(&[
            "Some intro text.",
            "",
            "ifdef::azure[]",
            "This is conditional content.",
            "endif::[]",
            "",
            "More text after.",
        ]);
        assert_eq!(
            output,
            vec![
                "Some intro text.",
                "",
                r#"[role="platform:azure"]"#,
                "This is conditional content.",
                "",
                "More text after.",
            ]
        );
    }

    #[test]
    fn test_partial_is_inline() {
        let output = resolve(&[
            "This is a paragraph with",
            "ifdef::azure[]",
            "some conditional text",
            "endif::[]",
            "in the middle.",
        ]);
        assert_eq!(
            output,
            vec![
                "This is a paragraph with",
                "[.platform:azure]#some conditional text#",
                "in the middle.",
            ]
        );
    }

    #[test]
    fn test_partial_over_several_lines() {
        let output = resolve(&[
            "Intro",
            "ifndef::azure[]",
            "  first line",
            "second line",
            "endif::[]",
        ]);
        assert_eq!(
            output,
            vec![
                "Intro",
                "[.platform:aws.platform:gcp]#first line",
                "second line#",
            ]
        );
    }

    #[test]
    fn test_single_list_item() {
        let output = resolve(&[
            "* Common",
            "ifdef::azure[]",
            "* Azure only",
            "endif::[]",
            "* Common again",
        ]);
        assert_eq!(
            output,
            vec![
                "* Common",
                "* [.platform:azure]#Azure only#",
                "* Common again",
            ]
        );
    }

    #[test]
    fn test_part_start_list_item() {
        let output = resolve(&[
            "ifdef::azure[]",
            ". Azure step",
            "endif::[]",
            "shared continuation",
        ]);
        assert_eq!(
            output,
            vec![". [.platform:azure]#Azure step#", "shared continuation"]
        );
    }

    #[test]
    fn test_group_start_list_items() {
        let output = resolve(&[
            "ifdef::azure[]",
            "* Azure item",
            "endif::[]",
            "ifdef::aws[]",
            "* AWS item",
            "endif::[]",
            "shared continuation",
        ]);
        assert_eq!(
            output,
            vec![
                "* [.platform:azure]#Azure item#",
                "[.platform:aws]#AWS item#",
                "shared continuation",
            ]
        );
    }

    #[test]
    fn test_title_and_block_share_one_role() {
        let output = resolve(&[
            "ifdef::azure[]",
            ".Example",
            "----",
            "code",
            "----",
            "endif::[]",
        ]);
        assert_eq!(
            output,
            vec![r#"[role="platform:azure"]"#, ".Example", "----", "code", "----"]
        );
    }

    #[test]
    fn test_existing_attribute_line_takes_role() {
        let output = resolve(&[
            "ifdef::azure[]",
            "[source,bash]",
            "----",
            "ls",
            "----",
            "endif::[]",
        ]);
        assert_eq!(
            output,
            vec![r#"[source,bash,role="platform:azure"]"#, "----", "ls", "----"]
        );
    }

    #[test]
    fn test_anchor_gets_line_above() {
        let output = resolve(&["ifdef::azure[]", "[[intro]]", "Text", "endif::[]"]);
        assert_eq!(
            output,
            vec![r#"[role="platform:azure"]"#, "[[intro]]", "Text"]
        );
    }

    #[test]
    fn test_each_paragraph_gets_a_role() {
        let output = resolve(&["ifdef::aws[]", "One.", "", "Two.", "endif::[]"]);
        assert_eq!(
            output,
            vec![
                r#"[role="platform:aws"]"#,
                "One.",
                "",
                r#"[role="platform:aws"]"#,
                "Two.",
            ]
        );
    }

    #[test]
    fn test_whole_list_gets_one_role() {
        let output = resolve(&[
            "Intro.",
            "",
            "ifdef::azure[]",
            "* One",
            "+",
            "----",
            "code",
            "----",
            "* Two",
            "endif::[]",
            "",
            "After.",
        ]);
        assert_eq!(
            output,
            vec![
                "Intro.",
                "",
                r#"[role="platform:azure"]"#,
                "* One",
                "+",
                "----",
                "code",
                "----",
                "* Two",
                "",
                "After.",
            ]
        );
    }

    #[test]
    fn test_list_item_of_longer_list_is_wrapped() {
        let output = resolve(&[
            "ifdef::azure[]",
            "* Azure item",
            "more text",
            "endif::[]",
            "* Next item",
        ]);
        assert_eq!(
            output,
            vec![
                "* [.platform:azure]#Azure item",
                "more text#",
                "* Next item",
            ]
        );
    }

    #[test]
    fn test_joined_paragraph_gets_its_own_role() {
        let output = resolve(&[
            "ifdef::azure[]",
            "* A",
            "+",
            "Joined para",
            "endif::[]",
            "* B",
        ]);
        assert_eq!(
            output,
            vec![
                "* [.platform:azure]#A#",
                "+",
                r#"[role="platform:azure"]"#,
                "Joined para",
                "* B",
            ]
        );
    }

    #[test]
    fn test_joined_paragraph_shares_title_role() {
        let output = resolve(&[
            "ifdef::azure[]",
            "* A",
            "+",
            ".Title",
            "Joined para",
            "endif::[]",
            "* B",
        ]);
        assert_eq!(
            output,
            vec![
                "* [.platform:azure]#A#",
                "+",
                r#"[role="platform:azure"]"#,
                ".Title",
                "Joined para",
                "* B",
            ]
        );
    }

    #[test]
    fn test_comment_block_is_left_alone() {
        let output = resolve(&["ifdef::azure[]", "////", "note", "////", "Text", "endif::[]"]);
        assert_eq!(
            output,
            vec!["////", "note", "////", r#"[role="platform:azure"]"#, "Text"]
        );
    }

    #[test]
    fn test_nested_inner_directives_stay() {
        let output = resolve(&[
            "ifdef::azure[]",
            "ifdef::aws[]",
            "Text",
            "endif::[]",
            "endif::[]",
        ]);
        assert_eq!(
            output,
            vec![
                "ifdef::aws[]",
                r#"[role="platform:azure"]"#,
                "Text",
                "endif::[]",
            ]
        );
    }

    #[test]
    fn test_rejected_span_is_untouched() {
        let input = ["----", "ifdef::azure[]", "code", "----", "endif::[]"];
        assert_eq!(resolve(&input), input.to_vec());
    }

    #[test]
    fn test_continuation_marker_is_never_wrapped() {
        let input = ["* A", "ifdef::azure[]", "+", "endif::[]", "Joined"];
        assert_eq!(resolve(&input), input.to_vec());
    }
}
