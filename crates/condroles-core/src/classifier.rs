//! Conditional classifier.
//!
//! Second pass over a parsed document. Every `ifdef`/`ifndef` span is either
//! classified by how it lines up with the document structure or rejected with
//! a [`Diagnostic`]. Rejected spans stay in the output untouched.

use std::collections::BTreeSet;
use std::fmt;

use condroles_syntax::Operator;
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::document::{Document, Line, LineId};
use crate::error::Error;
use crate::state::{BlockPrefix, ConditionalMark, ListPhase, ParagraphPhase, State, StateType};

/// How a conditional span lines up with the document structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Part of one paragraph or list item; rendered inline.
    Partial,
    /// Exactly one list item start with nothing attached.
    SingleListItem,
    /// The start of a list item whose content continues past the span.
    PartStartListItem,
    /// One of several adjacent list item starts sharing a continuation.
    GroupStartListItem,
    /// Whole paragraphs, blocks and lists.
    Blocks,
}

impl SpanKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Partial => "PARTIAL",
            Self::SingleListItem => "SINGLE_LIST_ITEM",
            Self::PartStartListItem => "PART_START_LIST_ITEM",
            Self::GroupStartListItem => "GROUP_START_LIST_ITEM",
            Self::Blocks => "BLOCKS",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified conditional span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub kind: SpanKind,
    /// Opening directive line.
    pub start: LineId,
    /// Closing `endif` line.
    pub end: LineId,
    /// Values the content belongs to, after `ifndef` inversion.
    pub values: BTreeSet<String>,
}

/// Classified conditionals in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalMap {
    conditionals: Vec<Conditional>,
}

impl ConditionalMap {
    #[must_use]
    pub fn as_slice(&self) -> &[Conditional] {
        &self.conditionals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conditional> {
        self.conditionals.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    /// One line per conditional: `KIND: lines A-B, values: x, y`.
    #[must_use]
    pub fn pretty(&self) -> String {
        if self.conditionals.is_empty() {
            return "No conditionals found".to_owned();
        }
        self.conditionals
            .iter()
            .map(|c| {
                let values: Vec<&str> = c.values.iter().map(String::as_str).collect();
                format!(
                    "{}: lines {}-{}, values: {}",
                    c.kind,
                    c.start,
                    c.end,
                    values.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Classification result with the rejected spans reported.
#[derive(Debug, Clone)]
pub struct Classified {
    pub map: ConditionalMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify every conditional span of `document`.
///
/// `values` is the universe of recognized value tokens; `ifndef` spans are
/// resolved against it.
pub fn classify(document: &Document, values: &BTreeSet<String>) -> Result<Classified, Error> {
    let mut classifier = Classifier {
        document,
        values,
        conditionals: Vec::new(),
        diagnostics: Vec::new(),
    };

    let mut index = 0;
    while let Some(id) = document.id_at(index) {
        index = match classifier.examine(id)? {
            Advance::Next => index + 1,
            Advance::PastEnd(end) => document.position(end)? + 1,
        };
    }

    Ok(Classified {
        map: ConditionalMap {
            conditionals: classifier.conditionals,
        },
        diagnostics: classifier.diagnostics,
    })
}

/// Where the scan continues after a line.
enum Advance {
    Next,
    PastEnd(LineId),
}

struct Classifier<'a> {
    document: &'a Document,
    values: &'a BTreeSet<String>,
    conditionals: Vec<Conditional>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Classifier<'a> {
    fn reject(&mut self, line: LineId, kind: DiagnosticKind) -> Advance {
        debug!(line = %line, problem = %kind, "conditional rejected");
        self.diagnostics.push(Diagnostic::new(line, kind));
        Advance::Next
    }

    fn examine(&mut self, id: LineId) -> Result<Advance, Error> {
        let doc = self.document;
        let start = doc.line(id)?;
        let (operator, expression, end) = match start.stack.top() {
            State::Conditional(ConditionalMark::Start {
                operator,
                expression,
                end_line,
            }) => (*operator, expression.as_str(), *end_line),
            State::Conditional(ConditionalMark::SingleLine { .. }) => {
                return Ok(self.reject(id, DiagnosticKind::SingleLineConditional));
            }
            // Closers of accepted spans are skipped over, and unmatched ones were
            // reported while parsing.
            _ => return Ok(Advance::Next),
        };

        let Some(end) = end else {
            return Ok(self.reject(id, DiagnosticKind::MissingEndif));
        };
        let values = match self.resolve_values(operator, expression) {
            Ok(values) => values,
            Err(kind) => return Ok(self.reject(id, kind)),
        };

        let end_line = doc.line(end)?;
        if start.stack.until_container() != end_line.stack.until_container() {
            return Ok(self.reject(id, DiagnosticKind::CrossesBlockBoundary));
        }
        if start.stack.is_in_verbatim_block() {
            return Ok(self.reject(id, DiagnosticKind::InsideVerbatim));
        }

        let Some(first) = doc.next_line(id)? else {
            return Ok(Advance::Next);
        };
        match doc.previous_line(id)?.map(|prev| prev.stack.top()) {
            Some(State::BlockPrefix(BlockPrefix::Attributes)) => {
                return Ok(self.reject(id, DiagnosticKind::FollowsBlockAttributes));
            }
            Some(State::BlockPrefix(BlockPrefix::Title))
                if first.stack.top().kind() == StateType::DelimitedBlock =>
            {
                return Ok(self.reject(id, DiagnosticKind::DetachesBlockTitle));
            }
            _ => {}
        }

        if first.id() == end {
            self.reject(id, DiagnosticKind::EmptyConditional);
            return Ok(Advance::PastEnd(end));
        }
        let last = doc.previous_line(end)?.ok_or(Error::LineNotFound(end))?;
        let Some(last_text) = self.last_non_blank(first.id(), last.id())? else {
            self.reject(id, DiagnosticKind::BlankConditional);
            return Ok(Advance::PastEnd(end));
        };

        let after = doc.next_significant(end)?;
        let kind = match self.span_kind(id, first, last, last_text, after)? {
            Ok(kind) => kind,
            Err(problem) => return Ok(self.reject(id, problem)),
        };

        debug!(line = %id, end = %end, kind = %kind, "conditional classified");
        self.conditionals.push(Conditional {
            kind,
            start: id,
            end,
            values,
        });
        self.report_nested(id, first.id(), last.id())?;
        Ok(Advance::PastEnd(end))
    }

    /// Value set a span belongs to, or the reason it cannot be resolved.
    fn resolve_values(
        &self,
        operator: Operator,
        expression: &str,
    ) -> Result<BTreeSet<String>, DiagnosticKind> {
        if operator == Operator::Ifeval {
            return Err(DiagnosticKind::Ifeval);
        }
        if expression.contains('+') {
            return Err(DiagnosticKind::UnionExpression {
                expression: expression.to_owned(),
            });
        }

        let tokens: BTreeSet<String> = expression
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .collect();
        if tokens.is_empty() {
            return Err(DiagnosticKind::MissingExpression);
        }
        if let Some(unknown) = tokens.iter().find(|token| !self.values.contains(*token)) {
            return Err(DiagnosticKind::UnknownValue {
                value: unknown.clone(),
            });
        }

        if operator != Operator::Ifndef {
            return Ok(tokens);
        }
        let remaining: BTreeSet<String> = self.values.difference(&tokens).cloned().collect();
        if remaining.is_empty() {
            return Err(DiagnosticKind::NoRemainingValues {
                expression: expression.to_owned(),
            });
        }
        Ok(remaining)
    }

    fn last_non_blank(&self, first: LineId, last: LineId) -> Result<Option<&'a Line>, Error> {
        let doc = self.document;
        for &id in doc.range(first, last)?.iter().rev() {
            let line = doc.line(id)?;
            if !line.is_blank() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    /// Decide the span kind from its first and last lines and the first
    /// significant line after it.
    fn span_kind(
        &mut self,
        start: LineId,
        first: &Line,
        last: &Line,
        last_text: &Line,
        after: Option<&Line>,
    ) -> Result<Result<SpanKind, DiagnosticKind>, Error> {
        let first_top = first.stack.top();
        if !first.is_blank()
            && matches!(first_top, State::ListItem(item) if item.phase == ListPhase::Joiner)
        {
            return Ok(Err(DiagnosticKind::StartsAtContinuation));
        }

        // Starts inside a paragraph or list item.
        let mid_block = match first_top {
            State::Paragraph { phase, .. } => *phase == ParagraphPhase::Normal,
            State::ListItem(item) => !matches!(
                item.phase,
                ListPhase::FirstLine | ListPhase::Terminated | ListPhase::JoinedDelimitedBlock
            ),
            _ => false,
        };
        if mid_block {
            return Ok(if first.stack == last_text.stack {
                Ok(SpanKind::Partial)
            } else {
                Err(DiagnosticKind::SpansSeveralItems)
            });
        }

        // Exactly the first line of a list item.
        if let State::ListItem(item) = first_top
            && item.phase == ListPhase::FirstLine
            && last.stack.top() == first_top
        {
            let continues = after
                .and_then(|line| line.stack.owning_list_item())
                .is_some_and(|next| next.item_start_line == item.item_start_line);
            let kind = if !continues {
                SpanKind::SingleListItem
            } else if self.retag_group(start)? {
                SpanKind::GroupStartListItem
            } else {
                SpanKind::PartStartListItem
            };
            return Ok(Ok(kind));
        }

        let breaks = match (last.stack.top(), after) {
            (State::Paragraph { .. }, Some(next)) => matches!(
                next.stack.top(),
                State::Paragraph {
                    phase: ParagraphPhase::Normal,
                    ..
                }
            ),
            (State::ListItem(last_item), Some(next)) => next
                .stack
                .owning_list_item()
                .is_some_and(|item| item.item_start_line == last_item.item_start_line),
            _ => false,
        };
        if !breaks {
            return Ok(Ok(SpanKind::Blocks));
        }

        // The span opens a paragraph and ends inside that same paragraph.
        if let (
            State::Paragraph {
                first_line: opened, ..
            },
            State::Paragraph { first_line, .. },
        ) = (first_top, last.stack.top())
            && opened == first_line
        {
            return Ok(Ok(SpanKind::Partial));
        }
        Ok(Err(DiagnosticKind::BreaksBoundary))
    }

    /// Retag the chain of single list item spans ending right before `start`
    /// as a group. Returns whether there was such a chain.
    fn retag_group(&mut self, start: LineId) -> Result<bool, Error> {
        let doc = self.document;
        let mut expected_end = doc.previous_line(start)?.map(Line::id);
        let mut grouped = false;
        for conditional in self.conditionals.iter_mut().rev() {
            if Some(conditional.end) != expected_end
                || conditional.kind != SpanKind::SingleListItem
            {
                break;
            }
            conditional.kind = SpanKind::GroupStartListItem;
            grouped = true;
            expected_end = doc.previous_line(conditional.start)?.map(Line::id);
        }
        Ok(grouped)
    }

    /// Warn about conditionals and section headers inside an accepted span.
    fn report_nested(&mut self, outer: LineId, first: LineId, last: LineId) -> Result<(), Error> {
        let doc = self.document;
        for &id in doc.range(first, last)? {
            let kind = match doc.line(id)?.stack.top() {
                State::Conditional(ConditionalMark::End { .. }) => continue,
                State::Conditional(_) => DiagnosticKind::Nested { outer },
                State::SectionHeader => {
                    DiagnosticKind::ConditionedSectionHeader { conditional: outer }
                }
                _ => continue,
            };
            self.reject(id, kind);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse;

    fn values(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|t| (*t).to_owned()).collect()
    }

    fn classified(lines: &[&str]) -> Classified {
        let parsed = parse(lines).unwrap();
        classify(&parsed.document, &values(&["azure", "aws", "gcp"])).unwrap()
    }

    fn kinds(result: &Classified) -> Vec<(SpanKind, usize, usize)> {
        result
            .map
            .iter()
            .map(|c| (c.kind, c.start.get(), c.end.get()))
            .collect()
    }

    fn problems(result: &Classified) -> Vec<(usize, DiagnosticKind)> {
        result
            .diagnostics
            .iter()
            .map(|d| (d.line.get(), d.kind.clone()))
            .collect()
    }

    #[test]
    fn test_whole_paragraph_is_blocks() {
        let result = classified(&[
            "Some intro text.",
            "",
            "ifdef::azure[]",
            "This is conditional content.",
            "endif::[]",
            "",
            "More text after.",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Blocks, 3, 5)]);
        assert_eq!(result.map.as_slice()[0].values, values(&["azure"]));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_mid_paragraph_is_partial() {
        let result = classified(&[
            "This is a paragraph with",
            "ifdef::azure[]",
            "some conditional text",
            "endif::[]",
            "in the middle.",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Partial, 2, 4)]);
    }

    #[test]
    fn test_paragraph_start_is_partial() {
        let result = classified(&[
            "ifdef::azure[]",
            "Starts the paragraph",
            "endif::[]",
            "and continues.",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Partial, 1, 3)]);
    }

    #[test]
    fn test_mid_paragraph_into_next_paragraph_is_rejected() {
        let result = classified(&[
            "First paragraph",
            "ifdef::azure[]",
            "end of first",
            "",
            "second",
            "endif::[]",
        ]);
        assert!(result.map.is_empty());
        assert_eq!(problems(&result), vec![(2, DiagnosticKind::SpansSeveralItems)]);
    }

    #[test]
    fn test_end_inside_next_paragraph_is_rejected() {
        let result = classified(&[
            "ifdef::azure[]",
            "Whole paragraph.",
            "",
            "Next starts",
            "endif::[]",
            "and continues.",
        ]);
        assert_eq!(problems(&result), vec![(1, DiagnosticKind::BreaksBoundary)]);
    }

    #[test]
    fn test_ifndef_inverts_values() {
        let result = classified(&["ifndef::azure[]", "Text", "endif::[]"]);
        assert_eq!(result.map.as_slice()[0].values, values(&["aws", "gcp"]));
    }

    #[test]
    fn test_comma_list() {
        let result = classified(&["ifdef::azure, aws[]", "Text", "endif::[]"]);
        assert_eq!(result.map.as_slice()[0].values, values(&["aws", "azure"]));
    }

    #[test]
    fn test_expression_rejections() {
        let result = classified(&[
            "ifdef::azure+aws[]",
            "a",
            "endif::[]",
            "",
            "ifdef::openstack[]",
            "b",
            "endif::[]",
            "",
            r#"ifeval::["{x}" == "y"]"#,
            "c",
            "endif::[]",
            "",
            "ifndef::azure,aws,gcp[]",
            "d",
            "endif::[]",
            "",
            "ifdef::azure[inline]",
        ]);
        assert!(result.map.is_empty());
        assert_eq!(
            problems(&result),
            vec![
                (
                    1,
                    DiagnosticKind::UnionExpression {
                        expression: "azure+aws".to_owned()
                    }
                ),
                (
                    5,
                    DiagnosticKind::UnknownValue {
                        value: "openstack".to_owned()
                    }
                ),
                (9, DiagnosticKind::Ifeval),
                (
                    13,
                    DiagnosticKind::NoRemainingValues {
                        expression: "azure,aws,gcp".to_owned()
                    }
                ),
                (17, DiagnosticKind::SingleLineConditional),
            ]
        );
    }

    #[test]
    fn test_missing_endif() {
        let result = classified(&["ifdef::azure[]", "Text"]);
        assert_eq!(problems(&result), vec![(1, DiagnosticKind::MissingEndif)]);
    }

    #[test]
    fn test_nested_conditional_inner_is_reported() {
        let result = classified(&[
            "ifdef::azure[]",
            "ifdef::aws[]",
            "Text",
            "endif::[]",
            "endif::[]",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Blocks, 1, 5)]);
        assert_eq!(
            problems(&result),
            vec![(
                2,
                DiagnosticKind::Nested {
                    outer: LineId::new(1)
                }
            )]
        );
    }

    #[test]
    fn test_rejected_outer_leaves_inner_eligible() {
        let result = classified(&[
            "ifdef::openstack[]",
            "",
            "ifdef::aws[]",
            "Text",
            "endif::[]",
            "",
            "endif::[]",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Blocks, 3, 5)]);
        assert_eq!(
            problems(&result),
            vec![(
                1,
                DiagnosticKind::UnknownValue {
                    value: "openstack".to_owned()
                }
            )]
        );
    }

    #[test]
    fn test_crossing_block_boundary_is_rejected() {
        let result = classified(&[
            "----",
            "ifdef::azure[]",
            "code",
            "----",
            "endif::[]",
        ]);
        assert!(result.map.is_empty());
        assert_eq!(
            problems(&result),
            vec![(2, DiagnosticKind::CrossesBlockBoundary)]
        );
    }

    #[test]
    fn test_inside_verbatim_is_rejected() {
        let result = classified(&["----", "ifdef::azure[]", "code", "endif::[]", "----"]);
        assert_eq!(problems(&result), vec![(2, DiagnosticKind::InsideVerbatim)]);
    }

    #[test]
    fn test_block_prefix_adjacency() {
        let result = classified(&[
            "[NOTE]",
            "ifdef::azure[]",
            "Text",
            "endif::[]",
            "",
            ".Title",
            "ifdef::aws[]",
            "----",
            "code",
            "----",
            "endif::[]",
        ]);
        assert_eq!(
            problems(&result),
            vec![
                (2, DiagnosticKind::FollowsBlockAttributes),
                (7, DiagnosticKind::DetachesBlockTitle),
            ]
        );
    }

    #[test]
    fn test_empty_and_blank_spans() {
        let result = classified(&["ifdef::azure[]", "endif::[]", "ifdef::aws[]", "", "endif::[]"]);
        assert!(result.map.is_empty());
        assert_eq!(
            problems(&result),
            vec![
                (1, DiagnosticKind::EmptyConditional),
                (3, DiagnosticKind::BlankConditional),
            ]
        );
    }

    #[test]
    fn test_single_list_item() {
        let result = classified(&[
            "* Common",
            "ifdef::azure[]",
            "* Azure only",
            "endif::[]",
            "* Common again",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::SingleListItem, 2, 4)]);
    }

    #[test]
    fn test_part_start_list_item() {
        let result = classified(&[
            "ifdef::azure[]",
            "* Azure item",
            "endif::[]",
            "shared continuation",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::PartStartListItem, 1, 3)]);
    }

    #[test]
    fn test_group_start_list_items() {
        let result = classified(&[
            "ifdef::azure[]",
            "* Azure item",
            "endif::[]",
            "ifdef::aws[]",
            "* AWS item",
            "endif::[]",
            "ifdef::gcp[]",
            "* GCP item",
            "endif::[]",
            "shared continuation",
        ]);
        assert_eq!(
            kinds(&result),
            vec![
                (SpanKind::GroupStartListItem, 1, 3),
                (SpanKind::GroupStartListItem, 4, 6),
                (SpanKind::GroupStartListItem, 7, 9),
            ]
        );
    }

    #[test]
    fn test_blank_line_breaks_group() {
        let result = classified(&[
            "ifdef::azure[]",
            "* Azure item",
            "endif::[]",
            "",
            "ifdef::aws[]",
            "* AWS item",
            "endif::[]",
            "shared continuation",
        ]);
        assert_eq!(
            kinds(&result),
            vec![
                (SpanKind::SingleListItem, 1, 3),
                (SpanKind::PartStartListItem, 5, 7),
            ]
        );
    }

    #[test]
    fn test_whole_list_item_with_text_is_blocks() {
        let result = classified(&[
            "ifdef::azure[]",
            "* Azure item",
            "more text",
            "endif::[]",
            "* Next item",
        ]);
        assert_eq!(kinds(&result), vec![(SpanKind::Blocks, 1, 4)]);
    }

    #[test]
    fn test_list_item_cut_mid_way_is_rejected() {
        let result = classified(&[
            "ifdef::azure[]",
            "* Azure item",
            "more text",
            "endif::[]",
            "still the same item",
        ]);
        assert_eq!(problems(&result), vec![(1, DiagnosticKind::BreaksBoundary)]);
    }

    #[test]
    fn test_span_opening_on_continuation_is_rejected() {
        for lines in [
            &["* A", "ifdef::azure[]", "+", "endif::[]", "Joined"][..],
            &["* A", "ifdef::azure[]", "+", "Joined", "endif::[]"][..],
        ] {
            let result = classified(lines);
            assert!(result.map.is_empty());
            assert_eq!(
                problems(&result),
                vec![(2, DiagnosticKind::StartsAtContinuation)]
            );
        }
    }

    #[test]
    fn test_conditioned_section_header_is_reported() {
        let result = classified(&["ifdef::azure[]", "== Azure", "", "Text", "endif::[]"]);
        assert_eq!(kinds(&result), vec![(SpanKind::Blocks, 1, 5)]);
        assert_eq!(
            problems(&result),
            vec![(
                2,
                DiagnosticKind::ConditionedSectionHeader {
                    conditional: LineId::new(1)
                }
            )]
        );
    }

    #[test]
    fn test_pretty() {
        let result = classified(&["ifndef::gcp[]", "Text", "endif::[]"]);
        assert_eq!(result.map.pretty(), "BLOCKS: lines 1-3, values: aws, azure");
        assert_eq!(ConditionalMap::default().pretty(), "No conditionals found");
    }
}
