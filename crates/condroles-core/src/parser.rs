//! Structural parser.
//!
//! A single forward pass over the source lines. Each line is classified by its
//! shape together with the stack carried from the previous line; the result is
//! the stack active at the line and the stack carried into the next one.

use condroles_syntax::{
    Operator, is_attribute_definition, is_block_attribute_line, is_block_title, is_continuation,
    is_line_comment, is_section_header, is_verbatim_delimiter, match_conditional,
    match_delimiter, match_list_item,
};
use tracing::debug;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::document::{Document, LineId};
use crate::error::Error;
use crate::state::{
    BlockPhase, BlockPrefix, ConditionalMark, DelimitedBlock, ListItem, ListPhase,
    ParagraphPhase, State, StateStack, StateType,
};

/// Result of parsing: the document and the problems found along the way.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse source lines into a document whose every line carries its stack.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Parsed, Error> {
    let mut parser = Parser::new();
    let mut carried = StateStack::root();
    for line in lines {
        carried = parser.feed(line.as_ref(), carried)?;
    }
    Ok(parser.finish(&carried))
}

/// Line stack and the stack carried to the next line.
type Step = (StateStack, StateStack);

struct Parser {
    document: Document,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new() -> Self {
        Self {
            document: Document::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Parse one raw line and return the stack for the next line.
    fn feed(&mut self, raw: &str, carried: StateStack) -> Result<StateStack, Error> {
        let text = raw.trim_end();
        let id = self
            .document
            .push(text.to_owned(), carried.clone(), carried.clone());

        if carried.top().is_line_local() {
            return Err(Error::CarriedLineLocalState {
                line: id,
                state: carried.top().label(),
            });
        }

        let (stack, next) = self.step(id, text, carried)?;
        let line = self.document.line_mut(id)?;
        line.stack = stack;
        line.stack_after = next.clone();
        Ok(next)
    }

    fn finish(mut self, carried: &StateStack) -> Parsed {
        for block in carried.iter().filter_map(State::as_delimited_block) {
            self.report(
                block.block_start_line,
                DiagnosticKind::UnclosedBlock {
                    delimiter: block.delimiter.clone(),
                },
            );
        }
        Parsed {
            document: self.document,
            diagnostics: self.diagnostics,
        }
    }

    fn report(&mut self, line: LineId, kind: DiagnosticKind) {
        debug!(line = %line, problem = %kind, "unsupported construct");
        self.diagnostics.push(Diagnostic::new(line, kind));
    }

    fn step(&mut self, id: LineId, text: &str, carried: StateStack) -> Result<Step, Error> {
        if let Some(directive) = match_conditional(text) {
            let mark = match directive.operator {
                Operator::Endif => ConditionalMark::End {
                    start_line: self.seal_conditional(id),
                },
                operator if directive.is_single_line() => {
                    ConditionalMark::SingleLine { operator }
                }
                operator => ConditionalMark::Start {
                    operator,
                    expression: directive.expression().to_owned(),
                    end_line: None,
                },
            };
            return Ok((carried.with(State::Conditional(mark)), carried));
        }

        if let Some((below, block)) = carried.close_block(text) {
            self.seal_block(block.block_start_line, id)?;
            let end = DelimitedBlock {
                phase: BlockPhase::End,
                block_end_line: Some(id),
                ..block
            };
            return Ok((below.with(State::DelimitedBlock(end)), below));
        }

        if matches!(
            carried.top(),
            State::DelimitedBlock(DelimitedBlock {
                phase: BlockPhase::Verbatim,
                ..
            })
        ) {
            return Ok((carried.clone(), carried));
        }

        if is_line_comment(text) {
            return Ok((carried.with(State::LineComment), carried));
        }
        if is_attribute_definition(text) {
            return Ok((carried.with(State::AttributeDefinition), carried));
        }

        if let Some(delimiter) = match_delimiter(text) {
            return Ok(open_block(id, delimiter, carried));
        }

        if text.is_empty() {
            return Ok(blank_line(carried));
        }

        if is_continuation(text) {
            match carried.top().as_list_item().map(|item| item.phase) {
                Some(ListPhase::Terminated) | None => {
                    self.report(id, DiagnosticKind::StrayContinuation);
                }
                Some(phase) => {
                    if phase == ListPhase::JoinedFirstLine {
                        self.report(id, DiagnosticKind::DoubleContinuation);
                    }
                    return Ok(joiner(carried));
                }
            }
        }

        let list_phase = carried.top().as_list_item().map(|item| item.phase);

        if is_block_attribute_line(text) {
            let mut next = carried;
            match next.top().kind() {
                StateType::Paragraph => {
                    next.pop();
                }
                _ if list_phase == Some(ListPhase::JoinedNormal) => {
                    set_list_phase(&mut next, ListPhase::JoinedFirstLine);
                }
                _ => {}
            }
            return Ok((next.with(State::BlockPrefix(BlockPrefix::Attributes)), next));
        }

        if let Some(list_line) = match_list_item(text)
            && carried.top().kind() != StateType::Paragraph
        {
            return Ok(list_item(id, list_line.marker, carried));
        }

        if is_block_title(text) {
            let title = State::BlockPrefix(BlockPrefix::Title);
            if carried.top().is_container() {
                return Ok((carried.with(title), carried));
            }
            match list_phase {
                Some(ListPhase::JoinedFirstLine | ListPhase::JoinedNormal) => {
                    let mut next = carried;
                    set_list_phase(&mut next, ListPhase::JoinedFirstLine);
                    return Ok((next.with(title), next));
                }
                Some(ListPhase::Terminated) => {
                    let mut next = carried;
                    next.pop_list_items();
                    return Ok((next.with(title), next));
                }
                _ => {}
            }
        }

        if is_section_header(text) {
            let accepted = match list_phase {
                Some(ListPhase::Terminated | ListPhase::JoinedDelimitedBlock) => {
                    let mut next = carried.clone();
                    next.pop_list_items();
                    Some(next)
                }
                None if carried.top().is_container() => Some(carried.clone()),
                _ => None,
            };
            if let Some(next) = accepted {
                if next.top().kind() == StateType::DelimitedBlock {
                    self.report(id, DiagnosticKind::SectionHeaderInBlock);
                }
                return Ok((next.with(State::SectionHeader), next));
            }
        }

        Ok(content_line(id, carried))
    }

    /// Close the nearest open conditional before `end` and return its line.
    fn seal_conditional(&mut self, end: LineId) -> Option<LineId> {
        let start = self
            .document
            .ids()
            .iter()
            .rev()
            .copied()
            .filter(|&candidate| candidate != end)
            .find(|&candidate| {
                self.document.line(candidate).is_ok_and(|line| {
                    matches!(
                        line.stack.top(),
                        State::Conditional(ConditionalMark::Start { end_line: None, .. })
                    )
                })
            });

        let Some(start) = start else {
            self.report(end, DiagnosticKind::UnmatchedEndif);
            return None;
        };
        if let Ok(line) = self.document.line_mut(start)
            && let State::Conditional(ConditionalMark::Start { end_line, .. }) =
                line.stack.top_mut()
        {
            *end_line = Some(end);
        }
        Some(start)
    }

    /// Record `end` as the closing line of the block opened at `start`.
    fn seal_block(&mut self, start: LineId, end: LineId) -> Result<(), Error> {
        let line = self.document.line_mut(start)?;
        let found = line.stack.top().label();
        match line.stack.top_mut() {
            State::DelimitedBlock(DelimitedBlock {
                phase: BlockPhase::Start,
                block_end_line,
                ..
            }) => {
                if block_end_line.is_some() {
                    return Err(Error::BlockAlreadySealed { line: end, start });
                }
                *block_end_line = Some(end);
                Ok(())
            }
            _ => Err(Error::UnexpectedState {
                line: start,
                expected: "DELIMITED_BLOCK/START",
                found,
            }),
        }
    }
}

fn set_list_phase(stack: &mut StateStack, phase: ListPhase) {
    if let State::ListItem(item) = stack.top_mut() {
        item.phase = phase;
    }
}

fn open_block(id: LineId, delimiter: &str, carried: StateStack) -> Step {
    let mut next = carried;
    if next.top().kind() == StateType::Paragraph {
        next.pop();
    }
    // A block right after a joiner belongs to the item; anywhere else it ends
    // the list.
    if next.top().as_list_item().map(|item| item.phase) == Some(ListPhase::JoinedFirstLine) {
        set_list_phase(&mut next, ListPhase::JoinedDelimitedBlock);
    } else {
        next.pop_list_items();
    }

    let start = DelimitedBlock {
        phase: BlockPhase::Start,
        delimiter: delimiter.to_owned(),
        block_start_line: id,
        block_end_line: None,
    };
    let stack = next.with(State::DelimitedBlock(start.clone()));
    let phase = if is_verbatim_delimiter(delimiter) {
        BlockPhase::Verbatim
    } else {
        BlockPhase::Normal
    };
    next.push(State::DelimitedBlock(DelimitedBlock { phase, ..start }));
    (stack, next)
}

fn blank_line(carried: StateStack) -> Step {
    let mut next = carried;
    match next.top().kind() {
        StateType::Paragraph => {
            next.pop();
        }
        StateType::ListItem => {
            let Some(item) = next.pop().and_then(|state| state.as_list_item().cloned()) else {
                return (next.clone(), next);
            };
            // Ancestor list continuation: the blank joins the enclosing item.
            if item.phase == ListPhase::JoinedFirstLine
                && let Some(ancestor) = next.top().as_list_item().cloned()
            {
                next.pop();
                let stack = next.with(State::ListItem(ListItem {
                    phase: ListPhase::Joiner,
                    ..ancestor.clone()
                }));
                next.push(State::ListItem(ListItem {
                    phase: ListPhase::JoinedFirstLine,
                    ..ancestor
                }));
                return (stack, next);
            }
            next.push(State::ListItem(ListItem {
                phase: ListPhase::Terminated,
                ..item
            }));
        }
        _ => {}
    }
    (next.clone(), next)
}

fn joiner(carried: StateStack) -> Step {
    let mut next = carried;
    let stack = {
        let mut stack = next.clone();
        set_list_phase(&mut stack, ListPhase::Joiner);
        stack
    };
    set_list_phase(&mut next, ListPhase::JoinedFirstLine);
    (stack, next)
}

fn list_item(id: LineId, marker: &str, carried: StateStack) -> Step {
    let (mut next, item) = match carried.split_at_list(marker) {
        Some((base, existing)) => (
            base,
            ListItem {
                phase: ListPhase::FirstLine,
                item_start_line: id,
                joined_start_line: None,
                ..existing
            },
        ),
        None => (
            carried,
            ListItem {
                phase: ListPhase::FirstLine,
                marker: marker.to_owned(),
                list_start_line: id,
                item_start_line: id,
                joined_start_line: None,
            },
        ),
    };
    let stack = next.with(State::ListItem(item.clone()));
    next.push(State::ListItem(ListItem {
        phase: ListPhase::Normal,
        ..item
    }));
    (stack, next)
}

fn content_line(id: LineId, carried: StateStack) -> Step {
    let mut next = carried;
    match next.top().kind() {
        StateType::Paragraph => return (next.clone(), next),
        StateType::ListItem => {
            match next.top().as_list_item().map(|item| item.phase) {
                Some(ListPhase::Terminated | ListPhase::JoinedDelimitedBlock) => {
                    next.pop_list_items();
                }
                Some(ListPhase::JoinedFirstLine) => {
                    if let State::ListItem(item) = next.top_mut() {
                        item.joined_start_line = Some(id);
                    }
                    let stack = next.clone();
                    set_list_phase(&mut next, ListPhase::JoinedNormal);
                    return (stack, next);
                }
                _ => return (next.clone(), next),
            }
        }
        _ => {}
    }

    let stack = next.with(State::Paragraph {
        phase: ParagraphPhase::FirstLine,
        first_line: id,
    });
    next.push(State::Paragraph {
        phase: ParagraphPhase::Normal,
        first_line: id,
    });
    (stack, next)
}
