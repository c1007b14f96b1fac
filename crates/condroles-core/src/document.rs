//! Line and document store.
//!
//! Lines live in an arena keyed by a stable [`LineId`]; traversal order is a
//! separate list of ids. Inserting or removing a line only touches the order
//! and the position index, so ids captured during parsing stay valid for the
//! whole pipeline.

use std::collections::HashMap;
use std::fmt;

use crate::error::Error;
use crate::state::{StateStack, StateType};

/// First id handed out to lines created after parsing.
const FIRST_INSERTED_ID: usize = 10_000;

/// Stable identity of a line. Original lines are numbered from 1 in reading
/// order, so the id of an original line is also its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(usize);

impl LineId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single line with the parse context active at it and carried past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    id: LineId,
    /// Right-trimmed text.
    pub content: String,
    /// Context active at this line.
    pub stack: StateStack,
    /// Context carried into the next line.
    pub stack_after: StateStack,
}

impl Line {
    #[must_use]
    pub fn new(id: LineId, content: String, stack: StateStack, stack_after: StateStack) -> Self {
        Self {
            id,
            content,
            stack,
            stack_after,
        }
    }

    #[must_use]
    pub fn id(&self) -> LineId {
        self.id
    }

    /// Whether the line holds only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Blank, or a directive, comment or attribute definition: lines that do
    /// not decide where content starts or ends.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        self.is_blank()
            || matches!(
                self.stack.top().kind(),
                StateType::Conditional | StateType::LineComment | StateType::AttributeDefinition
            )
    }
}

/// Ordered, mutable collection of lines.
#[derive(Debug, Clone)]
pub struct Document {
    lines: HashMap<LineId, Line>,
    order: Vec<LineId>,
    /// Reading-order index of every id in `order`.
    index: HashMap<LineId, usize>,
    next_original: usize,
    next_inserted: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: HashMap::new(),
            order: Vec::new(),
            index: HashMap::new(),
            next_original: 1,
            next_inserted: FIRST_INSERTED_ID,
        }
    }

    /// Append a line read from the source and return its id.
    pub fn push(&mut self, content: String, stack: StateStack, stack_after: StateStack) -> LineId {
        let id = LineId(self.next_original);
        self.next_original += 1;
        self.lines
            .insert(id, Line::new(id, content, stack, stack_after));
        self.index.insert(id, self.order.len());
        self.order.push(id);
        id
    }

    /// Insert a new line directly before `before` and return its id.
    pub fn insert_before(
        &mut self,
        before: LineId,
        content: String,
        stack: StateStack,
    ) -> Result<LineId, Error> {
        let index = self.position(before)?;
        let id = LineId(self.next_inserted);
        self.next_inserted += 1;
        self.lines
            .insert(id, Line::new(id, content, stack.clone(), stack));
        self.order.insert(index, id);
        self.reindex_from(index);
        Ok(id)
    }

    /// Remove a line from the document.
    pub fn remove(&mut self, id: LineId) -> Result<Line, Error> {
        let index = self.position(id)?;
        self.order.remove(index);
        self.index.remove(&id);
        self.reindex_from(index);
        self.lines.remove(&id).ok_or(Error::LineNotFound(id))
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, id) in self.order[start..].iter().enumerate() {
            self.index.insert(*id, start + offset);
        }
    }

    /// Number of lines currently in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn line(&self, id: LineId) -> Result<&Line, Error> {
        self.lines.get(&id).ok_or(Error::LineNotFound(id))
    }

    pub fn line_mut(&mut self, id: LineId) -> Result<&mut Line, Error> {
        self.lines.get_mut(&id).ok_or(Error::LineNotFound(id))
    }

    /// Index of `id` in reading order.
    pub fn position(&self, id: LineId) -> Result<usize, Error> {
        self.index.get(&id).copied().ok_or(Error::LineNotFound(id))
    }

    /// Id at reading-order index `index`.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<LineId> {
        self.order.get(index).copied()
    }

    /// Line following `id`, if any.
    pub fn next_line(&self, id: LineId) -> Result<Option<&Line>, Error> {
        let index = self.position(id)?;
        Ok(self.order.get(index + 1).and_then(|next| self.lines.get(next)))
    }

    /// Line preceding `id`, if any.
    pub fn previous_line(&self, id: LineId) -> Result<Option<&Line>, Error> {
        let index = self.position(id)?;
        Ok(index
            .checked_sub(1)
            .and_then(|prev| self.order.get(prev))
            .and_then(|prev| self.lines.get(prev)))
    }

    /// First line after `id` that carries content: blank lines, conditional
    /// directives, comments and attribute definitions are skipped.
    pub fn next_significant(&self, id: LineId) -> Result<Option<&Line>, Error> {
        let index = self.position(id)?;
        Ok(self.order[index + 1..]
            .iter()
            .filter_map(|next| self.lines.get(next))
            .find(|line| !line.is_skippable()))
    }

    /// Ids in reading order.
    #[must_use]
    pub fn ids(&self) -> &[LineId] {
        &self.order
    }

    /// Lines in reading order.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.order.iter().filter_map(|id| self.lines.get(id))
    }

    /// Ids from `start` to `end` inclusive, in reading order.
    pub fn range(&self, start: LineId, end: LineId) -> Result<&[LineId], Error> {
        let from = self.position(start)?;
        let to = self.position(end)?;
        Ok(if from <= to {
            &self.order[from..=to]
        } else {
            &[]
        })
    }

    /// Line texts in reading order.
    #[must_use]
    pub fn contents(&self) -> Vec<String> {
        self.iter().map(|line| line.content.clone()).collect()
    }

    /// Debug rendering: every line with its stack and, when it differs, the
    /// stack carried into the next line.
    #[must_use]
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        for line in self.iter() {
            out.push_str(&format!("{:>5}: {}\n", line.id, line.content));
            out.push_str(&line.stack.pretty(7));
            out.push('\n');
            if line.stack_after != line.stack {
                out.push_str("       -> next:\n");
                out.push_str(&line.stack_after.pretty(9));
                out.push('\n');
            }
        }
        out
    }
}
