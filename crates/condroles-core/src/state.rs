//! Contextual parse states and the per-line state stack.
//!
//! Every line of a parsed document carries a [`StateStack`] describing where it
//! sits in the implicit document structure: at the root, inside a paragraph,
//! inside a list item nested in a delimited block, and so on. Each [`State`]
//! variant carries only the fields meaningful for its kind, so an illegal
//! combination of kind, phase and fields cannot be constructed.

use std::fmt;

use condroles_syntax::Operator;

use crate::document::LineId;

/// Kind of a parse state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    Root,
    Paragraph,
    ListItem,
    DelimitedBlock,
    Conditional,
    BlockPrefix,
    SectionHeader,
    LineComment,
    AttributeDefinition,
}

impl StateType {
    /// Upper-case name used in debug renderings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Paragraph => "PARAGRAPH",
            Self::ListItem => "LIST_ITEM",
            Self::DelimitedBlock => "DELIMITED_BLOCK",
            Self::Conditional => "CONDITIONAL",
            Self::BlockPrefix => "BLOCK_PREFIX",
            Self::SectionHeader => "SECTION_HEADER",
            Self::LineComment => "LINE_COMMENT",
            Self::AttributeDefinition => "ATTRIBUTE_DEFINITION",
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement of a [`StateType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSubtype {
    Normal,
    FirstLine,
    Start,
    End,
    SingleLine,
    Verbatim,
    Joiner,
    JoinedFirstLine,
    JoinedNormal,
    Terminated,
    JoinedDelimitedBlock,
    BlockTitle,
    BlockAttributes,
}

impl StateSubtype {
    /// Upper-case name used in debug renderings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::FirstLine => "FIRST_LINE",
            Self::Start => "START",
            Self::End => "END",
            Self::SingleLine => "SINGLE_LINE",
            Self::Verbatim => "VERBATIM",
            Self::Joiner => "JOINER",
            Self::JoinedFirstLine => "JOINED_FIRST_LINE",
            Self::JoinedNormal => "JOINED_NORMAL",
            Self::Terminated => "TERMINATED",
            Self::JoinedDelimitedBlock => "JOINED_DELIMITED_BLOCK",
            Self::BlockTitle => "BLOCK_TITLE",
            Self::BlockAttributes => "BLOCK_ATTRIBUTES",
        }
    }
}

impl fmt::Display for StateSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a line within a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphPhase {
    FirstLine,
    Normal,
}

/// Position of a line within a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// The marker line of the item.
    FirstLine,
    /// Plain continuation text of the item.
    Normal,
    /// A `+` line, or a blank line reinterpreted as ancestor list continuation.
    Joiner,
    /// First line attached through a joiner.
    JoinedFirstLine,
    /// Following lines of an attached paragraph.
    JoinedNormal,
    /// A blank line ended the item; the list itself may still continue.
    Terminated,
    /// A delimited block was attached; the item stays open for another joiner.
    JoinedDelimitedBlock,
}

/// Role of a delimited block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPhase {
    /// The opening delimiter line.
    Start,
    /// The closing delimiter line.
    End,
    /// Content of a verbatim block.
    Verbatim,
    /// Content of a compound block.
    Normal,
}

/// An open list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub phase: ListPhase,
    /// Marker string shared by all items of the list (`*`, `..`, ...).
    pub marker: String,
    /// Line of the first item of the list.
    pub list_start_line: LineId,
    /// Line of the marker of the current item.
    pub item_start_line: LineId,
    /// First line of the most recent attached paragraph.
    pub joined_start_line: Option<LineId>,
}

/// An open or closing delimited block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedBlock {
    pub phase: BlockPhase,
    /// Exact delimiter text that opened the block.
    pub delimiter: String,
    pub block_start_line: LineId,
    /// Closing line; recorded once on the START state when the block closes.
    pub block_end_line: Option<LineId>,
}

/// A conditional directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalMark {
    /// `ifdef`/`ifndef`/`ifeval` opening a span.
    Start {
        operator: Operator,
        expression: String,
        /// Matching `endif`; `None` until it is found.
        end_line: Option<LineId>,
    },
    /// `endif`; `start_line` is `None` when no opening directive matched.
    End { start_line: Option<LineId> },
    /// `ifdef::attr[content]` carrying its content inline.
    SingleLine { operator: Operator },
}

/// Block metadata line preceding a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPrefix {
    Title,
    Attributes,
}

/// A single parse context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Root,
    Paragraph {
        phase: ParagraphPhase,
        first_line: LineId,
    },
    ListItem(ListItem),
    DelimitedBlock(DelimitedBlock),
    Conditional(ConditionalMark),
    BlockPrefix(BlockPrefix),
    SectionHeader,
    LineComment,
    AttributeDefinition,
}

impl State {
    /// Kind of this state.
    #[must_use]
    pub fn kind(&self) -> StateType {
        match self {
            Self::Root => StateType::Root,
            Self::Paragraph { .. } => StateType::Paragraph,
            Self::ListItem(_) => StateType::ListItem,
            Self::DelimitedBlock(_) => StateType::DelimitedBlock,
            Self::Conditional(_) => StateType::Conditional,
            Self::BlockPrefix(_) => StateType::BlockPrefix,
            Self::SectionHeader => StateType::SectionHeader,
            Self::LineComment => StateType::LineComment,
            Self::AttributeDefinition => StateType::AttributeDefinition,
        }
    }

    /// Subtype of this state.
    #[must_use]
    pub fn subtype(&self) -> StateSubtype {
        match self {
            Self::Root
            | Self::SectionHeader
            | Self::LineComment
            | Self::AttributeDefinition => StateSubtype::Normal,
            Self::Paragraph { phase, .. } => match phase {
                ParagraphPhase::FirstLine => StateSubtype::FirstLine,
                ParagraphPhase::Normal => StateSubtype::Normal,
            },
            Self::ListItem(item) => match item.phase {
                ListPhase::FirstLine => StateSubtype::FirstLine,
                ListPhase::Normal => StateSubtype::Normal,
                ListPhase::Joiner => StateSubtype::Joiner,
                ListPhase::JoinedFirstLine => StateSubtype::JoinedFirstLine,
                ListPhase::JoinedNormal => StateSubtype::JoinedNormal,
                ListPhase::Terminated => StateSubtype::Terminated,
                ListPhase::JoinedDelimitedBlock => StateSubtype::JoinedDelimitedBlock,
            },
            Self::DelimitedBlock(block) => match block.phase {
                BlockPhase::Start => StateSubtype::Start,
                BlockPhase::End => StateSubtype::End,
                BlockPhase::Verbatim => StateSubtype::Verbatim,
                BlockPhase::Normal => StateSubtype::Normal,
            },
            Self::Conditional(mark) => match mark {
                ConditionalMark::Start { .. } => StateSubtype::Start,
                ConditionalMark::End { .. } => StateSubtype::End,
                ConditionalMark::SingleLine { .. } => StateSubtype::SingleLine,
            },
            Self::BlockPrefix(prefix) => match prefix {
                BlockPrefix::Title => StateSubtype::BlockTitle,
                BlockPrefix::Attributes => StateSubtype::BlockAttributes,
            },
        }
    }

    /// List item fields, if this is a list item.
    #[must_use]
    pub fn as_list_item(&self) -> Option<&ListItem> {
        match self {
            Self::ListItem(item) => Some(item),
            _ => None,
        }
    }

    /// Delimited block fields, if this is a delimited block.
    #[must_use]
    pub fn as_delimited_block(&self) -> Option<&DelimitedBlock> {
        match self {
            Self::DelimitedBlock(block) => Some(block),
            _ => None,
        }
    }

    /// Root or delimited block: the contexts that bound structural searches.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Root | Self::DelimitedBlock(_))
    }

    /// States that describe one line only and must never reach the next one.
    #[must_use]
    pub fn is_line_local(&self) -> bool {
        match self {
            Self::Conditional(_) | Self::BlockPrefix(_) | Self::SectionHeader => true,
            Self::ListItem(item) => item.phase == ListPhase::Joiner,
            _ => false,
        }
    }

    /// `TYPE/SUBTYPE`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.kind(), self.subtype())
    }

    /// Named fields as `key=value` pairs, for debug renderings.
    fn fields(&self) -> Vec<(&'static str, String)> {
        let id = |line: &LineId| line.to_string();
        let opt = |line: &Option<LineId>| line.map_or_else(|| "-1".to_owned(), |l| l.to_string());
        match self {
            Self::Paragraph { first_line, .. } => vec![("first_line", id(first_line))],
            Self::ListItem(item) => {
                let mut fields = vec![
                    ("marker", item.marker.clone()),
                    ("list_start_line", id(&item.list_start_line)),
                    ("item_start_line", id(&item.item_start_line)),
                ];
                if let Some(joined) = &item.joined_start_line {
                    fields.push(("joined_start_line", id(joined)));
                }
                fields
            }
            Self::DelimitedBlock(block) => {
                let mut fields = vec![
                    ("delimiter", block.delimiter.clone()),
                    ("block_start_line", id(&block.block_start_line)),
                ];
                if let Some(end) = &block.block_end_line {
                    fields.push(("block_end_line", id(end)));
                }
                fields
            }
            Self::Conditional(ConditionalMark::Start {
                operator,
                expression,
                end_line,
            }) => vec![
                ("operator", operator.to_string()),
                ("expression", expression.clone()),
                ("end_line", opt(end_line)),
            ],
            Self::Conditional(ConditionalMark::End { start_line }) => match start_line {
                Some(start) => vec![("start_line", id(start))],
                None => Vec::new(),
            },
            Self::Conditional(ConditionalMark::SingleLine { operator }) => {
                vec![("operator", operator.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;
        let fields = self.fields();
        if !fields.is_empty() {
            let rendered: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " {{{}}}", rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Ordered stack of states, bottom = outermost context.
///
/// The bottom ROOT state can never be popped, so a stack is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStack {
    states: Vec<State>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::root()
    }
}

impl StateStack {
    /// A stack holding only the ROOT state.
    #[must_use]
    pub fn root() -> Self {
        Self {
            states: vec![State::Root],
        }
    }

    /// The current (innermost) state.
    #[must_use]
    pub fn top(&self) -> &State {
        // Index 0 always holds ROOT.
        &self.states[self.states.len() - 1]
    }

    /// Mutable access to the innermost state.
    pub fn top_mut(&mut self) -> &mut State {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    /// Push a state on top.
    pub fn push(&mut self, state: State) {
        self.states.push(state);
    }

    /// Pop the innermost state; the ROOT bottom is never removed.
    pub fn pop(&mut self) -> Option<State> {
        if self.states.len() > 1 {
            self.states.pop()
        } else {
            None
        }
    }

    /// Number of states including ROOT.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// States from bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &State> {
        self.states.iter()
    }

    /// Copy of this stack with `state` pushed on top.
    #[must_use]
    pub fn with(&self, state: State) -> Self {
        let mut stack = self.clone();
        stack.push(state);
        stack
    }

    /// If `text` closes the innermost delimited block, return the stack below
    /// that block together with the block.
    #[must_use]
    pub fn close_block(&self, text: &str) -> Option<(Self, DelimitedBlock)> {
        let index = self
            .states
            .iter()
            .rposition(|state| matches!(state, State::DelimitedBlock(_)))?;
        match &self.states[index] {
            State::DelimitedBlock(block) if block.delimiter == text => Some((
                Self {
                    states: self.states[..index].to_vec(),
                },
                block.clone(),
            )),
            _ => None,
        }
    }

    /// Pop every list item on top of the stack.
    pub fn pop_list_items(&mut self) {
        while matches!(self.top(), State::ListItem(_)) {
            self.states.pop();
        }
    }

    /// Whether any enclosing delimited block is verbatim.
    #[must_use]
    pub fn is_in_verbatim_block(&self) -> bool {
        self.states.iter().any(|state| {
            matches!(
                state,
                State::DelimitedBlock(DelimitedBlock {
                    phase: BlockPhase::Verbatim,
                    ..
                })
            )
        })
    }

    /// Whether the stack holds a list item belonging to the list that starts
    /// at `list_start_line`.
    #[must_use]
    pub fn contains_list(&self, list_start_line: LineId) -> bool {
        self.states.iter().any(|state| {
            state
                .as_list_item()
                .is_some_and(|item| item.list_start_line == list_start_line)
        })
    }

    /// Find the nearest enclosing list with `marker`, searching down from the
    /// top until the first ROOT or delimited block.
    ///
    /// Returns the stack below that list item and the item itself.
    #[must_use]
    pub fn split_at_list(&self, marker: &str) -> Option<(Self, ListItem)> {
        for (index, state) in self.states.iter().enumerate().rev() {
            if state.is_container() {
                return None;
            }
            if let State::ListItem(item) = state
                && item.marker == marker
            {
                let base = Self {
                    states: self.states[..index].to_vec(),
                };
                return Some((base, item.clone()));
            }
        }
        None
    }

    /// Copy truncated to the innermost ROOT or delimited block, which stays.
    #[must_use]
    pub fn until_container(&self) -> Self {
        let keep = self
            .states
            .iter()
            .rposition(State::is_container)
            .map_or(1, |index| index + 1);
        Self {
            states: self.states[..keep].to_vec(),
        }
    }

    /// The innermost list item, looking through one delimited block on top.
    ///
    /// A line opening a block attached to a list item carries the block on top
    /// of the item it belongs to.
    #[must_use]
    pub fn owning_list_item(&self) -> Option<&ListItem> {
        let mut states = self.states.iter().rev();
        match states.next()? {
            State::ListItem(item) => Some(item),
            State::DelimitedBlock(_) => states.next().and_then(State::as_list_item),
            _ => None,
        }
    }

    /// Multi-line rendering, top to bottom.
    #[must_use]
    pub fn pretty(&self, indent: usize) -> String {
        let pad = " ".repeat(indent);
        self.states
            .iter()
            .enumerate()
            .rev()
            .map(|(index, state)| format!("{pad}[{index}] {state}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
