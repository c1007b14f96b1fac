//! Recoverable problems found while resolving conditionals.

use std::fmt;

use crate::document::LineId;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `endif` with no open conditional before it.
    UnmatchedEndif,
    /// `+` directly after another `+`.
    DoubleContinuation,
    /// `+` outside an open list item.
    StrayContinuation,
    /// Section header inside a delimited block.
    SectionHeaderInBlock,
    /// Delimited block never closed before end of input.
    UnclosedBlock { delimiter: String },
    SingleLineConditional,
    MissingEndif,
    Ifeval,
    MissingExpression,
    UnionExpression { expression: String },
    UnknownValue { value: String },
    /// `ifndef` that excludes every recognized value.
    NoRemainingValues { expression: String },
    CrossesBlockBoundary,
    InsideVerbatim,
    /// Span opens on a `+` list continuation line.
    StartsAtContinuation,
    FollowsBlockAttributes,
    DetachesBlockTitle,
    EmptyConditional,
    BlankConditional,
    SpansSeveralItems,
    BreaksBoundary,
    /// Conditional nested inside an accepted span.
    Nested { outer: LineId },
    /// Section header inside an accepted span.
    ConditionedSectionHeader { conditional: LineId },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmatchedEndif => f.write_str("endif without a matching ifdef or ifndef"),
            Self::DoubleContinuation => f.write_str("list continuation directly after another"),
            Self::StrayContinuation => f.write_str("list continuation outside a list item"),
            Self::SectionHeaderInBlock => f.write_str("section header inside a delimited block"),
            Self::UnclosedBlock { delimiter } => {
                write!(f, "delimited block '{delimiter}' is never closed")
            }
            Self::SingleLineConditional => {
                f.write_str("single-line conditionals are not supported")
            }
            Self::MissingEndif => f.write_str("conditional has no matching endif"),
            Self::Ifeval => f.write_str("ifeval conditionals are not supported"),
            Self::MissingExpression => f.write_str("conditional has no attribute"),
            Self::UnionExpression { expression } => {
                write!(f, "'+' expressions are not supported: {expression}")
            }
            Self::UnknownValue { value } => write!(f, "'{value}' is not a recognized value"),
            Self::NoRemainingValues { expression } => {
                write!(f, "ifndef::{expression} excludes every recognized value")
            }
            Self::CrossesBlockBoundary => f.write_str("conditional crosses a block boundary"),
            Self::InsideVerbatim => f.write_str("conditional inside a verbatim block"),
            Self::StartsAtContinuation => {
                f.write_str("conditional starts at a list continuation marker")
            }
            Self::FollowsBlockAttributes => {
                f.write_str("conditional directly after a block attribute line")
            }
            Self::DetachesBlockTitle => {
                f.write_str("conditional separates a block title from its block")
            }
            Self::EmptyConditional => f.write_str("empty conditional"),
            Self::BlankConditional => f.write_str("conditional contains only blank lines"),
            Self::SpansSeveralItems => {
                f.write_str("conditional starts mid-block and spans more than one item")
            }
            Self::BreaksBoundary => {
                f.write_str("conditional ends inside a paragraph or list item")
            }
            Self::Nested { outer } => {
                write!(f, "nested conditional inside the conditional at line {outer}")
            }
            Self::ConditionedSectionHeader { conditional } => write!(
                f,
                "section header inside the conditional at line {conditional}"
            ),
        }
    }
}

/// A recoverable problem tied to a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: LineId,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    #[must_use]
    pub fn new(line: LineId, kind: DiagnosticKind) -> Self {
        Self { line, kind }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::new(
            LineId::new(12),
            DiagnosticKind::UnknownValue {
                value: "gcp".to_owned(),
            },
        );
        assert_eq!(
            diagnostic.to_string(),
            "line 12: 'gcp' is not a recognized value"
        );
    }

    #[test]
    fn test_nested_names_outer_line() {
        let diagnostic = Diagnostic::new(
            LineId::new(5),
            DiagnosticKind::Nested {
                outer: LineId::new(2),
            },
        );
        assert_eq!(
            diagnostic.to_string(),
            "line 5: nested conditional inside the conditional at line 2"
        );
    }
}
