//! Fatal internal-consistency errors.

use crate::document::LineId;

/// Conditions that abort processing of a document.
///
/// Problems with individual conditionals are not errors; they are reported as
/// [`Diagnostic`](crate::Diagnostic)s and the offending span is left as is.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("line {line}: {state} state must not be carried to the next line")]
    CarriedLineLocalState { line: LineId, state: String },

    #[error("line {0} is not in the document")]
    LineNotFound(LineId),

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedState {
        line: LineId,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: delimited block starting at line {start} is already closed")]
    BlockAlreadySealed { line: LineId, start: LineId },

    #[error("line {0}: delimited block has no recorded end")]
    UnsealedBlock(LineId),
}
