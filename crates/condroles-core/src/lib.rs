//! Resolve `ifdef`/`ifndef` conditionals in `AsciiDoc` into role markup.
//!
//! Processing runs in three strictly ordered passes:
//!
//! 1. [`parse`] reconstructs the implicit document structure, giving every
//!    line a [`StateStack`].
//! 2. [`classify`] decides, for each conditional span, how it lines up with
//!    that structure, or rejects it with a [`Diagnostic`].
//! 3. [`transform`] rewrites each classified span with roles and removes the
//!    directive lines.
//!
//! [`Preprocessor`] runs all three.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use condroles_core::{Preprocessor, RoleFormat};
//!
//! let values: BTreeSet<String> = ["azure", "aws"].iter().map(|v| v.to_string()).collect();
//! let preprocessor = Preprocessor::new(values, RoleFormat::new(Some("platform".to_owned())));
//!
//! let outcome = preprocessor
//!     .process(&["ifdef::azure[]", "Only on Azure.", "endif::[]"])
//!     .unwrap();
//! assert_eq!(outcome.lines, vec![r#"[role="platform:azure"]"#, "Only on Azure."]);
//! ```

mod classifier;
mod diagnostic;
mod document;
mod error;
mod parser;
mod roles;
mod state;
mod transform;

use std::collections::BTreeSet;

pub use classifier::{Classified, Conditional, ConditionalMap, SpanKind, classify};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use document::{Document, Line, LineId};
pub use error::Error;
pub use parser::{Parsed, parse};
pub use roles::{INLINE_CLOSE, RoleFormat};
pub use state::{
    BlockPhase, BlockPrefix, ConditionalMark, DelimitedBlock, ListItem, ListPhase,
    ParagraphPhase, State, StateStack, StateSubtype, StateType,
};
pub use transform::transform;

/// Result of resolving one document.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Final line texts.
    pub lines: Vec<String>,
    /// Spans that were resolved.
    pub conditionals: ConditionalMap,
    /// Parser diagnostics followed by classifier diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse and classify a document without rewriting it.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub document: Document,
    pub conditionals: ConditionalMap,
    pub diagnostics: Vec<Diagnostic>,
}

/// Full conditional resolution pipeline for a fixed set of values.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    values: BTreeSet<String>,
    roles: RoleFormat,
}

impl Preprocessor {
    /// `values` is the universe of recognized value tokens.
    #[must_use]
    pub fn new(values: BTreeSet<String>, roles: RoleFormat) -> Self {
        Self { values, roles }
    }

    #[must_use]
    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    #[must_use]
    pub fn roles(&self) -> &RoleFormat {
        &self.roles
    }

    /// Parse and classify without transforming.
    pub fn inspect<S: AsRef<str>>(&self, lines: &[S]) -> Result<Inspection, Error> {
        let Parsed {
            document,
            mut diagnostics,
        } = parse(lines)?;
        let classified = classify(&document, &self.values)?;
        diagnostics.extend(classified.diagnostics);
        Ok(Inspection {
            document,
            conditionals: classified.map,
            diagnostics,
        })
    }

    /// Resolve every eligible conditional in `lines`.
    pub fn process<S: AsRef<str>>(&self, lines: &[S]) -> Result<Outcome, Error> {
        let Inspection {
            mut document,
            conditionals,
            diagnostics,
        } = self.inspect(lines)?;
        transform(&mut document, &conditionals, &self.roles)?;
        Ok(Outcome {
            lines: document.contents(),
            conditionals,
            diagnostics,
        })
    }

    /// Resolve a whole text; a trailing newline is kept.
    pub fn process_str(&self, text: &str) -> Result<(String, Outcome), Error> {
        let lines: Vec<&str> = text.lines().collect();
        let outcome = self.process(&lines)?;
        let mut output = outcome.lines.join("\n");
        if text.ends_with('\n') && !outcome.lines.is_empty() {
            output.push('\n');
        }
        Ok((output, outcome))
    }
}
