//! Line-shape recognizers for `AsciiDoc` source.
//!
//! Each recognizer looks at a single right-trimmed line and answers one
//! question about its shape: is it a conditional directive, a block delimiter,
//! a list item, a block title, and so on. Recognizers never look at
//! neighbouring lines; deciding what a shape *means* in context is the job of
//! the structural parser in `condroles-core`.
//!
//! # Example
//!
//! ```
//! use condroles_syntax::{Operator, match_conditional, match_delimiter, match_list_item};
//!
//! let directive = match_conditional("ifdef::azure[]").unwrap();
//! assert_eq!(directive.operator, Operator::Ifdef);
//! assert_eq!(directive.target, "azure");
//!
//! assert_eq!(match_delimiter("----"), Some("----"));
//! assert_eq!(match_list_item("** Nested").unwrap().marker, "**");
//! ```

mod delimiter;
mod directive;
mod shapes;

pub use delimiter::{is_comment_delimiter, is_verbatim_delimiter, match_delimiter};
pub use directive::{DirectiveLine, Operator, match_conditional};
pub use shapes::{
    ListItemLine, is_attribute_definition, is_block_attribute_line, is_block_title,
    is_continuation, is_line_comment, is_section_header, match_list_item,
};
