//! # Galley
//!
//! Galley decides where lines and pages break.
//! It takes the box, glue and penalty lists of TeX
//!     and implements the two optimizing breakers that turn them into finished output:
//!
//! - [break_paragraph] chooses line breaks in a horizontal list using the
//!     optimum-fit algorithm of Knuth and Plass.
//! - [break_pages] chooses page breaks in a vertical list,
//!     placing insertions and floats and tracking marks along the way.
//!
//! Both breakers read their parameters through a [ParameterContext]
//!     at the moment each breakpoint is evaluated.
//! Infeasible layouts never fail: the breakers fall back to the least bad choice
//!     and attach a [Diagnostic] to the output.
//!
//! The [text] module builds horizontal lists out of text,
//!     and [VerticalList] assembles broken paragraphs into a vertical list.

pub mod cost;
pub mod diagnostics;
pub mod error;
pub mod linebreak;
pub mod node;
pub mod pack;
pub mod pagebreak;
pub mod params;
pub mod split;
pub mod text;
pub mod vlist;

pub use diagnostics::Diagnostic;
pub use error::{Error, Result};
pub use linebreak::{break_paragraph, BreakRecord, Paragraph};
pub use pagebreak::{break_pages, MarkTriple, Page};
pub use params::{ParameterContext, Params, WithHook};
pub use split::{BestVerticalBreak, GreedyFit, Split, SplitStrategy};
pub use vlist::VerticalList;
