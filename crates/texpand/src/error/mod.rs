//! Error handling
//!
//! All errors raised while expanding are fatal for the current token stream:
//!     they abort expansion and surface to the caller with the context
//!     (groups, conditionals, expansion depth, source position) at the failure point.

use crate::token::trace;

mod display;

/// Result type used throughout Texpand.
///
/// The error is boxed so that the happy path stays small.
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// The kind of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// Unmatched group or conditional delimiters, or malformed syntax.
    #[error("fatal syntax error")]
    FatalSyntax,
    /// The arguments of a macro invocation don't match its parameter text.
    #[error("macro argument mismatch")]
    MacroArgumentMismatch,
    /// An `\outer` macro appeared where outer macros are forbidden.
    #[error("forbidden outer macro")]
    OuterInPreamble,
    /// Too many macro expansions were performed without producing output.
    #[error("expansion depth exceeded")]
    ExpansionDepthExceeded,
    #[error("undefined control sequence")]
    UndefinedControlSequence,
    /// The input ended while a primitive was still reading its operands.
    #[error("unexpected end of input")]
    EndOfInput,
    /// A number or dimension could not be parsed.
    #[error("invalid number")]
    InvalidNumber,
    #[error("invalid character")]
    InvalidCharacter,
}

/// Context describing the state of the expander when an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Context {
    /// Number of groups open at the failure point.
    pub group_depth: usize,
    /// Number of conditionals open at the failure point.
    pub conditional_depth: usize,
    /// Number of macro expansions performed since output was last produced.
    pub expansion_depth: usize,
    /// The macros being expanded, outermost first.
    pub macro_stack: Vec<String>,
}

/// An error raised by the expander.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Error {
    kind: Kind,
    title: String,
    notes: Vec<String>,
    token: Option<String>,
    trace: Option<trace::SourceCodeTrace>,
    context: Option<Context>,
}

impl Error {
    pub fn new<S: Into<String>>(kind: Kind, title: S) -> Error {
        Error {
            kind,
            title: title.into(),
            notes: vec![],
            token: None,
            trace: None,
            context: None,
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Error {
        self.notes.push(note.into());
        self
    }

    /// Records the rendered form of the token that caused the error.
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Error {
        self.token = Some(token.into());
        self
    }

    pub fn with_trace(mut self, trace: Option<trace::SourceCodeTrace>) -> Error {
        if trace.is_some() {
            self.trace = trace;
        }
        self
    }

    pub fn boxed(self) -> Box<Error> {
        Box::new(self)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn trace(&self) -> Option<&trace::SourceCodeTrace> {
        self.trace.as_ref()
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Attaches context, unless context was already attached closer to the failure.
    pub(crate) fn set_context(
        &mut self,
        context: Context,
        token: Option<String>,
        trace: Option<trace::SourceCodeTrace>,
    ) {
        if self.context.is_none() {
            self.context = Some(context);
        }
        if self.token.is_none() {
            self.token = token;
        }
        if self.trace.is_none() {
            self.trace = trace;
        }
    }

    /// Whether this error terminates the whole build.
    ///
    /// Every expander error aborts the current stream; these two also abort the document.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, Kind::FatalSyntax | Kind::ExpansionDepthExceeded)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display::format_error(f, self)
    }
}
