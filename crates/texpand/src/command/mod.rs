//! Texpand commands API
//!
//! A control sequence or active character is bound to a [Command].
//! Commands are either built-in primitives, implemented as Rust functions,
//!     user defined macros, or aliases for character tokens created with `\let`.

use crate::conditional::ConditionalKind;
use crate::error;
use crate::expander::Expander;
use crate::texmacro::Macro;
use crate::token::{Token, Value};
use std::rc::Rc;

mod map;
pub use map::Map;
pub use map::NoGroupToEndError;
pub use map::Scope;

/// The Rust type of expansion primitive functions.
///
/// An expansion primitive reads from the input and pushes its result
///     in front of the remaining input using [Expander::expansions_mut].
pub type ExpansionFn = fn(token: Token, expander: &mut Expander) -> error::Result<()>;

/// The Rust type of execution primitive functions.
///
/// Execution primitives are run by [Expander::next_token] and never reach the caller.
/// They are used for assignments like `\def` and for grouping.
pub type ExecutionFn = fn(token: Token, expander: &mut Expander) -> error::Result<()>;

/// A tag identifies primitives that other primitives need to recognize.
///
/// E.g., while skipping a conditional branch the expander needs to know which
///     control sequences open or close conditionals, whatever their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Conditional(ConditionalKind),
    Else,
    Or,
    Fi,
    Unless,
    Prefix(PrefixKind),
    /// `\def` and its variants.
    Definition {
        /// The definition is always global, as for `\gdef`.
        global: bool,
        /// The replacement text is expanded, as for `\edef`.
        expanded: bool,
    },
    Let,
    EndCsName,
}

/// The prefixes that may precede a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixKind {
    Global,
    Long,
    Outer,
    Protected,
}

/// A command.
#[derive(Debug, Clone)]
pub enum Command {
    /// An expansion primitive that is implemented in the engine.
    ///
    /// Examples: `\ifnum`, `\expandafter`, `\csname`.
    Expansion(ExpansionFn, Option<Tag>),

    /// A user defined macro.
    Macro(Rc<Macro>),

    /// An execution primitive, run by the expander itself.
    ///
    /// Examples: `\def`, `\let`, `\begingroup`.
    Execution(ExecutionFn, Option<Tag>),

    /// A non-expandable primitive that is passed through to the consumer of the
    ///     expanded stream. The string is the primitive's name.
    ///
    /// Examples: `\relax`, `\par`.
    Unexpandable(&'static str),

    /// A command that aliases a character token.
    ///
    /// Created using `\let\a=b`.
    CharacterTokenAlias(Value),
}

impl Command {
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Command::Expansion(_, tag) | Command::Execution(_, tag) => *tag,
            _ => None,
        }
    }

    /// Whether this command is expanded by the expander.
    pub fn is_expandable(&self) -> bool {
        matches!(self, Command::Expansion(..) | Command::Macro(..))
    }

    /// Whether two commands have the same meaning, in the sense of `\ifx`.
    pub fn meaning_eq(&self, other: &Command) -> bool {
        match (self, other) {
            (Command::Expansion(a, _), Command::Expansion(b, _)) => *a as usize == *b as usize,
            (Command::Execution(a, _), Command::Execution(b, _)) => *a as usize == *b as usize,
            (Command::Macro(a), Command::Macro(b)) => Rc::ptr_eq(a, b) || a == b,
            (Command::Unexpandable(a), Command::Unexpandable(b)) => a == b,
            (Command::CharacterTokenAlias(a), Command::CharacterTokenAlias(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Rc<Macro>> for Command {
    fn from(value: Rc<Macro>) -> Self {
        Command::Macro(value)
    }
}

/// A built-in command: a command together with its documentation.
///
/// Built-ins are provided when the expander is created.
#[derive(Debug, Clone)]
pub struct BuiltIn {
    command: Command,
    doc: Option<&'static str>,
}

impl BuiltIn {
    pub fn new_expansion(f: ExpansionFn) -> BuiltIn {
        Command::Expansion(f, None).into()
    }

    pub fn new_execution(f: ExecutionFn) -> BuiltIn {
        Command::Execution(f, None).into()
    }

    pub fn new_unexpandable(name: &'static str) -> BuiltIn {
        Command::Unexpandable(name).into()
    }

    pub fn with_tag(mut self, tag: Tag) -> BuiltIn {
        match &mut self.command {
            Command::Expansion(_, t) | Command::Execution(_, t) => *t = Some(tag),
            _ => {}
        }
        self
    }

    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command {
        &self.command
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

impl From<Command> for BuiltIn {
    fn from(command: Command) -> Self {
        BuiltIn { command, doc: None }
    }
}
