//! The macro and conditional expander.
//!
//! The expander sits between a [TokenSource] and the consumer of the expanded stream.
//! It has three layers:
//!
//! - [Expander::next_unexpanded] returns the next raw token, taking it from the stack of
//!     pending tokens if that stack is non-empty and from the source otherwise.
//!
//! - [Expander::next_expanded] additionally expands macros and expansion primitives
//!     (conditionals, `\expandafter`, `\csname`, ...) until a non-expandable token is found.
//!
//! - [Expander::next_token] additionally runs execution primitives (definitions and grouping)
//!     so that only tokens meaningful to list construction reach the caller.
//!
//! All pending tokens live in a single stack stored in reverse order.
//! When a macro is expanded its substituted replacement text is pushed onto this stack.
//! A macro whose replacement text ends with another macro invocation thus never
//!     grows any Rust call stack.

use crate::command::{self, BuiltIn, Command, Scope, Tag};
use crate::conditional;
use crate::error::{self, Context, Error, Kind};
use crate::mode::{FixedMode, Mode, ModeOracle};
use crate::source::TokenSource;
use crate::texmacro::{Macro, RawTokens};
use crate::token::{trace, write_tokens, CommandRef, CsName, CsNameInterner, Token, Value};
use std::rc::Rc;

/// Configuration of the expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Maximum number of expansions performed without delivering a token
    ///     or running an execution primitive.
    pub max_expansion_depth: usize,
    /// Maximum number of groups open at the same time.
    pub max_group_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_expansion_depth: 10_000,
            max_group_depth: 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    /// Opened by a begin group character like `{`.
    Simple,
    /// Opened by `\begingroup`.
    SemiSimple,
}

/// The macro and conditional expander.
pub struct Expander {
    source: Box<dyn TokenSource>,
    interner: CsNameInterner,
    commands: command::Map,
    expansions: Vec<Token>,
    conditionals: Vec<conditional::Frame>,
    groups: Vec<GroupKind>,
    expansion_depth: usize,
    suppress_next: bool,
    macro_stack: Vec<Token>,
    mode: Box<dyn ModeOracle>,
    config: Config,
    par: CsName,
}

impl Expander {
    /// Creates an expander with an empty macro table.
    ///
    /// Use [crate::primitives::register] to add the standard primitives.
    pub fn new<S: TokenSource + 'static>(source: S) -> Expander {
        let mut interner: CsNameInterner = Default::default();
        let par = interner.get_or_intern("par");
        Expander {
            source: Box::new(source),
            interner,
            commands: Default::default(),
            expansions: Vec::new(),
            conditionals: Vec::new(),
            groups: Vec::new(),
            expansion_depth: 0,
            suppress_next: false,
            macro_stack: Vec::new(),
            mode: Box::new(FixedMode(Mode::Vertical)),
            config: Default::default(),
            par,
        }
    }

    pub fn with_config(mut self, config: Config) -> Expander {
        self.config = config;
        self
    }

    pub fn with_mode_oracle<M: ModeOracle + 'static>(mut self, oracle: M) -> Expander {
        self.mode = Box::new(oracle);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn interner(&self) -> &CsNameInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut CsNameInterner {
        &mut self.interner
    }

    /// Returns the current typesetting mode, as reported by the mode oracle.
    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    /// Registers a built-in command under the provided name, in the global scope.
    pub fn register_built_in(&mut self, name: &str, built_in: BuiltIn) {
        let cs_name = self.interner.get_or_intern(name);
        self.commands.insert(
            CommandRef::ControlSequence(cs_name),
            built_in.cmd().clone(),
            Scope::Global,
        );
    }

    /// Defines a macro.
    ///
    /// A local definition is reverted when the current group ends.
    pub fn define(&mut self, name: &str, definition: Macro, scope: Scope) {
        let cs_name = self.interner.get_or_intern(name);
        self.define_command(
            CommandRef::ControlSequence(cs_name),
            Command::Macro(Rc::new(definition)),
            scope,
        );
    }

    /// Binds a command to a control sequence or active character.
    pub fn define_command(&mut self, command_ref: CommandRef, command: Command, scope: Scope) {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "defining {} ({:?} scope)",
                command_ref.to_string(&self.interner),
                scope
            );
        }
        self.commands.insert(command_ref, command, scope);
    }

    /// Removes the binding of a control sequence or active character.
    pub fn undefine(&mut self, command_ref: CommandRef, scope: Scope) {
        self.commands.remove(command_ref, scope);
    }

    pub fn command(&self, command_ref: &CommandRef) -> Option<&Command> {
        self.commands.get(command_ref)
    }

    /// Returns the next fully expanded token, or [None] at the end of the stream.
    ///
    /// Macros and conditionals are expanded, definitions and grouping commands are executed.
    /// Character token aliases created with `\let` are resolved to their characters.
    pub fn next_token(&mut self) -> error::Result<Option<Token>> {
        self.next_token_impl().map_err(|err| self.attach_context(err))
    }

    fn next_token_impl(&mut self) -> error::Result<Option<Token>> {
        loop {
            let token = match self.next_expanded()? {
                None => return Ok(None),
                Some(token) => token,
            };
            let token = match token.value() {
                Value::CommandRef(command_ref) => match self.commands.get(&command_ref) {
                    Some(Command::Execution(f, _)) => {
                        let f = *f;
                        f(token, self)?;
                        self.expansion_depth = 0;
                        continue;
                    }
                    Some(Command::CharacterTokenAlias(value)) => {
                        Token::new(*value, token.trace_key())
                    }
                    _ => token,
                },
                _ => token,
            };
            match token.value() {
                Value::BeginGroup(_) => self.begin_group(GroupKind::Simple, &token)?,
                Value::EndGroup(_) => self.end_group(GroupKind::Simple, &token)?,
                _ => {}
            }
            self.expansion_depth = 0;
            return Ok(Some(token));
        }
    }

    /// Drains the stream, returning every expanded token, and then performs the end-of-stream checks.
    pub fn expand_all(&mut self) -> error::Result<Vec<Token>> {
        let mut result = Vec::new();
        while let Some(token) = self.next_token()? {
            result.push(token);
        }
        self.end()?;
        Ok(result)
    }

    /// Checks that no conditional and no group is still open.
    ///
    /// This should be called once the stream returned [None].
    pub fn end(&mut self) -> error::Result<()> {
        if let Some(frame) = self.conditionals.last() {
            let err = Error::new(Kind::FatalSyntax, "incomplete conditional")
                .with_note(format![
                    "the input ended while {} conditional(s) were open; the innermost is {}",
                    self.conditionals.len(),
                    frame.kind
                ])
                .with_note("every conditional must be closed by \\fi");
            return Err(self.attach_context(err.boxed()));
        }
        if !self.groups.is_empty() {
            let err = Error::new(
                Kind::FatalSyntax,
                format!["the input ended with {} group(s) open", self.groups.len()],
            )
            .with_note("every { must be closed by a } and every \\begingroup by an \\endgroup");
            return Err(self.attach_context(err.boxed()));
        }
        Ok(())
    }

    /// Expands the macro that `token` refers to, pushing the result in front of the stream.
    pub fn expand(&mut self, token: Token, definition: &Macro) -> error::Result<()> {
        self.count_expansion(&token)?;
        definition.call(token, self)
    }

    /// Evaluates the conditional, and then skips input until the branch to be expanded.
    ///
    /// `token` is the token that invoked the conditional and is used for error reporting.
    pub fn evaluate_conditional(
        &mut self,
        token: Token,
        kind: conditional::ConditionalKind,
    ) -> error::Result<()> {
        conditional::begin(token, self, kind, false)
    }

    /// Returns the next token, without expanding it.
    #[inline]
    pub fn next_unexpanded(&mut self) -> error::Result<Option<Token>> {
        self.suppress_next = false;
        if let Some(token) = self.expansions.pop() {
            return Ok(Some(token));
        }
        self.source.next(&mut self.interner)
    }

    /// Returns the next token that is not a macro or an expansion primitive.
    ///
    /// Execution primitives like `\def` are returned to the caller.
    pub fn next_expanded(&mut self) -> error::Result<Option<Token>> {
        self.next_expanded_impl(true)
    }

    /// Like [Expander::next_expanded], but macros defined with `\protected` are returned
    ///     unexpanded. This is how the bodies of `\edef` and `\xdef` are read.
    pub fn next_expanded_unprotected(&mut self) -> error::Result<Option<Token>> {
        self.next_expanded_impl(false)
    }

    fn next_expanded_impl(&mut self, expand_protected: bool) -> error::Result<Option<Token>> {
        loop {
            let suppressed = self.suppress_next;
            let token = match self.next_unexpanded()? {
                None => return Ok(None),
                Some(token) => token,
            };
            if suppressed {
                return Ok(Some(token));
            }
            if !expand_protected {
                self.check_outer(&token, "scanning a definition")?;
            }
            if !self.expand_token(token, expand_protected)? {
                return Ok(Some(token));
            }
        }
    }

    /// Expands the next token once, if it is expandable.
    ///
    /// Returns whether an expansion was performed.
    /// A token that is not expandable is left in the stream.
    pub fn expand_once(&mut self) -> error::Result<bool> {
        let token = match self.next_unexpanded()? {
            None => return Ok(false),
            Some(token) => token,
        };
        let expanded = self.expand_token(token, true)?;
        if !expanded {
            self.back_input(token);
        }
        Ok(expanded)
    }

    fn expand_token(&mut self, token: Token, expand_protected: bool) -> error::Result<bool> {
        let command_ref = match token.value() {
            Value::CommandRef(command_ref) => command_ref,
            _ => return Ok(false),
        };
        match self.commands.get(&command_ref) {
            None => Err(self.undefined(token)),
            Some(Command::Macro(definition)) => {
                if !expand_protected && definition.flags().protected {
                    return Ok(false);
                }
                let definition = definition.clone();
                self.expand(token, &definition)?;
                Ok(true)
            }
            Some(Command::Expansion(f, tag)) => {
                let f = *f;
                if matches!(tag, Some(Tag::Else | Tag::Or | Tag::Fi))
                    && self.conditional_is_evaluating()
                {
                    return Ok(false);
                }
                self.count_expansion(&token)?;
                f(token, self)?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    /// Returns the next expanded token, or an error if the input has ended.
    pub fn next_expanded_or_err(&mut self, reading: &str) -> error::Result<Token> {
        match self.next_expanded()? {
            Some(token) => Ok(token),
            None => Err(self.end_of_input(reading)),
        }
    }

    /// Returns the next unexpanded token, or an error if the input has ended.
    pub fn next_unexpanded_or_err(&mut self, reading: &str) -> error::Result<Token> {
        match self.next_unexpanded()? {
            Some(token) => Ok(token),
            None => Err(self.end_of_input(reading)),
        }
    }

    /// Pushes a token back in front of the stream.
    #[inline]
    pub fn back_input(&mut self, token: Token) {
        self.expansions.push(token);
    }

    /// Stack of pending tokens, in reverse order: the next token is at the end.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        &mut self.expansions
    }

    /// Prevents the next token returned by [Expander::next_expanded] from being expanded.
    pub fn suppress_next_expansion(&mut self) {
        self.suppress_next = true;
    }

    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }

    pub fn conditional_depth(&self) -> usize {
        self.conditionals.len()
    }

    pub(crate) fn conditionals_mut(&mut self) -> &mut Vec<conditional::Frame> {
        &mut self.conditionals
    }

    fn conditional_is_evaluating(&self) -> bool {
        matches!(
            self.conditionals.last(),
            Some(conditional::Frame {
                state: conditional::State::Evaluating,
                ..
            })
        )
    }

    /// Opens a group for `\begingroup`.
    pub fn begin_semisimple_group(&mut self, token: &Token) -> error::Result<()> {
        self.begin_group(GroupKind::SemiSimple, token)
    }

    /// Closes a group opened by `\begingroup`.
    pub fn end_semisimple_group(&mut self, token: &Token) -> error::Result<()> {
        self.end_group(GroupKind::SemiSimple, token)
    }

    fn begin_group(&mut self, kind: GroupKind, token: &Token) -> error::Result<()> {
        if self.groups.len() >= self.config.max_group_depth {
            return Err(self.error_at(
                Kind::FatalSyntax,
                format![
                    "cannot open more than {} nested groups",
                    self.config.max_group_depth
                ],
                token,
            )
            .boxed());
        }
        self.groups.push(kind);
        self.commands.begin_group();
        Ok(())
    }

    fn end_group(&mut self, kind: GroupKind, token: &Token) -> error::Result<()> {
        match self.groups.last() {
            Some(current) if *current == kind => {}
            Some(GroupKind::Simple) => {
                return Err(self
                    .error_at(Kind::FatalSyntax, "extra \\endgroup", token)
                    .with_note("the current group was opened by a begin group character")
                    .boxed());
            }
            Some(GroupKind::SemiSimple) => {
                return Err(self
                    .error_at(Kind::FatalSyntax, "extra }, or forgotten \\endgroup", token)
                    .with_note("the current group was opened by \\begingroup")
                    .boxed());
            }
            None => {
                return Err(self
                    .error_at(Kind::FatalSyntax, "there is no group to end", token)
                    .boxed());
            }
        }
        self.groups.pop();
        if self.commands.end_group().is_err() {
            return Err(self
                .error_at(Kind::FatalSyntax, "there is no group to end", token)
                .boxed());
        }
        Ok(())
    }

    fn count_expansion(&mut self, token: &Token) -> error::Result<()> {
        self.expansion_depth += 1;
        if self.expansion_depth > self.config.max_expansion_depth {
            return Err(self
                .error_at(
                    Kind::ExpansionDepthExceeded,
                    format![
                        "more than {} expansions were performed without producing any output",
                        self.config.max_expansion_depth
                    ],
                    token,
                )
                .with_note("this is usually caused by a macro that expands to itself")
                .boxed());
        }
        Ok(())
    }

    pub(crate) fn enter_macro(&mut self, token: Token) {
        self.macro_stack.push(token);
    }

    pub(crate) fn exit_macro(&mut self) {
        self.macro_stack.pop();
    }

    /// Returns an error if the token refers to an `\outer` macro.
    pub(crate) fn check_outer(&self, token: &Token, reading: &str) -> error::Result<()> {
        let command_ref = match token.command_ref() {
            None => return Ok(()),
            Some(command_ref) => command_ref,
        };
        match self.commands.get(&command_ref) {
            Some(Command::Macro(definition)) if definition.flags().outer => Err(self
                .error_at(
                    Kind::OuterInPreamble,
                    format![
                        "forbidden control sequence {} found while {}",
                        self.render(token),
                        reading
                    ],
                    token,
                )
                .with_note("macros defined with \\outer may not appear here")
                .boxed()),
            _ => Ok(()),
        }
    }

    /// Whether the token is the control sequence `\par`.
    pub(crate) fn is_par(&self, token: &Token) -> bool {
        token.value() == Value::CommandRef(CommandRef::ControlSequence(self.par))
    }

    /// Renders a token the way TeX prints it.
    pub fn render(&self, token: &Token) -> String {
        write_tokens(std::iter::once(token), &self.interner)
            .trim_end()
            .to_string()
    }

    /// Returns where in the source the token came from, if known.
    pub fn trace(&self, token: &Token) -> Option<trace::SourceCodeTrace> {
        if token.trace_key().is_dummy() {
            return None;
        }
        self.source.trace(token.trace_key())
    }

    pub(crate) fn error_at<S: Into<String>>(&self, kind: Kind, title: S, token: &Token) -> Error {
        Error::new(kind, title)
            .with_token(self.render(token))
            .with_trace(self.trace(token))
    }

    fn undefined(&self, token: Token) -> Box<Error> {
        self.error_at(
            Kind::UndefinedControlSequence,
            format!["undefined control sequence {}", self.render(&token)],
            &token,
        )
        .boxed()
    }

    pub(crate) fn end_of_input(&self, reading: &str) -> Box<Error> {
        let mut err = Error::new(
            Kind::EndOfInput,
            format!["the input ended while {reading}"],
        );
        if let Some(token) = self.macro_stack.last() {
            err = err.with_token(self.render(token));
        }
        err.boxed()
    }

    fn context(&self) -> Context {
        Context {
            group_depth: self.groups.len(),
            conditional_depth: self.conditionals.len(),
            expansion_depth: self.expansion_depth,
            macro_stack: self.macro_stack.iter().map(|t| self.render(t)).collect(),
        }
    }

    fn attach_context(&self, mut err: Box<Error>) -> Box<Error> {
        err.set_context(self.context(), None, None);
        log::debug!("expansion failed: {}", err.title());
        err
    }
}

impl RawTokens for Expander {
    fn next_raw(&mut self) -> error::Result<Option<Token>> {
        let token = self.next_unexpanded()?;
        if let Some(token) = &token {
            self.check_outer(token, "scanning a definition")?;
        }
        Ok(token)
    }
}

impl std::fmt::Debug for Expander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expander")
            .field("pending", &self.expansions.len())
            .field("conditionals", &self.conditionals)
            .field("groups", &self.groups)
            .field("expansion_depth", &self.expansion_depth)
            .field("config", &self.config)
            .finish()
    }
}
