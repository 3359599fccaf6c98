//! Conditional evaluation and branch skipping.
//!
//! Each open conditional has a [Frame] on the expander's conditional stack.
//! A frame moves through the states of [State]:
//!
//! - it starts in [State::Evaluating] while the condition's operands are read;
//!
//! - if the true branch (or the selected `\ifcase` case) is taken it moves to [State::Expanding];
//!     otherwise it moves to [State::SkippingToElse] and input is discarded until
//!     the matching `\else`, the matching `\or` or the matching `\fi`;
//!
//! - when an `\else` or `\or` is reached while expanding, the frame moves to
//!     [State::SkippingToTerminator] and input is discarded until the matching `\fi`.
//!
//! While skipping, only the tags of control sequences are inspected.
//! Nested conditionals inside a skipped branch are tracked with a depth counter
//!     so that their `\else` and `\fi` tokens don't end the skip;
//!     their conditions are never evaluated.

use crate::command::{Command, Tag};
use crate::error::{self, Kind};
use crate::expander::Expander;
use crate::parse;
use crate::token::{CatCode, CommandRef, Token, Value};

/// The kind of a conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionalKind {
    /// `\ifnum`
    Num,
    /// `\ifdim`
    Dim,
    /// `\ifodd`
    Odd,
    /// `\ifx`
    X,
    /// `\if`
    Char,
    /// `\ifcat`
    Cat,
    /// `\iftrue`
    True,
    /// `\iffalse`
    False,
    /// `\ifcase`
    Case,
    /// `\ifdefined`
    Defined,
    /// `\ifcsname`
    CsName,
    /// `\ifvmode`
    VMode,
    /// `\ifhmode`
    HMode,
    /// `\ifmmode`
    MMode,
    /// `\ifinner`
    Inner,
}

impl std::fmt::Display for ConditionalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ConditionalKind::*;
        let name = match self {
            Num => "\\ifnum",
            Dim => "\\ifdim",
            Odd => "\\ifodd",
            X => "\\ifx",
            Char => "\\if",
            Cat => "\\ifcat",
            True => "\\iftrue",
            False => "\\iffalse",
            Case => "\\ifcase",
            Defined => "\\ifdefined",
            CsName => "\\ifcsname",
            VMode => "\\ifvmode",
            HMode => "\\ifhmode",
            MMode => "\\ifmmode",
            Inner => "\\ifinner",
        };
        write!(f, "{name}")
    }
}

/// The state of a conditional frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The operands of the condition are being read.
    Evaluating,
    /// A branch is being expanded.
    Expanding,
    /// Input is being discarded until the `\else` or the case selected by `ors_remaining`.
    SkippingToElse { ors_remaining: usize },
    /// Input is being discarded until the `\fi`.
    SkippingToTerminator,
}

/// An open conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: ConditionalKind,
    /// Whether a branch of this conditional has been taken.
    pub taken: bool,
    /// Whether the `\else` of this conditional has been seen.
    pub seen_else: bool,
    pub state: State,
}

impl Frame {
    fn new(kind: ConditionalKind) -> Frame {
        Frame {
            kind,
            taken: false,
            seen_else: false,
            state: State::Evaluating,
        }
    }
}

/// Which branch to expand.
enum Branch {
    True,
    False,
    Case(i32),
}

/// Opens a conditional: evaluates it and then skips to the branch that is to be expanded.
pub(crate) fn begin(
    token: Token,
    expander: &mut Expander,
    kind: ConditionalKind,
    negate: bool,
) -> error::Result<()> {
    expander.conditionals_mut().push(Frame::new(kind));
    let index = expander.conditional_depth() - 1;
    let branch = evaluate(token, expander, kind)?;
    let ors_remaining = match branch {
        Branch::True | Branch::False => {
            let result = matches!(branch, Branch::True) != negate;
            log::trace!("{} evaluated to {}", kind, result);
            if result {
                0
            } else {
                usize::MAX
            }
        }
        Branch::Case(n) => {
            log::trace!("{} selected case {}", kind, n);
            usize::try_from(n).unwrap_or(usize::MAX)
        }
    };
    let frame = match expander.conditionals_mut().get_mut(index) {
        Some(frame) => frame,
        None => return Err(frame_lost(expander, &token)),
    };
    if ors_remaining == 0 {
        frame.state = State::Expanding;
        frame.taken = true;
        return Ok(());
    }
    frame.state = State::SkippingToElse { ors_remaining };
    skip(token, expander)
}

fn frame_lost(expander: &Expander, token: &Token) -> Box<error::Error> {
    expander
        .error_at(
            Kind::FatalSyntax,
            "the conditional was closed while its condition was being evaluated",
            token,
        )
        .boxed()
}

fn evaluate(
    token: Token,
    expander: &mut Expander,
    kind: ConditionalKind,
) -> error::Result<Branch> {
    use ConditionalKind::*;
    let result = match kind {
        Num => {
            let a = parse::number(expander)?;
            let ordering = parse::relation(expander)?;
            let b = parse::number(expander)?;
            a.cmp(&b) == ordering
        }
        Dim => {
            let a = parse::dimension(expander)?;
            let ordering = parse::relation(expander)?;
            let b = parse::dimension(expander)?;
            a.cmp(&b) == ordering
        }
        Odd => parse::number(expander)? % 2 != 0,
        X => {
            let a = expander.next_unexpanded_or_err("reading the first token of \\ifx")?;
            let b = expander.next_unexpanded_or_err("reading the second token of \\ifx")?;
            tokens_have_same_meaning(expander, &a, &b)
        }
        Char | Cat => {
            let a = expander.next_expanded_or_err("reading the first operand of \\if")?;
            let a = char_and_cat_code(expander, &a);
            let b = expander.next_expanded_or_err("reading the second operand of \\if")?;
            let b = char_and_cat_code(expander, &b);
            match kind {
                Char => a.0 == b.0,
                _ => a.1 == b.1,
            }
        }
        True => true,
        False => false,
        Case => return Ok(Branch::Case(parse::number(expander)?)),
        Defined => {
            let t = expander.next_unexpanded_or_err("reading the operand of \\ifdefined")?;
            match t.command_ref() {
                None => true,
                Some(command_ref) => expander.command(&command_ref).is_some(),
            }
        }
        CsName => {
            let name = read_cs_name(token, expander)?;
            match expander.interner().get(&name) {
                None => false,
                Some(cs_name) => expander
                    .command(&CommandRef::ControlSequence(cs_name))
                    .is_some(),
            }
        }
        VMode => expander.mode().is_vertical(),
        HMode => expander.mode().is_horizontal(),
        MMode => expander.mode().is_math(),
        Inner => expander.mode().is_inner(),
    };
    Ok(if result { Branch::True } else { Branch::False })
}

/// Reads expanded character tokens up to `\endcsname` and returns the name they spell.
pub(crate) fn read_cs_name(token: Token, expander: &mut Expander) -> error::Result<String> {
    let mut name = String::new();
    loop {
        let next = expander.next_expanded_or_err("reading a control sequence name")?;
        match next.value() {
            Value::CommandRef(command_ref) => {
                if let Some(Tag::EndCsName) = expander.command(&command_ref).and_then(Command::tag)
                {
                    return Ok(name);
                }
                return Err(expander
                    .error_at(
                        Kind::FatalSyntax,
                        format![
                            "unexpected control sequence {} while reading the name for {}",
                            expander.render(&next),
                            expander.render(&token)
                        ],
                        &next,
                    )
                    .with_note("only character tokens may appear between \\csname and \\endcsname")
                    .boxed());
            }
            _ => {
                if let Some(c) = next.char() {
                    name.push(c);
                }
            }
        }
    }
}

/// Character code and category code of a token, as compared by `\if` and `\ifcat`.
///
/// Control sequences that are not character aliases compare equal to each other
///     and to no character.
fn char_and_cat_code(expander: &Expander, token: &Token) -> (Option<char>, Option<CatCode>) {
    match token.value() {
        Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
            match expander.command(&CommandRef::ControlSequence(cs_name)) {
                Some(Command::CharacterTokenAlias(value)) => {
                    let alias = Token::new(*value, token.trace_key());
                    (alias.char(), alias.cat_code())
                }
                _ => (None, None),
            }
        }
        _ => (token.char(), token.cat_code()),
    }
}

/// Whether two tokens have the same meaning, in the sense of `\ifx`.
fn tokens_have_same_meaning(expander: &Expander, a: &Token, b: &Token) -> bool {
    match (a.command_ref(), b.command_ref()) {
        (None, None) => a.value() == b.value(),
        (Some(a), Some(b)) => match (expander.command(&a), expander.command(&b)) {
            (None, None) => true,
            (Some(a), Some(b)) => a.meaning_eq(b),
            _ => false,
        },
        (Some(command_ref), None) => {
            character_alias_eq(expander.command(&command_ref), b.value())
        }
        (None, Some(command_ref)) => {
            character_alias_eq(expander.command(&command_ref), a.value())
        }
    }
}

fn character_alias_eq(command: Option<&Command>, value: Value) -> bool {
    matches!(command, Some(Command::CharacterTokenAlias(alias)) if *alias == value)
}

/// Discards input according to the state of the innermost frame.
fn skip(token: Token, expander: &mut Expander) -> error::Result<()> {
    let mut depth = 0_usize;
    loop {
        let next = match expander.next_unexpanded()? {
            None => {
                let kind = expander
                    .conditionals_mut()
                    .last()
                    .map(|frame| frame.kind.to_string())
                    .unwrap_or_default();
                return Err(expander
                    .error_at(
                        Kind::FatalSyntax,
                        "incomplete conditional",
                        &token,
                    )
                    .with_note(format![
                        "the input ended while skipping a branch of {kind}"
                    ])
                    .boxed());
            }
            Some(next) => next,
        };
        let command_ref = match next.command_ref() {
            None => continue,
            Some(command_ref) => command_ref,
        };
        expander.check_outer(&next, "skipping a conditional branch")?;
        let tag = expander.command(&command_ref).and_then(Command::tag);
        match tag {
            Some(Tag::Conditional(_)) => depth += 1,
            Some(Tag::Fi) => {
                if depth > 0 {
                    depth -= 1;
                    continue;
                }
                expander.conditionals_mut().pop();
                return Ok(());
            }
            Some(Tag::Else) if depth == 0 => {
                let frame = innermost(expander)?;
                if let State::SkippingToElse { .. } = frame.state {
                    frame.state = State::Expanding;
                    frame.taken = true;
                    frame.seen_else = true;
                    return Ok(());
                }
            }
            Some(Tag::Or) if depth == 0 => {
                let frame = innermost(expander)?;
                if let State::SkippingToElse { ors_remaining } = frame.state {
                    if frame.kind != ConditionalKind::Case {
                        let kind = frame.kind;
                        return Err(extra_or(expander, &next, Some(kind)));
                    }
                    let ors_remaining = ors_remaining.saturating_sub(1);
                    if ors_remaining == 0 {
                        frame.state = State::Expanding;
                        frame.taken = true;
                        return Ok(());
                    }
                    frame.state = State::SkippingToElse { ors_remaining };
                }
            }
            _ => {}
        }
    }
}

fn innermost(expander: &mut Expander) -> error::Result<&mut Frame> {
    expander.conditionals_mut().last_mut().ok_or_else(|| {
        error::Error::new(Kind::FatalSyntax, "the conditional stack is empty").boxed()
    })
}

fn extra_or(expander: &Expander, token: &Token, kind: Option<ConditionalKind>) -> Box<error::Error> {
    let err = expander.error_at(Kind::FatalSyntax, "extra \\or", token);
    match kind {
        Some(kind) => err.with_note(format!["\\or may only appear inside \\ifcase, but the current conditional is {kind}"]),
        None => err.with_note("there is no conditional open"),
    }
    .boxed()
}

/// Runs `\else`: the branch being expanded is complete, so skip to `\fi`.
pub(crate) fn else_primitive(token: Token, expander: &mut Expander) -> error::Result<()> {
    let frame = match expander.conditionals_mut().last_mut() {
        None => {
            return Err(expander
                .error_at(Kind::FatalSyntax, "extra \\else", &token)
                .with_note("there is no conditional open")
                .boxed())
        }
        Some(frame) => frame,
    };
    if frame.seen_else {
        return Err(expander
            .error_at(Kind::FatalSyntax, "extra \\else", &token)
            .with_note("this conditional already had an \\else branch")
            .boxed());
    }
    frame.seen_else = true;
    frame.state = State::SkippingToTerminator;
    skip(token, expander)
}

/// Runs `\or`: the case being expanded is complete, so skip to `\fi`.
pub(crate) fn or_primitive(token: Token, expander: &mut Expander) -> error::Result<()> {
    let frame = match expander.conditionals_mut().last_mut() {
        None => return Err(extra_or(expander, &token, None)),
        Some(frame) => frame,
    };
    if frame.kind != ConditionalKind::Case || frame.seen_else {
        let kind = frame.kind;
        return Err(extra_or(expander, &token, Some(kind)));
    }
    frame.state = State::SkippingToTerminator;
    skip(token, expander)
}

/// Runs `\fi`: closes the innermost conditional.
pub(crate) fn fi_primitive(token: Token, expander: &mut Expander) -> error::Result<()> {
    if expander.conditionals_mut().pop().is_none() {
        return Err(expander
            .error_at(Kind::FatalSyntax, "extra \\fi", &token)
            .with_note("there is no conditional open")
            .boxed());
    }
    Ok(())
}

/// Runs `\unless`: reads the next conditional and evaluates it with the result negated.
pub(crate) fn unless_primitive(token: Token, expander: &mut Expander) -> error::Result<()> {
    let next = expander.next_unexpanded_or_err("reading the conditional after \\unless")?;
    let tag = next
        .command_ref()
        .and_then(|command_ref| expander.command(&command_ref))
        .and_then(Command::tag);
    match tag {
        Some(Tag::Conditional(kind)) if kind != ConditionalKind::Case => {
            begin(next, expander, kind, true)
        }
        _ => Err(expander
            .error_at(
                Kind::FatalSyntax,
                format![
                    "you can't use \\unless before {}",
                    expander.render(&next)
                ],
                &token,
            )
            .with_note("\\unless must be followed by a boolean conditional like \\ifnum")
            .boxed()),
    }
}
