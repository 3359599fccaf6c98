//! Macro definitions: `\def`, `\gdef`, `\edef`, `\xdef`, the prefixes and `\let`.
//!
//! The prefixes `\global`, `\long`, `\outer` and `\protected` may be combined in any order.
//! They are accumulated into a [Prefix] until the definition they apply to is reached.
//! `\global` may also precede `\let`; the other prefixes may not.

use crate::command::{BuiltIn, Command, PrefixKind, Scope, Tag};
use crate::error::{self, Kind};
use crate::expander::Expander;
use crate::parse;
use crate::texmacro::{self, Flags, Macro};
use crate::token::{Token, Value};
use std::rc::Rc;

pub const DEF_DOC: &str = "Define a macro";
pub const GDEF_DOC: &str = "Define a macro globally";
pub const EDEF_DOC: &str = "Define a macro, expanding its replacement text";
pub const XDEF_DOC: &str = "Define a macro globally, expanding its replacement text";
pub const LET_DOC: &str = "Assign a command or character to a control sequence";

pub fn get_def() -> BuiltIn {
    BuiltIn::new_execution(def_primitive_fn)
        .with_tag(Tag::Definition {
            global: false,
            expanded: false,
        })
        .with_doc(DEF_DOC)
}

pub fn get_gdef() -> BuiltIn {
    BuiltIn::new_execution(gdef_primitive_fn)
        .with_tag(Tag::Definition {
            global: true,
            expanded: false,
        })
        .with_doc(GDEF_DOC)
}

pub fn get_edef() -> BuiltIn {
    BuiltIn::new_execution(edef_primitive_fn)
        .with_tag(Tag::Definition {
            global: false,
            expanded: true,
        })
        .with_doc(EDEF_DOC)
}

pub fn get_xdef() -> BuiltIn {
    BuiltIn::new_execution(xdef_primitive_fn)
        .with_tag(Tag::Definition {
            global: true,
            expanded: true,
        })
        .with_doc(XDEF_DOC)
}

pub fn get_global() -> BuiltIn {
    BuiltIn::new_execution(global_primitive_fn)
        .with_tag(Tag::Prefix(PrefixKind::Global))
        .with_doc("Make the next definition global")
}

pub fn get_long() -> BuiltIn {
    BuiltIn::new_execution(long_primitive_fn)
        .with_tag(Tag::Prefix(PrefixKind::Long))
        .with_doc("Allow the arguments of the next macro defined to contain \\par")
}

pub fn get_outer() -> BuiltIn {
    BuiltIn::new_execution(outer_primitive_fn)
        .with_tag(Tag::Prefix(PrefixKind::Outer))
        .with_doc("Forbid the next macro defined from appearing in arguments and skipped text")
}

pub fn get_protected() -> BuiltIn {
    BuiltIn::new_execution(protected_primitive_fn)
        .with_tag(Tag::Prefix(PrefixKind::Protected))
        .with_doc("Prevent the next macro defined from being expanded inside \\edef")
}

pub fn get_let() -> BuiltIn {
    BuiltIn::new_execution(let_primitive_fn)
        .with_tag(Tag::Let)
        .with_doc(LET_DOC)
}

/// Prefixes accumulated before a definition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub global: bool,
    pub flags: Flags,
}

impl Prefix {
    fn add(&mut self, kind: PrefixKind) {
        match kind {
            PrefixKind::Global => self.global = true,
            PrefixKind::Long => self.flags.long = true,
            PrefixKind::Outer => self.flags.outer = true,
            PrefixKind::Protected => self.flags.protected = true,
        }
    }

    fn scope(&self) -> Scope {
        if self.global {
            Scope::Global
        } else {
            Scope::Local
        }
    }
}

fn def_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    define(token, expander, Prefix::default(), false, false)
}

fn gdef_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    define(token, expander, Prefix::default(), true, false)
}

fn edef_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    define(token, expander, Prefix::default(), false, true)
}

fn xdef_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    define(token, expander, Prefix::default(), true, true)
}

fn global_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    process_prefixes(token, expander, PrefixKind::Global)
}

fn long_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    process_prefixes(token, expander, PrefixKind::Long)
}

fn outer_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    process_prefixes(token, expander, PrefixKind::Outer)
}

fn protected_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    process_prefixes(token, expander, PrefixKind::Protected)
}

fn process_prefixes(token: Token, expander: &mut Expander, first: PrefixKind) -> error::Result<()> {
    let mut prefix = Prefix::default();
    prefix.add(first);
    loop {
        let next = expander.next_expanded_or_err("reading the command after a prefix")?;
        let tag = next
            .command_ref()
            .and_then(|command_ref| expander.command(&command_ref))
            .and_then(Command::tag);
        match tag {
            Some(Tag::Prefix(kind)) => prefix.add(kind),
            Some(Tag::Definition { global, expanded }) => {
                return define(next, expander, prefix, global, expanded);
            }
            Some(Tag::Let) if prefix.flags == Flags::default() => {
                return let_assignment(next, expander, prefix.scope());
            }
            _ => {
                return Err(expander
                    .error_at(
                        Kind::FatalSyntax,
                        format![
                            "you can't use a prefix with {}",
                            expander.render(&next)
                        ],
                        &next,
                    )
                    .with_note(format![
                        "the prefix {} must be followed by a definition",
                        expander.render(&token)
                    ])
                    .with_note("\\global may also be followed by \\let")
                    .boxed());
            }
        }
    }
}

/// Defines a macro.
///
/// `token` is the definition command, like `\def`.
pub fn define(
    token: Token,
    expander: &mut Expander,
    prefix: Prefix,
    global: bool,
    expanded: bool,
) -> error::Result<()> {
    let target = expander.next_unexpanded_or_err("reading the name of a macro")?;
    let command_ref = match target.command_ref() {
        Some(command_ref) => command_ref,
        None => {
            return Err(expander
                .error_at(
                    Kind::FatalSyntax,
                    format![
                        "unexpected target {} for {}",
                        expander.render(&target),
                        expander.render(&token)
                    ],
                    &target,
                )
                .with_note("the target of a definition must be a control sequence or an active character")
                .boxed());
        }
    };
    let parameter_text = texmacro::parse_parameter_text(expander)
        .map_err(|err| locate(expander, err, &token))?;
    let num_parameters = parameter_text.parameters.len();
    let replacements = if expanded {
        let body = expanded_body(expander)?;
        texmacro::parse_replacement_text(
            &mut body.into_iter(),
            parameter_text.replacement_end_token,
            num_parameters,
        )
    } else {
        texmacro::parse_replacement_text(
            expander,
            parameter_text.replacement_end_token,
            num_parameters,
        )
    }
    .map_err(|err| locate(expander, err, &token))?;
    let definition = Macro::new(
        parameter_text.prefix,
        parameter_text.parameters,
        replacements,
        prefix.flags,
    );
    let scope = if global {
        Scope::Global
    } else {
        prefix.scope()
    };
    expander.define_command(command_ref, Command::Macro(Rc::new(definition)), scope);
    Ok(())
}

fn locate(expander: &Expander, mut err: Box<error::Error>, token: &Token) -> Box<error::Error> {
    if err.trace().is_none() {
        *err = (*err).clone().with_token(expander.render(token)).with_trace(expander.trace(token));
    }
    err
}

/// Reads the replacement text of `\edef`, up to and including the closing brace,
///     expanding everything except protected macros and tokens after `\noexpand`.
fn expanded_body(expander: &mut Expander) -> error::Result<Vec<Token>> {
    let mut result = vec![];
    let mut depth = 0_usize;
    loop {
        let token = match expander.next_expanded_unprotected()? {
            None => return Err(expander.end_of_input("reading the replacement text of a macro")),
            Some(token) => token,
        };
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                if depth == 0 {
                    result.push(token);
                    return Ok(result);
                }
                depth -= 1;
            }
            _ => {}
        }
        result.push(token);
    }
}

fn let_primitive_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    let_assignment(token, expander, Scope::Local)
}

fn let_assignment(token: Token, expander: &mut Expander, scope: Scope) -> error::Result<()> {
    let target = expander.next_unexpanded_or_err("reading the target of \\let")?;
    let command_ref = match target.command_ref() {
        Some(command_ref) => command_ref,
        None => {
            return Err(expander
                .error_at(
                    Kind::FatalSyntax,
                    format![
                        "unexpected target {} for {}",
                        expander.render(&target),
                        expander.render(&token)
                    ],
                    &target,
                )
                .with_note("the target of \\let must be a control sequence or an active character")
                .boxed());
        }
    };
    parse::optional_equals_unexpanded(expander)?;
    let value = expander.next_unexpanded_or_err("reading the right hand side of \\let")?;
    match value.value() {
        Value::CommandRef(value_ref) => match expander.command(&value_ref).cloned() {
            None => expander.undefine(command_ref, scope),
            Some(command) => expander.define_command(command_ref, command, scope),
        },
        value => expander.define_command(command_ref, Command::CharacterTokenAlias(value), scope),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use texpand_testing::*;

    test_suite![
        expansion_equality_tests(
            (def_parsed_successfully, r"\def\A{abc}", ""),
            (output_is_correct, r"\def\A{abc}\A", "abc"),
            (output_twice, r"\def\A{abc}\A\A", "abcabc"),
            (one_undelimited_parameter, r"\def\A#1{a-#1-b}\A1", "a-1-b"),
            (bracketed_parameter, r"\def\A#1{[#1]}\A x", "[x]"),
            (double, r"\def\double#1{#1#1}\double{ab}", "abab"),
            (
                one_undelimited_parameter_multiple_times,
                r"\def\A#1{#1 #1 #1}\A1",
                "1 1 1"
            ),
            (
                one_undelimited_parameter_multiple_tokens,
                r"\def\A#1{a-#1-b}\A{123}",
                "a-123-b"
            ),
            (two_undelimited_parameters, r"\def\A#1#2{#2-#1}\A56", "6-5"),
            (
                two_undelimited_parameters_multiple_token_inputs,
                r"\def\A#1#2{#2-#1}\A{abc}{xyz}",
                "xyz-abc"
            ),
            (undelimited_parameter_skips_spaces, r"\def\A#1{(#1)}\A   x", "(x)"),
            (consume_prefix_correctly, r"\def\A fgh{567}\A fghi", "567i"),
            (
                one_undelimited_parameter_with_prefix,
                r"\def\A abc#1{y#1z}\A abcdefg",
                "ydzefg"
            ),
            (one_delimited_parameter, r"\def\A #1xxx{y#1z}\A abcxxx", "yabcz"),
            (one_delimited_parameter_empty, r"\def\A #1xxx{y#1z}\A xxx", "yz"),
            (
                one_delimited_parameter_with_scope,
                r"\def\A #1xxx{#1}\A abc{123xxx}xxx",
                "abc{123xxx}"
            ),
            (
                two_delimited_parameters_with_prefix,
                r"\def\A a#1c#2e{x#2y#1z}\A abcdef",
                "xdybzf"
            ),
            (
                one_delimited_parameter_grouped_value,
                r"\def\A #1c{x#1y}\A {Hello}c",
                "xHelloy"
            ),
            (
                delimited_parameter_keeps_unmatched_braces,
                r"\def\A #1c{x#1y}\A {a}{b}c",
                "x{a}{b}y"
            ),
            (
                partial_delimiter_match,
                r"\def\A #1abc{[#1]}\A aababc",
                "[aab]"
            ),
            (
                parameter_brace_special_case,
                r"\def\A #{Mint says }\A{hello}",
                "Mint says {hello}"
            ),
            (
                parameter_brace_special_case_with_parameter,
                r"\def\A #1#{[#1]}\A abc{d}",
                "[abc]{d}"
            ),
            (double_parameter_token, r"\def\A{\def\B##1{(##1)}}\A\B x", "(x)"),
            (grouping, r"\def\A{Hello}\A{\def\A{World}\A}\A", "Hello{World}Hello"),
            (gdef_survives_group, r"{\gdef\A{World}}\A", "{}World"),
            (global_def_survives_group, r"{\global\def\A{World}}\A", "{}World"),
            (
                begingroup_scope,
                r"\def\A{a}\begingroup\def\A{b}\A\endgroup\A",
                "ba"
            ),
            (
                texbook_exercise_20_1,
                r"\def\mustnt{I must not talk in class.}\def\five{\mustnt\mustnt\mustnt\mustnt\mustnt}\def\twenty{\five\five\five\five}\def\punishment{\twenty\twenty\twenty\twenty\twenty}\punishment",
                "I must not talk in class.".repeat(100)
            ),
            (
                texbook_exercise_20_2,
                r"\def\a{\b}\def\b{A\def\a{B\def\a{C\def\a{\b}}}}\def\puzzle{\a\a\a\a\a}\puzzle",
                "ABCAB"
            ),
            (
                texbook_exercise_20_3,
                r"\def\row#1{(#1_1,\ldots,#1_n)}\def\ldots{...}\row x",
                "(x_1,...,x_n)"
            ),
            (edef_expands_body, r"\def\a{x}\edef\b{\a\a}\def\a{y}\b", "xx"),
            (edef_parameters, r"\def\a{x}\edef\b#1{#1\a}\def\a{y}\b z", "zx"),
            (
                edef_noexpand,
                r"\def\a{x}\edef\b{\noexpand\a\a}\def\a{y}\b",
                "yx"
            ),
            (
                edef_protected,
                r"\protected\def\a{x}\edef\b{\a}\def\a{y}\b",
                "y"
            ),
            (
                xdef_survives_group,
                r"\def\a{x}{\xdef\b{\a}}\b",
                "{}x"
            ),
            (long_allows_par, "\\long\\def\\a#1{(#1)}\\a{x\n\ny}", "(x \\par y)"),
            (
                combined_prefixes,
                r"{\long\global\outer\def\a#1{(#1)}}\a x",
                "{}(x)"
            ),
            (let_macro, r"\def\a{x}\let\b\a\def\a{y}\b\a", "xy"),
            (let_with_equals, r"\def\a{x}\let\b = \a\b", "x"),
            (let_character, r"\let\b=z\b", "z"),
            (let_begin_group, r"\let\bgroup={\def\a{x}\bgroup\def\a{y}\a}\a", "{y}x"),
            (let_undefined, r"\def\a{x}\let\a\undefined\ifdefined\a y\else n\fi", "n"),
            (let_undefined_then_def_in_group, r"\def\a{y}{\let\a\undefined\def\a{z}}\a", "{}y"),
            (global_let, r"\def\a{x}{\global\let\b\a}\b", "{}x"),
            (active_character_macro, r"\def~{x}~", "x"),
        ),
        failure_tests(
            (end_of_input_scanning_target, r"\def", EndOfInput),
            (end_of_input_scanning_argument_text, r"\def\A", FatalSyntax),
            (end_of_input_scanning_replacement, r"\def\A{", FatalSyntax),
            (end_of_input_scanning_nested_replacement, r"\def\A{{}", FatalSyntax),
            (end_of_input_reading_parameter_number, r"\def\A#", FatalSyntax),
            (end_of_input_scanning_argument, r"\def\A#1{} \A", MacroArgumentMismatch),
            (
                end_of_input_scanning_delimiter,
                r"\def\A#1x{} \A abc",
                MacroArgumentMismatch
            ),
            (end_of_input_reading_prefix, r"\def\A abc{} \A ab", MacroArgumentMismatch),
            (unexpected_token_reading_prefix, r"\def\A abc{} \A abd", MacroArgumentMismatch),
            (unexpected_parameter_number, r"\def\A#2{}", FatalSyntax),
            (unexpected_parameter_token, r"\def\A#a{}", FatalSyntax),
            (unexpected_parameter_number_in_body, r"\def\A#1{#2}", FatalSyntax),
            (unexpected_parameter_in_body, r"\def\A{#1}", FatalSyntax),
            (unexpected_end_group_in_parameter_text, r"\def\A#1}{}", FatalSyntax),
            (invalid_target, r"\def a{}", FatalSyntax),
            (extra_end_group_in_argument, r"\def\A#1x{}\A a}x", MacroArgumentMismatch),
            (
                extra_end_group_in_undelimited_argument,
                r"\def\A#1{}\A}",
                MacroArgumentMismatch
            ),
            (par_in_short_argument, "\\def\\a#1{(#1)}\\a{x\n\ny}", MacroArgumentMismatch),
            (
                par_in_short_delimited_argument,
                "\\def\\a#1.{(#1)}\\a x\n\ny.",
                MacroArgumentMismatch
            ),
            (outer_in_argument, r"\outer\def\o{}\def\a#1{}\a\o", OuterInPreamble),
            (outer_in_definition, r"\outer\def\o{}\def\a{\o}", OuterInPreamble),
            (outer_in_edef, r"\outer\def\o{}\edef\a{\o}", OuterInPreamble),
            (prefix_before_character, r"\global a", FatalSyntax),
            (long_let, r"\long\let\a\b", FatalSyntax),
            (undefined_macro, r"\a", UndefinedControlSequence),
            (self_reference, r"\def\a{\a}\a", ExpansionDepthExceeded),
            (mutual_recursion, r"\def\a{\b}\def\b{\a}\a", ExpansionDepthExceeded),
            (growing_recursion, r"\def\a{\a x}\a", ExpansionDepthExceeded),
        ),
    ];
}
