//! Commands that alter the expansion process, and grouping.

use crate::command::{BuiltIn, Command, Scope, Tag};
use crate::conditional::read_cs_name;
use crate::error::{self, Kind};
use crate::expander::Expander;
use crate::token::{CommandRef, Token, Value};

pub fn get_noexpand() -> BuiltIn {
    BuiltIn::new_expansion(noexpand_fn).with_doc("Prevent the next token from being expanded")
}

fn noexpand_fn(_: Token, expander: &mut Expander) -> error::Result<()> {
    let next = expander.next_unexpanded_or_err("expanding \\noexpand")?;
    expander.back_input(next);
    expander.suppress_next_expansion();
    Ok(())
}

pub fn get_expandafter() -> BuiltIn {
    BuiltIn::new_expansion(expandafter_fn)
        .with_doc("Expand the token after the next token, and then the next token")
}

fn expandafter_fn(expandafter_token: Token, expander: &mut Expander) -> error::Result<()> {
    let next = expander.next_unexpanded_or_err("reading the first token after \\expandafter")?;
    match expander.next_unexpanded()? {
        None => {
            return Err(expander
                .error_at(
                    Kind::EndOfInput,
                    "the input ended while reading the second token after \\expandafter",
                    &expandafter_token,
                )
                .with_note("\\expandafter must be followed by two tokens")
                .boxed())
        }
        Some(second) => expander.back_input(second),
    }
    expander.expand_once()?;
    expander.back_input(next);
    Ok(())
}

pub fn get_csname() -> BuiltIn {
    BuiltIn::new_expansion(csname_fn)
        .with_doc("Build a control sequence from the characters up to \\endcsname")
}

fn csname_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    let name = read_cs_name(token, expander)?;
    let cs_name = expander.interner_mut().get_or_intern(&name);
    let command_ref = CommandRef::ControlSequence(cs_name);
    if expander.command(&command_ref).is_none() {
        expander.define_command(command_ref, Command::Unexpandable("relax"), Scope::Local);
    }
    expander.back_input(Token::new_control_sequence(cs_name, token.trace_key()));
    Ok(())
}

pub fn get_endcsname() -> BuiltIn {
    BuiltIn::new_execution(endcsname_fn)
        .with_tag(Tag::EndCsName)
        .with_doc("End the name started by \\csname")
}

fn endcsname_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    Err(expander
        .error_at(Kind::FatalSyntax, "extra \\endcsname", &token)
        .with_note("\\endcsname may only appear after \\csname or \\ifcsname")
        .boxed())
}

pub fn get_string() -> BuiltIn {
    BuiltIn::new_expansion(string_fn).with_doc("Convert the next token to character tokens")
}

fn string_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    let next = expander.next_unexpanded_or_err("reading the token after \\string")?;
    let s = match next.value() {
        Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
            format!["\\{}", expander.interner().resolve(cs_name)]
        }
        _ => match next.char() {
            Some(c) => c.to_string(),
            None => String::new(),
        },
    };
    let key = token.trace_key();
    let tokens = expander.expansions_mut();
    for c in s.chars().rev() {
        tokens.push(match c {
            ' ' => Token::new_space(c, key),
            _ => Token::new_other(c, key),
        });
    }
    Ok(())
}

pub fn get_begingroup() -> BuiltIn {
    BuiltIn::new_execution(begingroup_fn).with_doc("Begin a group")
}

fn begingroup_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    expander.begin_semisimple_group(&token)
}

pub fn get_endgroup() -> BuiltIn {
    BuiltIn::new_execution(endgroup_fn).with_doc("End a group begun by \\begingroup")
}

fn endgroup_fn(token: Token, expander: &mut Expander) -> error::Result<()> {
    expander.end_semisimple_group(&token)
}
