//! Implementation of TeX user defined macros.
//!
//! A macro has a parameter text and a replacement text.
//! The parameter text is a prefix of literal tokens followed by up to 9 parameters,
//!     each of which is either undelimited or delimited by the literal tokens
//!     that follow it in the parameter text.
//! The replacement text is a list of tokens interleaved with references to the parameters.
//!
//! Matching is performed against the unexpanded input stream.
//! The result of substituting the arguments into the replacement text is pushed onto
//!     the expander's stack of pending tokens, so no native recursion is involved
//!     when a macro expands to another macro invocation.

use crate::error::{self, Error, Kind};
use crate::expander::Expander;
use crate::matcher::Matcher;
use crate::token::{Token, Value};

/// Flags that alter how a macro is expanded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags {
    /// The arguments of the macro may contain `\par`.
    pub long: bool,
    /// The macro may not appear in arguments, parameter texts, replacement texts
    ///     or skipped conditional branches.
    pub outer: bool,
    /// The macro is not expanded inside `\edef` and `\xdef`.
    pub protected: bool,
}

/// A user-defined macro: parameter text, replacement text and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Macro {
    prefix: Vec<Token>,
    parameters: Vec<Parameter>,
    replacements: Vec<Replacement>,
    flags: Flags,
}

/// One piece of a replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Replacement {
    Tokens(Vec<Token>),
    /// The argument for the parameter with this zero-based index.
    Parameter(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parameter {
    Undelimited,
    Delimited(Matcher<Value>),
}

impl Macro {
    pub fn new(
        prefix: Vec<Token>,
        parameters: Vec<Parameter>,
        replacements: Vec<Replacement>,
        flags: Flags,
    ) -> Macro {
        Macro {
            prefix,
            parameters,
            replacements,
            flags,
        }
    }

    pub fn prefix(&self) -> &[Token] {
        &self.prefix
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Matches the parameter text against the upcoming tokens and pushes the
    ///     substituted replacement text in front of the remaining stream.
    pub fn call(&self, token: Token, expander: &mut Expander) -> error::Result<()> {
        expander.enter_macro(token);
        let result = self.read_arguments(token, expander);
        expander.exit_macro();
        let (argument_tokens, argument_indices) = result?;
        let arguments: Vec<&[Token]> = argument_indices
            .iter()
            .map(|(i, j)| &argument_tokens[*i..*j])
            .collect();
        let num_tokens = substitute(&self.replacements, &arguments, expander.expansions_mut());
        log::trace!(
            "expanded {} into {} tokens",
            expander.render(&token),
            num_tokens
        );
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn read_arguments(
        &self,
        token: Token,
        expander: &mut Expander,
    ) -> error::Result<(Vec<Token>, Vec<(usize, usize)>)> {
        for prefix_token in &self.prefix {
            let stream_token = self.next_argument_token(token, expander, 0)?;
            if stream_token.value() != prefix_token.value() {
                return Err(mismatch(
                    expander,
                    token,
                    format!["use of {} doesn't match its definition", expander.render(&token)],
                )
                .with_note(format![
                    "expected `{}` but found `{}`",
                    expander.render(prefix_token),
                    expander.render(&stream_token)
                ])
                .with_trace(expander.trace(&stream_token))
                .boxed());
            }
        }
        let mut argument_tokens = Vec::new();
        let mut argument_indices = Vec::with_capacity(self.parameters.len());
        for (i, parameter) in self.parameters.iter().enumerate() {
            let start_index = argument_tokens.len();
            let trim_outer_braces = match parameter {
                Parameter::Undelimited => {
                    self.read_undelimited_argument(token, expander, i + 1, &mut argument_tokens)?;
                    false
                }
                Parameter::Delimited(matcher) => self.read_delimited_argument(
                    token,
                    expander,
                    matcher,
                    i + 1,
                    &mut argument_tokens,
                )?,
            };
            argument_indices.push(match trim_outer_braces {
                true => (start_index + 1, argument_tokens.len() - 1),
                false => (start_index, argument_tokens.len()),
            });
        }
        Ok((argument_tokens, argument_indices))
    }

    fn next_argument_token(
        &self,
        token: Token,
        expander: &mut Expander,
        param_num: usize,
    ) -> error::Result<Token> {
        let next = match expander.next_unexpanded()? {
            None => {
                let title = match param_num {
                    0 => format![
                        "the input ended while matching the prefix of {}",
                        expander.render(&token)
                    ],
                    n => format![
                        "the input ended while reading argument #{} of {}",
                        n,
                        expander.render(&token)
                    ],
                };
                return Err(mismatch(expander, token, title).boxed());
            }
            Some(next) => next,
        };
        expander.check_outer(&next, "reading a macro argument")?;
        if !self.flags.long && expander.is_par(&next) {
            return Err(mismatch(
                expander,
                token,
                format![
                    "paragraph ended before {} was complete",
                    expander.render(&token)
                ],
            )
            .with_note("only macros defined with \\long may have \\par in their arguments")
            .with_trace(expander.trace(&next))
            .boxed());
        }
        Ok(next)
    }

    fn read_undelimited_argument(
        &self,
        token: Token,
        expander: &mut Expander,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> error::Result<()> {
        let first = loop {
            let next = self.next_argument_token(token, expander, param_num)?;
            if !matches!(next.value(), Value::Space(_)) {
                break next;
            }
        };
        match first.value() {
            Value::BeginGroup(_) => (),
            Value::EndGroup(_) => {
                return Err(extra_end_group(expander, token, first));
            }
            _ => {
                result.push(first);
                return Ok(());
            }
        }
        let mut depth = 0_usize;
        loop {
            let next = self.next_argument_token(token, expander, param_num)?;
            match next.value() {
                Value::BeginGroup(_) => depth += 1,
                Value::EndGroup(_) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => (),
            }
            result.push(next);
        }
    }

    fn read_delimited_argument(
        &self,
        token: Token,
        expander: &mut Expander,
        matcher: &Matcher<Value>,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> error::Result<bool> {
        let mut search = matcher.start();
        let mut depth = 0_usize;
        // A delimiter ending in `{` (from `#{`) is matched with that brace still open.
        let depth_at_delimiter = match matcher.substring().last() {
            Some(Value::BeginGroup(_)) => 1,
            _ => 0,
        };
        let start = result.len();
        loop {
            let next = self.next_argument_token(token, expander, param_num)?;
            match next.value() {
                Value::BeginGroup(_) => depth += 1,
                Value::EndGroup(_) if depth == 0 => {
                    return Err(extra_end_group(expander, token, next));
                }
                Value::EndGroup(_) => depth -= 1,
                _ => (),
            };
            let found = search.next(&next.value());
            result.push(next);
            if found && depth == depth_at_delimiter {
                result.truncate(result.len() - matcher.substring().len());
                return Ok(should_trim_outer_braces(&result[start..]));
            }
        }
    }
}

/// Pushes the replacement text, with arguments substituted, onto a stack of pending tokens.
///
/// The stack is popped from the end, so the text goes on reversed.
/// Returns the number of tokens pushed.
fn substitute(replacements: &[Replacement], arguments: &[&[Token]], stack: &mut Vec<Token>) -> usize {
    fn piece<'a>(replacement: &'a Replacement, arguments: &[&'a [Token]]) -> &'a [Token] {
        match replacement {
            Replacement::Tokens(tokens) => tokens,
            Replacement::Parameter(i) => arguments.get(*i).copied().unwrap_or(&[]),
        }
    }
    let len: usize = replacements.iter().map(|r| piece(r, arguments).len()).sum();
    stack.reserve(len);
    for replacement in replacements.iter().rev() {
        stack.extend(piece(replacement, arguments).iter().rev().copied());
    }
    len
}

/// Whether the argument is a single group `{...}` whose braces should be removed.
fn should_trim_outer_braces(list: &[Token]) -> bool {
    if list.len() <= 1 {
        return false;
    }
    if !matches!(list[0].value(), Value::BeginGroup(_)) {
        return false;
    }
    if !matches!(list[list.len() - 1].value(), Value::EndGroup(_)) {
        return false;
    }
    // The braces must match each other: `{a}{b}` is not trimmed.
    let mut depth = 0_usize;
    for token in &list[..list.len() - 1] {
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                depth -= 1;
                if depth == 0 {
                    return false;
                }
            }
            _ => (),
        }
    }
    true
}

fn mismatch(expander: &Expander, token: Token, title: String) -> Error {
    Error::new(Kind::MacroArgumentMismatch, title)
        .with_token(expander.render(&token))
        .with_trace(expander.trace(&token))
}

fn extra_end_group(expander: &Expander, token: Token, end_group: Token) -> Box<Error> {
    Error::new(
        Kind::MacroArgumentMismatch,
        format!["argument of {} has an extra }}", expander.render(&token)],
    )
    .with_token(expander.render(&token))
    .with_note("macro arguments must have balanced braces")
    .with_trace(expander.trace(&end_group))
    .boxed()
}

/// A stream of raw tokens from which definitions are parsed.
pub(crate) trait RawTokens {
    fn next_raw(&mut self) -> error::Result<Option<Token>>;
}

impl RawTokens for std::vec::IntoIter<Token> {
    fn next_raw(&mut self) -> error::Result<Option<Token>> {
        Ok(self.next())
    }
}

/// The parsed parameter text of a definition.
pub(crate) struct ParameterText {
    pub prefix: Vec<Token>,
    pub parameters: Vec<Parameter>,
    /// Set when the parameter text ended with `#{`.
    pub replacement_end_token: Option<Token>,
}

fn char_to_parameter_index(c: char) -> Option<usize> {
    match c {
        '1'..='9' => c.to_digit(10).map(|d| d as usize - 1),
        _ => None,
    }
}

fn syntax_error<S: Into<String>>(title: S) -> Error {
    Error::new(Kind::FatalSyntax, title)
}

const PARAMETER_NOTE: &str =
    "a parameter token must be followed by a single digit number, another parameter token, or a begin group token";

/// Parses a parameter text, consuming the `{` that ends it.
pub(crate) fn parse_parameter_text(stream: &mut dyn RawTokens) -> error::Result<ParameterText> {
    let mut prefix = Vec::new();
    let mut raw_parameters: Vec<Vec<Value>> = Vec::new();
    let mut replacement_end_token = None;
    loop {
        let token = match stream.next_raw()? {
            None => {
                return Err(syntax_error(
                    "unexpected end of input while reading the parameter text of a macro",
                )
                .with_note("the parameter text of a macro must end with a begin group token")
                .boxed())
            }
            Some(token) => token,
        };
        match token.value() {
            Value::BeginGroup(_) => break,
            Value::EndGroup(_) => {
                return Err(syntax_error(
                    "unexpected end group token while parsing the parameter text of a macro",
                )
                .boxed());
            }
            Value::Parameter(_) => {
                let parameter_token = match stream.next_raw()? {
                    None => {
                        return Err(syntax_error(
                            "unexpected end of input while reading the token after a parameter token",
                        )
                        .with_note(PARAMETER_NOTE)
                        .boxed())
                    }
                    Some(token) => token,
                };
                if let Value::BeginGroup(_) = parameter_token.value() {
                    // In this case we end the group according to the special #{ rule
                    replacement_end_token = Some(parameter_token);
                    match raw_parameters.last_mut() {
                        None => prefix.push(parameter_token),
                        Some(delimiter) => delimiter.push(parameter_token.value()),
                    }
                    break;
                }
                let parameter_index = parameter_token.char().and_then(char_to_parameter_index);
                match parameter_index {
                    Some(n) if n == raw_parameters.len() => raw_parameters.push(vec![]),
                    Some(n) => {
                        return Err(syntax_error(format![
                            "unexpected parameter number {}",
                            n + 1
                        ])
                        .with_note(format![
                            "this macro has {} parameter(s) so far, so parameter number #{} was expected",
                            raw_parameters.len(),
                            raw_parameters.len() + 1
                        ])
                        .boxed());
                    }
                    None => {
                        return Err(syntax_error("unexpected token after a parameter token")
                            .with_note(PARAMETER_NOTE)
                            .boxed());
                    }
                }
            }
            value => match raw_parameters.last_mut() {
                None => prefix.push(token),
                Some(delimiter) => delimiter.push(value),
            },
        }
    }
    let parameters = raw_parameters
        .into_iter()
        .map(|delimiter| match Matcher::new(delimiter) {
            None => Parameter::Undelimited,
            Some(matcher) => Parameter::Delimited(matcher),
        })
        .collect();
    Ok(ParameterText {
        prefix,
        parameters,
        replacement_end_token,
    })
}

/// Parses a replacement text, consuming the `}` that ends it.
pub(crate) fn parse_replacement_text(
    stream: &mut dyn RawTokens,
    final_token: Option<Token>,
    num_parameters: usize,
) -> error::Result<Vec<Replacement>> {
    let mut result = vec![];
    let mut scope_depth = 0_usize;
    let push = |result: &mut Vec<Replacement>, token| match result.last_mut() {
        Some(Replacement::Tokens(tokens)) => {
            tokens.push(token);
        }
        _ => {
            result.push(Replacement::Tokens(vec![token]));
        }
    };

    while let Some(token) = stream.next_raw()? {
        match token.value() {
            Value::BeginGroup(_) => {
                scope_depth += 1;
            }
            Value::EndGroup(_) => {
                if scope_depth == 0 {
                    if let Some(final_token) = final_token {
                        push(&mut result, final_token);
                    }
                    return Ok(result);
                }
                scope_depth -= 1;
            }
            Value::Parameter(_) => {
                let parameter_token = match stream.next_raw()? {
                    None => break,
                    Some(token) => token,
                };
                if let Value::Parameter(_) = parameter_token.value() {
                    push(&mut result, parameter_token);
                    continue;
                }
                let parameter_index = parameter_token.char().and_then(char_to_parameter_index);
                match parameter_index {
                    Some(n) if n < num_parameters => {
                        result.push(Replacement::Parameter(n));
                        continue;
                    }
                    _ => {
                        return Err(syntax_error(
                            "unexpected token while reading a parameter number",
                        )
                        .with_note(match num_parameters {
                            0 => "this macro has no parameters".to_string(),
                            1 => "expected the number 1 because this macro has 1 parameter"
                                .to_string(),
                            n => format![
                                "expected a number between 1 and {n} inclusive because this macro has {n} parameters"
                            ],
                        })
                        .boxed());
                    }
                }
            }
            _ => {}
        }
        push(&mut result, token);
    }
    Err(
        syntax_error("unexpected end of input while reading the replacement text of a macro")
            .boxed(),
    )
}
