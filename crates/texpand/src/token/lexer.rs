//! A reference TeX lexer, which reads input strings and outputs TeX tokens.
//!
//! Tokenization is not part of the expander proper: the expander pulls tokens from any
//!     [TokenSource](crate::source::TokenSource).
//! This lexer is the source used by the command line tool and by unit tests.
//! It implements the state machine of TeX.2021.343-356:
//!     spaces are skipped at the start of lines and after control words,
//!     a blank line becomes `\par`,
//!     and `%` comments run to the end of the line.
//!
//! Unlike TeX, no end-of-line character is appended to a final line that
//!     has no trailing new line.

use super::catcode::CatCode;
use super::trace;
use super::{CsNameInterner, Token, Value};
use crate::error;
use crate::source::TokenSource;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NewLine,
    MidLine,
    SkipBlanks,
}

/// The Texpand lexer
#[derive(Debug)]
pub struct Lexer {
    file_name: String,
    source_code: String,
    pos: usize,
    state: State,
    cat_codes: HashMap<char, CatCode>,
    // We read control sequence names into a shared buffer to avoid allocating for each one.
    buffer: String,
}

impl Lexer {
    pub fn new<S: Into<String>>(file_name: &str, source_code: S) -> Lexer {
        Lexer {
            file_name: file_name.into(),
            source_code: source_code.into(),
            pos: 0,
            state: State::NewLine,
            cat_codes: Default::default(),
            buffer: Default::default(),
        }
    }

    /// Overrides the category code of a character.
    ///
    /// Characters without an override use [CatCode::plain_tex].
    pub fn set_cat_code(&mut self, c: char, cat_code: CatCode) {
        self.cat_codes.insert(c, cat_code);
    }

    fn cat_code(&self, c: char) -> CatCode {
        self.cat_codes
            .get(&c)
            .copied()
            .unwrap_or_else(|| CatCode::plain_tex(c))
    }

    fn peek_char(&self) -> Option<char> {
        self.source_code[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<(char, usize)> {
        let c = self.peek_char()?;
        let start = self.pos;
        self.pos += c.len_utf8();
        Some((c, start))
    }

    fn key(offset: usize) -> trace::Key {
        trace::Key(offset as u32)
    }

    fn read_control_sequence(
        &mut self,
        escape_offset: usize,
        interner: &mut CsNameInterner,
    ) -> error::Result<Token> {
        self.buffer.clear();
        let (first, _) = match self.advance() {
            None => {
                return Err(error::Error::new(
                    error::Kind::FatalSyntax,
                    "the input ended with an escape character",
                )
                .with_note("a control sequence name must follow the escape character")
                .boxed())
            }
            Some(c) => c,
        };
        self.buffer.push(first);
        match self.cat_code(first) {
            CatCode::Letter => {
                while let Some(c) = self.peek_char() {
                    if self.cat_code(c) != CatCode::Letter {
                        break;
                    }
                    self.buffer.push(c);
                    self.advance();
                }
                self.state = State::SkipBlanks;
            }
            CatCode::Space => {
                self.state = State::SkipBlanks;
            }
            _ => {
                self.state = State::MidLine;
            }
        }
        let name = interner.get_or_intern(&self.buffer);
        Ok(Token::new_control_sequence(name, Lexer::key(escape_offset)))
    }

    fn skip_comment(&mut self) {
        while let Some((c, _)) = self.advance() {
            if self.cat_code(c) == CatCode::EndOfLine {
                break;
            }
        }
        self.state = State::NewLine;
    }
}

impl TokenSource for Lexer {
    fn next(&mut self, interner: &mut CsNameInterner) -> error::Result<Option<Token>> {
        while let Some((c, offset)) = self.advance() {
            let key = Lexer::key(offset);
            let cat_code = self.cat_code(c);
            let token = match cat_code {
                CatCode::Escape => self.read_control_sequence(offset, interner)?,
                CatCode::Space => match self.state {
                    State::MidLine => {
                        self.state = State::SkipBlanks;
                        Token::new_space(' ', key)
                    }
                    State::NewLine | State::SkipBlanks => continue,
                },
                CatCode::EndOfLine => match self.state {
                    State::NewLine => {
                        Token::new_control_sequence(interner.get_or_intern("par"), key)
                    }
                    State::MidLine => {
                        self.state = State::NewLine;
                        Token::new_space(' ', key)
                    }
                    State::SkipBlanks => {
                        self.state = State::NewLine;
                        continue;
                    }
                },
                CatCode::Comment => {
                    self.skip_comment();
                    continue;
                }
                CatCode::Ignored => continue,
                CatCode::Invalid => {
                    return Err(error::Error::new(
                        error::Kind::InvalidCharacter,
                        format!["invalid character `{}` in the input", c.escape_debug()],
                    )
                    .with_trace(self.trace(key))
                    .boxed())
                }
                _ => {
                    self.state = State::MidLine;
                    match Value::new(c, cat_code) {
                        Some(value) => Token::new(value, key),
                        None => continue,
                    }
                }
            };
            return Ok(Some(token));
        }
        Ok(None)
    }

    fn trace(&self, key: trace::Key) -> Option<trace::SourceCodeTrace> {
        if key.is_dummy() {
            return None;
        }
        let offset = key.0 as usize;
        let rest = self.source_code.get(offset..)?;
        let mut chars = rest.chars();
        let len = match chars.next() {
            Some('\\') => {
                let name_len: usize = match chars.next() {
                    Some(c) if c.is_alphabetic() => {
                        c.len_utf8()
                            + chars
                                .take_while(|c| c.is_alphabetic())
                                .map(char::len_utf8)
                                .sum::<usize>()
                    }
                    Some(c) => c.len_utf8(),
                    None => 0,
                };
                1 + name_len
            }
            Some(c) => c.len_utf8(),
            None => 0,
        };
        trace::SourceCodeTrace::new(&self.file_name, &self.source_code, offset, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::write_tokens;

    fn lex(source: &str) -> String {
        let mut interner: CsNameInterner = Default::default();
        let mut lexer = Lexer::new("test.tex", source);
        let mut tokens = vec![];
        while let Some(token) = lexer.next(&mut interner).unwrap() {
            tokens.push(token);
        }
        write_tokens(&tokens, &interner)
    }

    macro_rules! lexer_tests {
        ($( ($name: ident, $input: expr, $want: expr), )+) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(lex($input), $want);
                }
            )+
        };
    }

    lexer_tests![
        (letters_and_spaces, "a b", "a b"),
        (multiple_spaces_collapse, "a    b", "a b"),
        (spaces_after_control_word_skipped, r"\a   b", r"\a b"),
        (control_symbol_keeps_space, r"\& b", r"\& b"),
        (leading_spaces_skipped, "   a", "a"),
        (new_line_is_space, "a\nb", "a b"),
        (blank_line_is_par, "a\n\nb", r"a \par b"),
        (comment_skipped, "a% comment\nb", "ab"),
        (braces, "{a}", "{a}"),
    ];

    #[test]
    fn invalid_character() {
        let mut interner: CsNameInterner = Default::default();
        let mut lexer = Lexer::new("test.tex", "a\u{7f}");
        assert!(lexer.next(&mut interner).unwrap().is_some());
        let err = lexer.next(&mut interner).unwrap_err();
        assert_eq!(err.kind(), error::Kind::InvalidCharacter);
    }

    #[test]
    fn trace_control_sequence() {
        let mut interner: CsNameInterner = Default::default();
        let mut lexer = Lexer::new("test.tex", "a\n  \\macro b");
        lexer.next(&mut interner).unwrap();
        lexer.next(&mut interner).unwrap();
        let token = lexer.next(&mut interner).unwrap().unwrap();
        let trace = lexer.trace(token.trace_key()).unwrap();
        assert_eq!(trace.line_number, 2);
        assert_eq!(trace.index, 2);
        assert_eq!(trace.value, r"\macro");
    }
}
