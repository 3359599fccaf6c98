//! Parsing of numbers, dimensions, relations and keywords from the expanded stream.
//!
//! These follow TeX.2021.440-463.
//! Tokens are read with full expansion, so `\ifnum\count<\limit` works when
//!     `\count` and `\limit` are macros that expand to numbers.

use crate::error::{self, Error, Kind};
use crate::expander::Expander;
use crate::token::{CommandRef, Token, Value};
use galley_core::{Scaled, ScaledUnit};
use std::cmp::Ordering;

const MAX_INTEGER: i64 = i32::MAX as i64;

/// Parses a number, consuming one optional space after it.
///
/// Supported forms are decimal, `'` octal, `"` hexadecimal and `` ` `` character codes,
///     each with any number of leading signs.
pub fn number(expander: &mut Expander) -> error::Result<i32> {
    let (negative, first) = signs(expander, "reading a number")?;
    let n = unsigned_number(expander, first)?;
    Ok(if negative { -n } else { n })
}

fn unsigned_number(expander: &mut Expander, first: Token) -> error::Result<i32> {
    let (radix, initial) = match first.value() {
        Value::Other('\'') => (8, None),
        Value::Other('"') => (16, None),
        Value::Other('`') => return character_code(expander),
        Value::Other(c) if c.is_ascii_digit() => (10, c.to_digit(10)),
        _ => {
            return Err(missing_number(expander, &first));
        }
    };
    let mut n: i64 = initial.unwrap_or(0) as i64;
    let mut num_digits = usize::from(initial.is_some());
    loop {
        let token = match expander.next_expanded()? {
            None => break,
            Some(token) => token,
        };
        let digit = match token.value() {
            Value::Other(c) if c.is_ascii_digit() => c.to_digit(radix),
            Value::Other(c) | Value::Letter(c) if radix == 16 && matches!(c, 'A'..='F') => {
                c.to_digit(radix)
            }
            Value::Space(_) => break,
            _ => None,
        };
        match digit {
            Some(d) => {
                n = n * radix as i64 + d as i64;
                num_digits += 1;
                if n > MAX_INTEGER {
                    return Err(expander
                        .error_at(Kind::InvalidNumber, "number too big", &token)
                        .with_note(format!["the largest allowed number is {}", i32::MAX])
                        .boxed());
                }
            }
            None => {
                expander.back_input(token);
                break;
            }
        }
    }
    if num_digits == 0 {
        return Err(missing_number(expander, &first));
    }
    Ok(n as i32)
}

fn character_code(expander: &mut Expander) -> error::Result<i32> {
    let token = expander.next_unexpanded_or_err("reading a character code")?;
    let c = match token.value() {
        Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
            let name = expander.interner().resolve(cs_name);
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(expander
                        .error_at(
                            Kind::InvalidNumber,
                            "improper alphabetic constant",
                            &token,
                        )
                        .with_note("a character code must be a character or a single-character control sequence")
                        .boxed());
                }
            }
        }
        _ => match token.char() {
            Some(c) => c,
            None => return Err(missing_number(expander, &token)),
        },
    };
    optional_space(expander)?;
    Ok(c as i32)
}

/// Parses a dimension like `-1.5pt`, consuming one optional space after it.
pub fn dimension(expander: &mut Expander) -> error::Result<Scaled> {
    let (negative, first) = signs(expander, "reading a dimension")?;
    let (integer, fraction) = match first.value() {
        Value::Other('\'' | '"' | '`') => (unsigned_number(expander, first)?, vec![]),
        Value::Other(c) if c.is_ascii_digit() || c == '.' || c == ',' => {
            expander.back_input(first);
            decimal(expander, &first)?
        }
        _ => return Err(missing_number(expander, &first)),
    };
    skip_spaces(expander)?;
    keyword(expander, "true")?;
    let unit = unit(expander)?;
    optional_space(expander)?;
    let scaled = Scaled::new(integer, &fraction, unit).map_err(|_| {
        expander
            .error_at(Kind::InvalidNumber, "dimension too large", &first)
            .with_note(format!["the largest allowed dimension is {}pt", Scaled::MAX_DIMEN])
            .boxed()
    })?;
    if scaled > Scaled::MAX_DIMEN {
        return Err(expander
            .error_at(Kind::InvalidNumber, "dimension too large", &first)
            .boxed());
    }
    Ok(if negative { -scaled } else { scaled })
}

fn decimal(expander: &mut Expander, first: &Token) -> error::Result<(i32, Vec<u8>)> {
    let mut integer: i64 = 0;
    let mut fraction: Vec<u8> = vec![];
    let mut in_fraction = false;
    loop {
        let token = match expander.next_expanded()? {
            None => break,
            Some(token) => token,
        };
        match token.value() {
            Value::Other(c) if c.is_ascii_digit() => {
                let d = c as u8 - b'0';
                if in_fraction {
                    // TeX only keeps 17 digits of the fraction.
                    if fraction.len() < 17 {
                        fraction.push(d);
                    }
                } else {
                    integer = integer * 10 + d as i64;
                    if integer > MAX_INTEGER {
                        return Err(expander
                            .error_at(Kind::InvalidNumber, "number too big", first)
                            .boxed());
                    }
                }
            }
            Value::Other('.' | ',') if !in_fraction => in_fraction = true,
            _ => {
                expander.back_input(token);
                break;
            }
        }
    }
    Ok((integer as i32, fraction))
}

fn unit(expander: &mut Expander) -> error::Result<ScaledUnit> {
    for name in ["pt", "pc", "in", "bp", "cm", "mm", "dd", "cc", "sp"] {
        if keyword(expander, name)? {
            if let Some(unit) = ScaledUnit::parse(name) {
                return Ok(unit);
            }
        }
    }
    let token = expander.next_expanded_or_err("reading a unit of measure")?;
    let mut err = expander
        .error_at(Kind::InvalidNumber, "illegal unit of measure", &token)
        .with_note("the units are pt, pc, in, bp, cm, mm, dd, cc and sp");
    if keyword(expander, "m")? || keyword(expander, "x")? {
        err = err.with_note("font-relative units need font metrics, which the expander doesn't have");
    }
    Err(err.boxed())
}

/// Parses one of `<`, `=` or `>`, skipping spaces before it.
pub fn relation(expander: &mut Expander) -> error::Result<Ordering> {
    skip_spaces(expander)?;
    let token = expander.next_expanded_or_err("reading a relation")?;
    match token.value() {
        Value::Other('<') => Ok(Ordering::Less),
        Value::Other('=') => Ok(Ordering::Equal),
        Value::Other('>') => Ok(Ordering::Greater),
        _ => Err(expander
            .error_at(Kind::InvalidNumber, "missing relation", &token)
            .with_note("expected one of <, = or >")
            .boxed()),
    }
}

/// Attempts to read the keyword, matching characters case-insensitively.
///
/// If the keyword is not found, every token read is put back.
pub fn keyword(expander: &mut Expander, keyword: &str) -> error::Result<bool> {
    let mut read: Vec<Token> = vec![];
    for expected in keyword.chars() {
        let token = match expander.next_expanded()? {
            None => break,
            Some(token) => token,
        };
        let matches = match token.value() {
            Value::CommandRef(_) => false,
            _ => token
                .char()
                .map(|c| c.eq_ignore_ascii_case(&expected))
                .unwrap_or(false),
        };
        read.push(token);
        if !matches {
            break;
        }
        if read.len() == keyword.chars().count() {
            return Ok(true);
        }
    }
    while let Some(token) = read.pop() {
        expander.back_input(token);
    }
    Ok(false)
}

/// Skips any number of space tokens.
pub fn skip_spaces(expander: &mut Expander) -> error::Result<()> {
    while let Some(token) = expander.next_expanded()? {
        if !matches!(token.value(), Value::Space(_)) {
            expander.back_input(token);
            break;
        }
    }
    Ok(())
}

/// Skips at most one space token.
pub fn optional_space(expander: &mut Expander) -> error::Result<()> {
    if let Some(token) = expander.next_expanded()? {
        if !matches!(token.value(), Value::Space(_)) {
            expander.back_input(token);
        }
    }
    Ok(())
}

/// Skips spaces and then at most one `=` token, as after `\let\a`.
///
/// The tokens are not expanded.
pub fn optional_equals_unexpanded(expander: &mut Expander) -> error::Result<()> {
    let mut token = expander.next_unexpanded_or_err("reading an assignment")?;
    while let Value::Space(_) = token.value() {
        token = expander.next_unexpanded_or_err("reading an assignment")?;
    }
    if let Value::Other('=') = token.value() {
        // One optional space is allowed after the equals sign.
        let next = expander.next_unexpanded_or_err("reading an assignment")?;
        if !matches!(next.value(), Value::Space(_)) {
            expander.back_input(next);
        }
    } else {
        expander.back_input(token);
    }
    Ok(())
}

fn signs(expander: &mut Expander, reading: &str) -> error::Result<(bool, Token)> {
    let mut negative = false;
    loop {
        let token = expander.next_expanded_or_err(reading)?;
        match token.value() {
            Value::Space(_) | Value::Other('+') => {}
            Value::Other('-') => negative = !negative,
            _ => return Ok((negative, token)),
        }
    }
}

fn missing_number(expander: &mut Expander, token: &Token) -> Box<Error> {
    expander
        .error_at(
            Kind::InvalidNumber,
            format!["missing number, found {}", expander.render(token)],
            token,
        )
        .with_note("a number must start with a digit, ', \" or `")
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lexer::Lexer;

    fn expander(input: &str) -> Expander {
        let mut expander = Expander::new(Lexer::new("input.tex", input));
        crate::primitives::register(&mut expander);
        expander
    }

    macro_rules! number_tests {
        ($( ($name: ident, $input: expr, $expected: expr), )+) => {
            $(
            #[test]
            fn $name() {
                let mut expander = expander($input);
                assert_eq!(number(&mut expander).unwrap(), $expected);
            }
            )+
        };
    }

    number_tests![
        (decimal, "123", 123),
        (negative, "-123", -123),
        (double_negative, "- -12", 12),
        (octal, "'17", 15),
        (hexadecimal, "\"1F", 31),
        (character, "`a", 97),
        (character_control_sequence, "`\\a", 97),
        (from_macro, "\\def\\n{42}\\n", 42),
        (terminated_by_relax, "7\\relax", 7),
        (largest, "2147483647", 2147483647),
    ];

    #[test]
    fn number_consumes_one_space() {
        let mut expander = expander("12  x");
        assert_eq!(number(&mut expander).unwrap(), 12);
        let next = expander.next_unexpanded().unwrap().unwrap();
        assert!(matches!(next.value(), Value::Space(_)));
    }

    #[test]
    fn number_too_big() {
        let mut expander = expander("2147483648");
        let err = number(&mut expander).unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidNumber);
    }

    #[test]
    fn missing_number() {
        let mut expander = expander("x");
        let err = number(&mut expander).unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidNumber);
    }

    macro_rules! dimension_tests {
        ($( ($name: ident, $input: expr, $expected: expr), )+) => {
            $(
            #[test]
            fn $name() {
                let mut expander = expander($input);
                assert_eq!(dimension(&mut expander).unwrap(), $expected);
            }
            )+
        };
    }

    dimension_tests![
        (points, "3pt", Scaled::ONE * 3),
        (picas, "1pc", Scaled::ONE * 12),
        (negative_points, "-2pt", -Scaled::ONE * 2),
        (half_point, "0.5pt", Scaled(1 << 15)),
        (comma_separator, "0,5pt", Scaled(1 << 15)),
        (leading_dot, ".5pt", Scaled(1 << 15)),
        (uppercase_unit, "3PT", Scaled::ONE * 3),
        (true_keyword, "3 true pt", Scaled::ONE * 3),
        (scaled_points, "10sp", Scaled(10)),
        (one_inch, "1in", Scaled(4736286)),
    ];

    #[test]
    fn illegal_unit() {
        let mut expander = expander("3em");
        let err = dimension(&mut expander).unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidNumber);
    }

    #[test]
    fn keyword_puts_tokens_back() {
        let mut expander = expander("tru");
        assert!(!keyword(&mut expander, "true").unwrap());
        assert_eq!(expander.expand_all().unwrap().len(), 3);
    }

    #[test]
    fn relations() {
        let mut expander = expander(" <=>");
        assert_eq!(relation(&mut expander).unwrap(), Ordering::Less);
        assert_eq!(relation(&mut expander).unwrap(), Ordering::Equal);
        assert_eq!(relation(&mut expander).unwrap(), Ordering::Greater);
    }
}
