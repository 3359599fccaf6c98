//! Category codes.

use CatCode::*;

/// The category a character belongs to when it is read.
///
/// The lexer consumes categories 0, 5, 9, 14 and 15 itself;
///     tokens only ever carry the remaining ones.
/// The character given for each category is its plain TeX representative.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CatCode {
    /// `\`: starts a control sequence name.
    Escape = 0,
    /// `{`
    BeginGroup = 1,
    /// `}`
    EndGroup = 2,
    /// `$`
    MathShift = 3,
    /// `&`
    AlignmentTab = 4,
    /// End of an input line.
    ///
    /// Becomes a space, or `\par` when the line is blank, and ends a comment.
    EndOfLine = 5,
    /// `#`: introduces a macro parameter.
    Parameter = 6,
    /// `^`
    Superscript = 7,
    /// `_`
    Subscript = 8,
    /// Dropped by the lexer; the NUL character in plain TeX.
    Ignored = 9,
    /// ` `
    Space = 10,
    /// `a` to `z` and `A` to `Z`: the characters of multi-letter control sequence names.
    Letter = 11,
    /// Anything without a more specific category, like `1` or `@`.
    #[default]
    Other = 12,
    /// `~`: a character that is looked up in the macro table like a control sequence.
    Active = 13,
    /// `%`: the rest of the line is skipped.
    Comment = 14,
    /// DEL; reading it is an error.
    Invalid = 15,
}

impl TryFrom<u8> for CatCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Escape,
            1 => BeginGroup,
            2 => EndGroup,
            3 => MathShift,
            4 => AlignmentTab,
            5 => EndOfLine,
            6 => Parameter,
            7 => Superscript,
            8 => Subscript,
            9 => Ignored,
            10 => Space,
            11 => Letter,
            12 => Other,
            13 => Active,
            14 => Comment,
            15 => Invalid,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for CatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, *self as u8)
    }
}

impl CatCode {
    /// The category code of a character under the plainTeX conventions.
    ///
    /// These are the INITEX defaults (TeX.2021.232) with the plain format's
    ///     assignments for `{}$&#^_~` applied on top (TeXBook p343).
    pub fn plain_tex(c: char) -> CatCode {
        match c {
            '\\' => Escape,
            '{' => BeginGroup,
            '}' => EndGroup,
            '$' => MathShift,
            '&' => AlignmentTab,
            '\n' | '\r' => EndOfLine,
            '#' => Parameter,
            '^' => Superscript,
            '_' => Subscript,
            '\0' => Ignored,
            ' ' | '\t' => Space,
            'a'..='z' | 'A'..='Z' => Letter,
            '~' => Active,
            '%' => Comment,
            '\u{7f}' => Invalid,
            _ => Other,
        }
    }
}
