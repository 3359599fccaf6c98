//! Tracing of tokens back to the source code that produced them.
//!
//! Every token carries a [Key].
//! A token source that owns source code (like the [lexer](super::lexer)) can turn a key
//!     back into a [SourceCodeTrace] for error messages.
//! Tokens that were built programmatically carry [Key::dummy], which never resolves.

/// Key attached to tokens to enable tracing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Key(pub u32);

impl Key {
    pub fn dummy() -> Key {
        Key(u32::MAX)
    }

    pub fn is_dummy(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// A source code trace: where in the input a token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceCodeTrace {
    /// Name of the file the token came from.
    pub file_name: String,
    /// Content of the line the token came from, without the trailing new line.
    pub line_content: String,
    /// Line number, starting from 1.
    pub line_number: usize,
    /// Column of the first character of the token, starting from 0.
    pub index: usize,
    /// The source text of the token.
    pub value: String,
}

impl SourceCodeTrace {
    /// Builds a trace for the token starting at byte `offset` of `source` and running
    ///     for `len` bytes.
    pub fn new(file_name: &str, source: &str, offset: usize, len: usize) -> Option<Self> {
        if offset > source.len() {
            return None;
        }
        let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[offset..]
            .find('\n')
            .map(|i| i + offset)
            .unwrap_or(source.len());
        let line_number = source[..line_start].matches('\n').count() + 1;
        let value_end = (offset + len).min(line_end).max(offset);
        Some(SourceCodeTrace {
            file_name: file_name.into(),
            line_content: source[line_start..line_end].into(),
            line_number,
            index: source[line_start..offset].chars().count(),
            value: source.get(offset..value_end).unwrap_or_default().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_second_line() {
        let source = "first\nsecond \\cs line\nthird";
        let trace = SourceCodeTrace::new("input.tex", source, 13, 3).unwrap();
        assert_eq!(
            trace,
            SourceCodeTrace {
                file_name: "input.tex".into(),
                line_content: "second \\cs line".into(),
                line_number: 2,
                index: 7,
                value: "\\cs".into(),
            }
        );
    }
}
