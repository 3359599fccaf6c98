//! Token sources: the pull-based suppliers of tokens that the expander consumes.

use crate::error;
use crate::token::{trace, CsNameInterner, Token};

/// A pull-based supplier of category-coded tokens.
///
/// Push-back is not part of this trait: the [Expander](crate::Expander) keeps its
///     own stack of pending tokens in front of the source.
pub trait TokenSource {
    /// Returns the next token, or [None] at the end of the stream.
    fn next(&mut self, interner: &mut CsNameInterner) -> error::Result<Option<Token>>;

    /// Returns where in the source code the token with this key came from.
    fn trace(&self, key: trace::Key) -> Option<trace::SourceCodeTrace> {
        let _ = key;
        None
    }
}

/// A token source backed by a list of tokens.
#[derive(Debug, Default, Clone)]
pub struct VecSource {
    // Stored in reverse so that the next token is at the end.
    tokens: Vec<Token>,
}

impl VecSource {
    pub fn new(mut tokens: Vec<Token>) -> VecSource {
        tokens.reverse();
        VecSource { tokens }
    }
}

impl TokenSource for VecSource {
    fn next(&mut self, _: &mut CsNameInterner) -> error::Result<Option<Token>> {
        Ok(self.tokens.pop())
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Box<T> {
    fn next(&mut self, interner: &mut CsNameInterner) -> error::Result<Option<Token>> {
        (**self).next(interner)
    }

    fn trace(&self, key: trace::Key) -> Option<trace::SourceCodeTrace> {
        (**self).trace(key)
    }
}
