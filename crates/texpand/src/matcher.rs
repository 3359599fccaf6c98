//! Knuth–Morris–Pratt substring search.
//!
//! Used to find the delimiter of a delimited macro argument.
//! The elements of the string are generated on demand as tokens are read,
//!     so the search consumes one element at a time.

/// A delimiter, preprocessed so that it can be searched for in any number of streams.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matcher<T: PartialEq> {
    substring: Vec<T>,
    /// `failure[i]` is the length of the longest proper border of `substring[..=i]`.
    failure: Vec<usize>,
}

impl<T: PartialEq> Matcher<T> {
    /// Returns [None] for an empty substring, which can't delimit anything.
    pub fn new(substring: Vec<T>) -> Option<Matcher<T>> {
        if substring.is_empty() {
            return None;
        }
        let mut failure = vec![0; substring.len()];
        let mut border = 0;
        for (i, element) in substring.iter().enumerate().skip(1) {
            while border > 0 && &substring[border] != element {
                border = failure[border - 1];
            }
            if &substring[border] == element {
                border += 1;
            }
            failure[i] = border;
        }
        Some(Matcher { substring, failure })
    }

    pub fn start(&self) -> Search<T> {
        Search {
            matcher: self,
            matched: 0,
        }
    }

    pub fn substring(&self) -> &[T] {
        &self.substring
    }
}

/// An in-progress search through one stream.
pub struct Search<'a, T: PartialEq> {
    matcher: &'a Matcher<T>,
    /// Length of the longest prefix of the substring that ends the stream so far.
    matched: usize,
}

impl<T: PartialEq> Search<'_, T> {
    /// Feeds the next element; returns whether the stream now ends with the substring.
    pub fn next(&mut self, element: &T) -> bool {
        let Matcher { substring, failure } = self.matcher;
        while self.matched > 0 && &substring[self.matched] != element {
            self.matched = failure[self.matched - 1];
        }
        if &substring[self.matched] == element {
            self.matched += 1;
        }
        if self.matched < substring.len() {
            return false;
        }
        self.matched = failure[self.matched - 1];
        true
    }
}
