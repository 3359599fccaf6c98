//! Converting text into horizontal lists.
//!
//! This is the part of TeX's chief executive that turns letters and spaces
//!     into character and glue nodes (starting in TeX.2021.1029).
//! Font metrics and hyphenation are supplied by the caller through the
//!     [FontMetrics] and [HyphenationOracle] traits.
//! Hyphenation happens here, when the nodes are built;
//!     the breakers only ever see the resulting discretionaries.

use crate::node::*;
use galley_core::Scaled;
use std::collections::HashMap;

/// Dimensions of a character in a font.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CharDimensions {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// Source of font metric data.
pub trait FontMetrics {
    /// Dimensions of a character, or [None] if the font doesn't have it.
    fn char_dimensions(&self, font: u32, c: char) -> Option<CharDimensions>;

    /// The inter-word glue of the font.
    fn space(&self, font: u32) -> galley_core::Glue;
}

/// A font in which every character has the same dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPitch {
    pub char: CharDimensions,
    pub space: galley_core::Glue,
}

impl Default for FixedPitch {
    /// A 5pt wide font with a 5pt space that stretches 2.5pt and shrinks 1.5pt.
    fn default() -> Self {
        FixedPitch {
            char: CharDimensions {
                width: Scaled(5 << 16),
                height: Scaled(7 << 16),
                depth: Scaled(2 << 16),
            },
            space: galley_core::Glue {
                width: Scaled(5 << 16),
                stretch: Scaled(5 << 15),
                shrink: Scaled(3 << 15),
                ..Default::default()
            },
        }
    }
}

impl FontMetrics for FixedPitch {
    fn char_dimensions(&self, _: u32, c: char) -> Option<CharDimensions> {
        if c.is_control() {
            None
        } else {
            Some(self.char)
        }
    }

    fn space(&self, _: u32) -> galley_core::Glue {
        self.space
    }
}

/// Source of hyphenation points.
pub trait HyphenationOracle {
    /// Positions at which the word may be hyphenated.
    ///
    /// A position `k` means a hyphen may be placed after the first `k` characters.
    fn hyphenate(&self, word: &str, language: &str) -> Vec<usize>;
}

/// An oracle that never hyphenates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHyphenation;

impl HyphenationOracle for NoHyphenation {
    fn hyphenate(&self, _: &str, _: &str) -> Vec<usize> {
        vec![]
    }
}

/// An oracle backed by a list of hyphenated words, like TeX's `\hyphenation`.
///
/// Words are matched case-insensitively and regardless of language.
#[derive(Debug, Default, Clone)]
pub struct Exceptions {
    words: HashMap<String, Vec<usize>>,
}

impl Exceptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a word written with hyphens at its hyphenation points, for example `hy-phen-ation`.
    pub fn add(&mut self, hyphenated: &str) {
        let mut word = String::new();
        let mut positions = vec![];
        let mut k = 0;
        for c in hyphenated.chars() {
            if c == '-' {
                positions.push(k);
            } else {
                word.extend(c.to_lowercase());
                k += 1;
            }
        }
        self.words.insert(word, positions);
    }
}

impl<'a> FromIterator<&'a str> for Exceptions {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut exceptions = Exceptions::new();
        for word in iter {
            exceptions.add(word);
        }
        exceptions
    }
}

impl HyphenationOracle for Exceptions {
    fn hyphenate(&self, word: &str, _: &str) -> Vec<usize> {
        self.words
            .get(&word.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

/// Builds a horizontal list out of text.
pub struct TextBuilder<'a> {
    metrics: &'a dyn FontMetrics,
    oracle: &'a dyn HyphenationOracle,
    font: u32,
    language: String,
    /// Minimum number of characters before a hyphen; `\lefthyphenmin`.
    pub left_hyphen_min: usize,
    /// Minimum number of characters after a hyphen; `\righthyphenmin`.
    pub right_hyphen_min: usize,
    list: Vec<Horizontal>,
}

impl<'a> TextBuilder<'a> {
    pub fn new(metrics: &'a dyn FontMetrics, oracle: &'a dyn HyphenationOracle) -> Self {
        TextBuilder {
            metrics,
            oracle,
            font: 0,
            language: String::new(),
            left_hyphen_min: 2,
            right_hyphen_min: 3,
            list: vec![],
        }
    }

    pub fn set_font(&mut self, font: u32) {
        self.font = font;
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = language.into();
    }

    /// Adds text; runs of whitespace become a single inter-word space.
    pub fn add_text(&mut self, text: &str) {
        let mut word = String::new();
        for c in text.chars() {
            if c.is_whitespace() {
                self.add_word(&word);
                word.clear();
                self.add_space();
            } else {
                word.push(c);
            }
        }
        self.add_word(&word);
    }

    /// Adds a single word.
    ///
    /// Words made only of letters are hyphenated using the oracle.
    /// An explicit hyphen is followed by an empty discretionary,
    ///     so the line may break after it (TeX.2021.1039).
    pub fn add_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        let n = word.chars().count();
        let points: Vec<usize> = if word.chars().all(char::is_alphabetic) {
            self.oracle
                .hyphenate(word, &self.language)
                .into_iter()
                .filter(|&k| k >= self.left_hyphen_min && k + self.right_hyphen_min <= n)
                .collect()
        } else {
            vec![]
        };
        for (k, c) in word.chars().enumerate() {
            if k > 0 && points.contains(&k) {
                if let Some(hyphen) = self.char('-') {
                    self.list
                        .push(Horizontal::Discretionary(Discretionary::hyphen(hyphen)));
                }
            }
            let Some(node) = self.char(c) else {
                log::warn!("Missing character {c:?} in font {}", self.font);
                continue;
            };
            self.list.push(Horizontal::Char(node));
            if c == '-' {
                self.list.push(Horizontal::Discretionary(Discretionary::new()));
            }
        }
    }

    /// Adds inter-word glue.
    ///
    /// Spaces at the start of the list or after another space are ignored.
    pub fn add_space(&mut self) {
        if matches!(self.list.last(), None | Some(Horizontal::Glue(_))) {
            return;
        }
        self.list
            .push(Horizontal::Glue(Glue::new(self.metrics.space(self.font))));
    }

    /// Adds a node that isn't text, like a mark or a penalty.
    pub fn push(&mut self, node: Horizontal) {
        self.list.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns the list built so far, leaving the builder empty.
    pub fn take(&mut self) -> Vec<Horizontal> {
        std::mem::take(&mut self.list)
    }

    pub fn finish(self) -> Vec<Horizontal> {
        self.list
    }

    fn char(&self, c: char) -> Option<Char> {
        let dimensions = self.metrics.char_dimensions(self.font, c)?;
        Some(Char {
            char: c,
            font: self.font,
            width: dimensions.width,
            height: dimensions.height,
            depth: dimensions.depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Renders a list with `|` for discretionaries and `_` for glue.
    fn render(list: &[Horizontal]) -> String {
        list.iter()
            .map(|node| match node {
                Horizontal::Char(c) => c.char.to_string(),
                Horizontal::Glue(_) => "_".into(),
                Horizontal::Discretionary(d) if d.pre_break.is_empty() => "|".into(),
                Horizontal::Discretionary(_) => "-|".into(),
                _ => "?".into(),
            })
            .collect()
    }

    #[test]
    fn words_and_spaces() {
        let metrics = FixedPitch::default();
        let mut builder = TextBuilder::new(&metrics, &NoHyphenation);
        builder.add_text("  two   words ");
        let list = builder.finish();
        assert_eq!(render(&list), "two_words_");
        assert_eq!(list[3].width(), Scaled(5 << 16));
    }

    #[test]
    fn char_dimensions_come_from_the_font() {
        let metrics = FixedPitch::default();
        let mut builder = TextBuilder::new(&metrics, &NoHyphenation);
        builder.set_font(3);
        builder.add_word("a");
        match builder.finish().as_slice() {
            [Horizontal::Char(c)] => {
                assert_eq!(c.font, 3);
                assert_eq!(c.width, Scaled(5 << 16));
                assert_eq!(c.depth, Scaled(2 << 16));
            }
            other => panic!("unexpected list {other:?}"),
        }
    }

    #[test]
    fn hyphenation_from_exceptions() {
        let metrics = FixedPitch::default();
        let oracle: Exceptions = ["hy-phen-ation"].into_iter().collect();
        let mut builder = TextBuilder::new(&metrics, &oracle);
        builder.add_text("Hyphenation");
        assert_eq!(render(&builder.finish()), "Hy-|phen-|ation");
    }

    #[test]
    fn hyphen_mins_are_respected() {
        let metrics = FixedPitch::default();
        let oracle: Exceptions = ["a-b-cde-fg"].into_iter().collect();
        let mut builder = TextBuilder::new(&metrics, &oracle);
        builder.add_word("abcdefg");
        // Breaks after 1 character and before 2 characters are too close to the ends.
        assert_eq!(render(&builder.finish()), "ab-|cdefg");
    }

    #[test]
    fn explicit_hyphen_allows_a_break() {
        let metrics = FixedPitch::default();
        let oracle: Exceptions = ["well-known"].into_iter().collect();
        let mut builder = TextBuilder::new(&metrics, &oracle);
        builder.add_word("well-known");
        assert_eq!(render(&builder.finish()), "well-|known");
    }

    #[test]
    fn take_empties_the_builder() {
        let metrics = FixedPitch::default();
        let mut builder = TextBuilder::new(&metrics, &NoHyphenation);
        builder.add_text("a b");
        assert_eq!(builder.take().len(), 3);
        assert!(builder.is_empty());
    }
}
